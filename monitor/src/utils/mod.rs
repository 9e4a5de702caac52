//! Utility modules for the Chatter monitor.
//!
//! - [`debounce`]: Write-stability debouncing for file system events

pub mod debounce;

pub use debounce::{StabilityWindow, StabilizerError, WriteStabilizer};
