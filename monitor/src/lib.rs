//! Chatter Monitor - speaks Claude Code replies through an avatar.
//!
//! This crate watches Claude Code session logs and turns each new assistant
//! reply into an emotion-tagged speak event.
//!
//! # Overview
//!
//! The monitor tails `~/.claude/projects/**/*.jsonl`. For every appended
//! line it:
//!
//! 1. extracts the assistant's text content ([`parser`])
//! 2. picks one of six emotions for it ([`classifier`])
//! 3. strips Markdown, URLs and hashes so it reads well aloud ([`filter`])
//! 4. hands `{"type":"speak","text":...,"emotion":...}` to a [`sink`]
//!
//! # Modules
//!
//! - [`types`]: Emotion labels and the speak event schema
//! - [`filter`]: Text cleaning for speech synthesis
//! - [`classifier`]: Rule-based emotion classification
//! - [`parser`]: Claude Code JSONL line parsing
//! - [`pipeline`]: Parse, classify and clean one line
//! - [`watcher`]: Offset-tracking log tailer
//! - [`sink`]: Event destinations (stdout, channel, HTTP)
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for monitor operations
//! - [`utils`]: Shared utilities (write-stability debouncing)

pub mod classifier;
pub mod config;
pub mod error;
pub mod filter;
pub mod parser;
pub mod pipeline;
pub mod sink;
pub mod types;
pub mod utils;
pub mod watcher;

pub use classifier::EmotionClassifier;
pub use config::{Config, TailerConfig};
pub use error::{MonitorError, Result};
pub use filter::clean_text_for_speech;
pub use parser::parse_line;
pub use pipeline::SpeechPipeline;
pub use sink::{ChannelSink, EventSink, HttpSink, StdoutSink};
pub use types::{Emotion, Extraction, SpeakEvent};
pub use watcher::{ChangeDecision, LogTailer, TailState, TailerHandle, WatchedFile, WatcherError};
