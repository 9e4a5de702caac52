//! Configuration module for Chatter Monitor.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `CHATTER_CLAUDE_DIR` | No | `~/.claude` | Claude Code directory; sessions live under `projects/` |
//! | `CHATTER_INCLUDE_SUBAGENTS` | No | `false` | Also watch sub-agent logs (`true`/`1`/`yes`) |
//! | `CHATTER_DEBOUNCE_MS` | No | 100 | Minimum gap between processed changes of one file |
//! | `CHATTER_STABILITY_THRESHOLD_MS` | No | 100 | Quiet period before a write counts as finished |
//! | `CHATTER_POLL_INTERVAL_MS` | No | 50 | How often write stability is checked |
//! | `CHATTER_SERVER_URL` | No | - | Event hub URL; enables the HTTP sink by default |
//!
//! # Example
//!
//! ```no_run
//! use chatter_monitor::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Watching: {}", config.projects_dir().display());
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;
use thiserror::Error;

use crate::utils::debounce::{StabilityWindow, DEFAULT_POLL_INTERVAL_MS, DEFAULT_STABILITY_THRESHOLD_MS};

/// Default Claude Code directory name relative to home.
const DEFAULT_CLAUDE_DIR: &str = ".claude";

/// Session logs live in this directory under the Claude Code directory.
const PROJECTS_DIR: &str = "projects";

/// Default per-file change debounce in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Extension of session log files.
pub const LOG_EXTENSION: &str = "jsonl";

/// Watch depth in main-agent mode: `projects/<project>/<session>.jsonl`.
pub const MAIN_AGENT_DEPTH: usize = 1;

/// Watch depth with sub-agents: `projects/<project>/<session>/subagents/<agent>.jsonl`.
pub const SUB_AGENT_DEPTH: usize = 3;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// Configuration for the Chatter Monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path to the Claude Code directory.
    pub claude_dir: PathBuf,

    /// Whether sub-agent session logs are spoken too.
    pub include_sub_agents: bool,

    /// Minimum gap between two processed changes of the same file.
    pub debounce: Duration,

    /// Quiet period before a write is considered complete.
    pub stability_threshold: Duration,

    /// Interval between write-stability checks.
    pub poll_interval: Duration,

    /// Event hub URL, if one is configured.
    pub server_url: Option<String>,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - A numeric variable is set but is not a non-negative integer
    /// - `CHATTER_POLL_INTERVAL_MS` is zero
    /// - `CHATTER_INCLUDE_SUBAGENTS` is not a recognized boolean
    /// - `CHATTER_CLAUDE_DIR` is unset and the home directory cannot be determined
    pub fn from_env() -> Result<Self, ConfigError> {
        // Optional: CHATTER_CLAUDE_DIR (default: ~/.claude)
        let claude_dir = match env::var("CHATTER_CLAUDE_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
                base_dirs.home_dir().join(DEFAULT_CLAUDE_DIR)
            }
        };

        let include_sub_agents = match env::var("CHATTER_INCLUDE_SUBAGENTS") {
            Ok(val) => parse_bool("CHATTER_INCLUDE_SUBAGENTS", &val)?,
            Err(_) => false,
        };

        let debounce = parse_millis("CHATTER_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?;
        let stability_threshold =
            parse_millis("CHATTER_STABILITY_THRESHOLD_MS", DEFAULT_STABILITY_THRESHOLD_MS)?;

        // Optional: CHATTER_POLL_INTERVAL_MS (default: 50, must be > 0)
        let poll_interval = parse_millis("CHATTER_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "CHATTER_POLL_INTERVAL_MS".to_string(),
                message: "poll interval must be greater than 0".to_string(),
            });
        }

        let server_url = env::var("CHATTER_SERVER_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            claude_dir,
            include_sub_agents,
            debounce,
            stability_threshold,
            poll_interval,
            server_url,
        })
    }

    /// Directory holding per-project session logs.
    #[must_use]
    pub fn projects_dir(&self) -> PathBuf {
        self.claude_dir.join(PROJECTS_DIR)
    }

    /// Builds the tailer settings for this configuration.
    #[must_use]
    pub fn tailer_config(&self) -> TailerConfig {
        TailerConfig {
            root: self.projects_dir(),
            include_sub_agents: self.include_sub_agents,
            debounce: self.debounce,
            stability_threshold: self.stability_threshold,
            poll_interval: self.poll_interval,
            extension: LOG_EXTENSION.to_string(),
        }
    }
}

/// Settings for one [`LogTailer`](crate::watcher::LogTailer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailerConfig {
    /// Directory watched recursively.
    pub root: PathBuf,

    /// Selects watch depth and user-role shell output extraction.
    pub include_sub_agents: bool,

    /// Per-file change debounce.
    pub debounce: Duration,

    /// Write-stability quiet period.
    pub stability_threshold: Duration,

    /// Write-stability polling interval.
    pub poll_interval: Duration,

    /// Log file extension, without the leading dot.
    pub extension: String,
}

impl TailerConfig {
    /// Defaults for watching `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_sub_agents: false,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            stability_threshold: Duration::from_millis(DEFAULT_STABILITY_THRESHOLD_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            extension: LOG_EXTENSION.to_string(),
        }
    }

    /// Sets sub-agent mode.
    #[must_use]
    pub fn with_sub_agents(mut self, include_sub_agents: bool) -> Self {
        self.include_sub_agents = include_sub_agents;
        self
    }

    /// Deepest directory level below the root that is watched.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        if self.include_sub_agents {
            SUB_AGENT_DEPTH
        } else {
            MAIN_AGENT_DEPTH
        }
    }

    #[must_use]
    pub fn stability_window(&self) -> StabilityWindow {
        StabilityWindow {
            threshold: self.stability_threshold,
            poll_interval: self.poll_interval,
        }
    }
}

fn parse_bool(key: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean, got '{val}'"),
        }),
    }
}

fn parse_millis(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let millis = match env::var(key) {
        Ok(val) => val.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected non-negative integer milliseconds, got '{val}'"),
        })?,
        Err(_) => default,
    };
    Ok(Duration::from_millis(millis))
}
