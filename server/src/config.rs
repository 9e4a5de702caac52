//! Server configuration module.
//!
//! Parses configuration from environment variables for the Chatter server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `CHATTER_PORT` | No | 8563 | HTTP server port |
//! | `PORT` | No | 8563 | Fallback when `CHATTER_PORT` is unset |
//! | `CHATTER_HOST` | No | 127.0.0.1 | Address to bind |

use std::env;

use thiserror::Error;

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 8563;

/// Default bind address. The hub is meant for local clients only.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address to bind.
    pub host: String,

    /// HTTP server port.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The port is not a number between 1 and 65535
    /// - `CHATTER_HOST` is set but blank
    /// - A variable contains invalid unicode
    ///
    /// # Example
    ///
    /// ```no_run
    /// use chatter_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on {}", config.bind_address());
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port()?;
        let host = parse_host()?;

        Ok(Self { host, port })
    }

    /// `host:port` string for binding and logging.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reads a variable, treating "not set" as `None`.
fn read_var(name: &str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: name.to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse `CHATTER_PORT`, falling back to `PORT`, then the default.
fn parse_port() -> Result<u16, ConfigError> {
    let (var, value) = match read_var("CHATTER_PORT")? {
        Some(value) => ("CHATTER_PORT", value),
        None => match read_var("PORT")? {
            Some(value) => ("PORT", value),
            None => return Ok(DEFAULT_PORT),
        },
    };

    let port: u16 = value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigError::InvalidFormat {
            var: var.to_string(),
            message: format!("invalid port number '{value}': {e}"),
        })?;

    if port == 0 {
        return Err(ConfigError::InvalidFormat {
            var: var.to_string(),
            message: "port must be greater than 0".to_string(),
        });
    }

    Ok(port)
}

fn parse_host() -> Result<String, ConfigError> {
    match read_var("CHATTER_HOST")? {
        Some(host) if host.trim().is_empty() => Err(ConfigError::InvalidFormat {
            var: "CHATTER_HOST".to_string(),
            message: "host cannot be empty".to_string(),
        }),
        Some(host) => Ok(host.trim().to_string()),
        None => Ok(DEFAULT_HOST.to_string()),
    }
}
