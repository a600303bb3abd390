//! Configuration loading
//!
//! An optional TOML file; every section and field has a default so an empty
//! file (or no file) just works. Command-line flags are applied on top and
//! the result validated once.
//!
//! ```toml
//! [buffer]
//! capacity = 40000
//!
//! [gate]
//! warmup_ms = 500
//!
//! [search]
//! debounce_ms = 1000
//!
//! [stream]
//! poll_interval_ms = 250
//! backlog_lines = 10
//! max_line_length = 4096
//! reconnect = false
//! reconnect_delay_ms = 1000
//! single_reader = true
//!
//! [log]
//! level = "warn"
//! file = "/tmp/tails.log"
//!
//! [[rules]]
//! tag = "error"
//! pattern = "error|fatal"
//!
//! [[rules]]
//! tag = ""
//! pattern = "(?s).+"
//! ```

use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use tails_logs::{RuleError, RuleSet, RuleSpec, SessionOptions};
use tails_source::{FollowOptions, ReaderPolicy};

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("invalid highlighting rules: {0}")]
    Rules(#[from] RuleError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum retained lines
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: 40_000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Lines arriving this soon after subscribing are dropped
    pub warmup_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { warmup_ms: 500 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period before a typed query is applied
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 1000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub poll_interval_ms: u64,
    pub backlog_lines: usize,

    /// Longer lines are cut to this many characters
    pub max_line_length: usize,

    /// Start over after the source fails
    pub reconnect: bool,
    pub reconnect_delay_ms: u64,

    /// Retire the previous reader when a new one subscribes.
    ///
    /// Readers are per process: the viewer subscribes exactly once to each
    /// follower it starts, so a second viewer never retires the first.
    pub single_reader: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            backlog_lines: 10,
            max_line_length: 4096,
            reconnect: false,
            reconnect_delay_ms: 1000,
            single_reader: true,
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,

    /// Write diagnostics here instead of stderr
    pub file: Option<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub buffer: BufferConfig,
    pub gate: GateConfig,
    pub search: SearchConfig,
    pub stream: StreamConfig,
    pub log: LogConfig,

    /// Replaces the built-in highlighting rules when present
    pub rules: Option<Vec<RuleSpec>>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and compile the rules once
    pub fn validate(&self) -> Result<()> {
        if self.buffer.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "buffer.capacity",
                message: "must be at least 1".to_string(),
            });
        }
        if self.stream.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.poll_interval_ms",
                message: "must be at least 1".to_string(),
            });
        }
        if self.stream.max_line_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.max_line_length",
                message: "must be at least 1".to_string(),
            });
        }
        self.rule_set()?;
        Ok(())
    }

    /// Configured rules, or the built-in set
    pub fn rule_set(&self) -> Result<RuleSet> {
        match &self.rules {
            Some(specs) => Ok(RuleSet::new(specs.iter().cloned())?),
            None => Ok(RuleSet::builtin()),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            capacity: self.buffer.capacity,
            warmup: Duration::from_millis(self.gate.warmup_ms),
            max_line_length: self.stream.max_line_length,
        }
    }

    pub fn follow_options(&self) -> FollowOptions {
        FollowOptions {
            poll_interval: Duration::from_millis(self.stream.poll_interval_ms),
            backlog_lines: self.stream.backlog_lines,
        }
    }

    pub fn reader_policy(&self) -> ReaderPolicy {
        if self.stream.single_reader {
            ReaderPolicy::Single
        } else {
            ReaderPolicy::Broadcast
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.stream.reconnect_delay_ms)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
