//! Shared types for tails
//!
//! This crate contains data structures used across multiple tails crates.

use serde::Deserialize;
use std::sync::Arc;

// ============================================================================
// Stream Constants
// ============================================================================

/// Reserved payload telling a consumer that another reader took over the stream.
///
/// Never carried as log content: brokers drop source lines equal to it and the
/// admission gate treats it as a termination signal.
pub const SHUTDOWN_SENTINEL: &str = "!FORCE_SHUTDOWN!";

/// Style tag carried by spans produced by the search overlay
pub const SEARCH_HIGHLIGHT: &str = "search-highlight";

/// Style tag for text with no severity styling
pub const PLAIN: &str = "";

// ============================================================================
// Log Lines
// ============================================================================

/// A single accepted log line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    /// Unique sequential ID, assigned when the line enters the buffer
    pub id: u64,

    /// Line text as received (after length capping)
    pub text: String,
}

impl LogLine {
    pub fn new(id: u64, text: String) -> Self {
        Self { id, text }
    }
}

/// Shared handle to a buffered line (cheap to clone for rendering)
pub type ArcLogLine = Arc<LogLine>;

// ============================================================================
// Highlighting
// ============================================================================

/// A contiguous, styled piece of a rendered line
///
/// Borrows its tag from the rule set and its text from the line, so spans
/// live only as long as a single render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyledSpan<'a> {
    /// Position of the span within its line's span sequence
    pub id: usize,

    /// Style tag (rule tag, [`SEARCH_HIGHLIGHT`] or [`PLAIN`])
    pub tag: &'a str,

    /// The covered text, never empty
    pub text: &'a str,
}

/// A highlighting rule as written in configuration
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RuleSpec {
    /// Style tag attached to matching text
    pub tag: String,

    /// Case-insensitive regular expression
    pub pattern: String,
}

impl RuleSpec {
    pub fn new(tag: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            pattern: pattern.into(),
        }
    }
}

// ============================================================================
// Admission
// ============================================================================

/// Admission gate lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GateState {
    /// Connected but still inside the warm-up window; messages are dropped
    #[default]
    Warming,
    /// Accepting messages
    Open,
    /// Terminal; every further message terminates
    Closed,
}

impl GateState {
    /// Short display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warming => "warming",
            Self::Open => "live",
            Self::Closed => "closed",
        }
    }
}

/// Why a gate closed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The server handed the stream to another reader
    Sentinel,
    /// The stream failed or disconnected
    Transport(String),
    /// The viewer shut down
    Shutdown,
}

impl CloseReason {
    /// Human readable description for the operator
    pub fn describe(&self) -> String {
        match self {
            Self::Sentinel => "another viewer took over this stream".to_string(),
            Self::Transport(reason) => format!("stream failed: {}", reason),
            Self::Shutdown => "viewer shut down".to_string(),
        }
    }
}

/// Outcome of offering one inbound payload to the admission gate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Payload becomes a log line
    Accept(String),
    /// Payload is discarded
    Drop,
    /// Stop consuming the stream; do not resubscribe automatically
    Terminate,
}
