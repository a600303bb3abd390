//! Log processing for tails
//!
//! This crate provides the ring buffer, highlighting rules and tokenizer,
//! search debouncing and the admission gate.

mod buffer;
mod export;
mod filter;
mod gate;
mod highlight;
mod rules;
mod search;
mod session;

pub use buffer::LogBuffer;
pub use export::{TAB_WIDTH, copy_all};
pub use filter::SearchPattern;
pub use gate::AdmissionGate;
pub use highlight::build_spans;
pub use rules::{Rule, RuleError, RuleSet};
pub use search::SearchController;
pub use session::{IngestStats, Ingested, LogSession, SessionOptions};

// Re-export types used in our public API
pub use tails_types::{
    ArcLogLine, CloseReason, Decision, GateState, LogLine, RuleSpec, StyledSpan,
};
