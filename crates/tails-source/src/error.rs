//! Source error types

use std::io;
use thiserror::Error;

/// Errors raised while following a log file
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("'{path}' is not a regular file")]
    NotAFile { path: String },

    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}
