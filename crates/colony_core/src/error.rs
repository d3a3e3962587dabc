//! Error types for loading, validating and persisting colony data.
//!
//! Nothing inside a tick returns these: per-tick operations report enum
//! outcomes that callers handle locally. Errors are reserved for load-time
//! configuration, the record store and snapshot encoding.

use thiserror::Error;

/// Result type alias using [`ColonyError`].
pub type Result<T> = std::result::Result<T, ColonyError>;

/// Top-level error type for the colony core.
#[derive(Debug, Error)]
pub enum ColonyError {
    /// Configuration file parsing error.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path (or label) of the source that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Configuration was parsed but is internally inconsistent.
    #[error("Invalid colony config '{colony}': {problems:?}")]
    InvalidConfig {
        /// Colony the config belongs to.
        colony: String,
        /// Every problem found, in declaration order.
        problems: Vec<String>,
    },

    /// The persisted record store could not be decoded or encoded.
    #[error("Record store error: {0}")]
    Store(String),

    /// A cost grid snapshot could not be decoded or encoded.
    #[error("Cost grid snapshot error for region {region}: {message}")]
    Snapshot {
        /// Region the snapshot belongs to.
        region: String,
        /// Error message.
        message: String,
    },

    /// Underlying IO failure (tools only).
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Path being read or written.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
