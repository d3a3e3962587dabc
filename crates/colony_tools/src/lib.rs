//! # Colony Development Tools
//!
//! Command-line tools for development:
//! - Colony config validation
//! - Cost grid rendering

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod grid;
pub mod validate;

use colony_core::ColonyError;
use thiserror::Error;

/// Errors reported by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A core load or validation error.
    #[error(transparent)]
    Colony(#[from] ColonyError),

    /// The path held no files of the expected kind.
    #[error("No {kind} files found under '{path}'")]
    NothingFound {
        /// Kind of file looked for.
        kind: &'static str,
        /// Path searched.
        path: String,
    },

    /// Some files failed validation.
    #[error("{failed} of {total} config files failed validation")]
    ValidationFailed {
        /// Files that failed.
        failed: usize,
        /// Files checked.
        total: usize,
    },
}

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Read a text file, mapping failures to [`ColonyError::Io`].
pub(crate) fn read_text(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| {
        ColonyError::Io {
            path: path.display().to_string(),
            source,
        }
        .into()
    })
}
