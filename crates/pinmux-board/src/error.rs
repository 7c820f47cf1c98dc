//! Error types for loading board definitions.

use std::path::PathBuf;

/// Errors that can occur while loading a board definition.
///
/// Only file access can fail; malformed content is reported as diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Board definition file not found.
    #[error("board definition not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// I/O error reading the board definition.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for board loading.
pub type Result<T> = std::result::Result<T, BoardError>;
