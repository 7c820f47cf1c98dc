//! Error types for capability-table loading.

use std::path::{Path, PathBuf};

/// Errors that can occur while locating or loading a capability table.
#[derive(Debug, thiserror::Error)]
pub enum CapsError {
    /// No table file exists for the requested MCU.
    #[error("no capability table for {mcu} (tried: {})", join_paths(tried))]
    NotFound {
        /// The normalized MCU identifier.
        mcu: String,
        /// Every candidate path that was checked.
        tried: Vec<PathBuf>,
    },

    /// The MCU identifier is not a usable name.
    #[error("unknown MCU identifier '{id}'")]
    UnknownMcu { id: String },

    /// The file exists but contains no `PinMap_*` sections.
    #[error("{} contains no PinMap sections", path.display())]
    EmptyTable { path: PathBuf },

    /// I/O error reading a table file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no candidate paths".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl CapsError {
    pub(crate) fn empty(path: &Path) -> Self {
        CapsError::EmptyTable {
            path: path.to_path_buf(),
        }
    }
}

/// Result type for capability-table operations.
pub type Result<T> = std::result::Result<T, CapsError>;
