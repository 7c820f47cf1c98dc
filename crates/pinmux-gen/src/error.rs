//! Artifact output errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors writing a generated artifact.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, GenError>;
