//! Writing generated headers to disk.

use std::path::Path;

use crate::error::{GenError, Result};

/// Write `text` to `path`, creating missing parent directories.
pub fn write_artifact(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| GenError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    std::fs::write(path, text).map_err(|source| GenError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("wrote {} ({} bytes)", path.display(), text.len());
    Ok(())
}
