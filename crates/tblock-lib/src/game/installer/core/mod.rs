pub mod batch;
pub mod downloader;
pub mod jre_manager;
pub mod library;
pub mod resources;
pub mod static_files;

use anyhow::{Context, Result};
use std::path::Path;

/// Remove a file or directory tree. Returns false when nothing was there.
pub async fn remove_path(path: &Path) -> Result<bool> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("Stat {:?}", path)),
    };

    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
    .with_context(|| format!("Remove {:?}", path))?;

    log::debug!("Removed {:?}", path);
    Ok(true)
}
