use super::downloader::is_safe_relative_path;
use crate::game::installer::error::InstallError;
use crate::game::installer::types::StaticAsset;
use anyhow::{Context, Result};
use std::path::Path;

/// Write bundled files into the game directory, overwriting what is there.
/// Target directories are expected to exist already.
pub async fn write_static_files(game_dir: &Path, files: &[StaticAsset]) -> Result<()> {
    for file in files {
        if !is_safe_relative_path(&file.path) {
            return Err(
                InstallError::invalid("static file path", file.path.display().to_string()).into(),
            );
        }

        let target = game_dir.join(&file.path);
        tokio::fs::write(&target, &file.data)
            .await
            .with_context(|| format!("Failed to write static file {:?}", target))?;
        log::debug!("Wrote {} bytes to {:?}", file.data.len(), target);
    }

    log::info!("Wrote {} static files", files.len());
    Ok(())
}
