use super::downloader::{fetch_and_verify, is_safe_relative_path};
use super::remove_path;
use crate::game::installer::config::InstallerConfig;
use crate::game::installer::error::InstallError;
use crate::game::installer::types::{ItemKind, ProgressReporter, SilentProgressReporter, ThirdPartyItem};
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};

/// Installed file name: the last path segment of the URL
pub fn item_file_name(url: &str) -> Result<String> {
    let parsed =
        url::Url::parse(url).map_err(|e| InstallError::invalid("item URL", format!("{}: {}", url, e)))?;

    let name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| InstallError::invalid("item URL", format!("{} has no file name", url)))?;

    if !is_safe_relative_path(Path::new(name)) {
        return Err(InstallError::invalid("item URL", format!("{} has no file name", url)).into());
    }
    Ok(name.to_string())
}

pub fn item_dir(config: &InstallerConfig, kind: ItemKind) -> PathBuf {
    match kind {
        ItemKind::Mod => config.mods_dir(),
        ItemKind::ResourcePack => config.resourcepacks_dir(),
    }
}

/// Download mods and resource packs, one after another.
pub async fn install_third_party_items(
    client: &Client,
    config: &InstallerConfig,
    items: &[ThirdPartyItem],
    reporter: &dyn ProgressReporter,
) -> Result<usize> {
    for dir in [config.mods_dir(), config.resourcepacks_dir()] {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Create directory {:?}", dir))?;
    }

    let total = items.len() as u32;
    for (i, item) in items.iter().enumerate() {
        let path = item_dir(config, item.kind).join(item_file_name(&item.url)?);
        log::info!("Downloading {:?} {} -> {:?}", item.kind, item.url, path);

        fetch_and_verify(
            client,
            &item.url,
            &path,
            item.sha1.as_deref(),
            &SilentProgressReporter,
        )
        .await
        .with_context(|| format!("Failed to install {}", item.url))?;

        reporter.set_step_count(i as u32 + 1, Some(total));
    }

    Ok(items.len())
}

/// Delete `mods/` and `resourcepacks/` so the next install starts clean
pub async fn remove_third_party_items(config: &InstallerConfig) -> Result<()> {
    for dir in [config.mods_dir(), config.resourcepacks_dir()] {
        if remove_path(&dir).await? {
            log::info!("Removed {:?}", dir);
        }
    }
    Ok(())
}
