use super::types::*;
use crate::game::installer::config::InstallerConfig;
use crate::game::installer::core::downloader::download_json_with_client;
use crate::game::installer::error::InstallError;
use anyhow::{Context, Result};
use reqwest::Client;

/// Fetch the version catalog
pub async fn fetch_version_manifest(
    client: &Client,
    config: &InstallerConfig,
) -> Result<VersionManifest> {
    log::info!("Downloading version manifest from {}", config.manifest_url);
    download_json_with_client(client, &config.manifest_url, "version manifest")
        .await
        .context("Failed to fetch version manifest")
}

/// Resolve a version id (e.g. "1.21.4") to the URL of its metadata document
pub async fn resolve_version_url(
    client: &Client,
    config: &InstallerConfig,
    version_id: &str,
) -> Result<String> {
    let manifest = fetch_version_manifest(client, config).await?;

    let entry = manifest
        .find(version_id)
        .ok_or_else(|| InstallError::VersionNotFound(version_id.to_string()))?;

    log::debug!("Found version entry: {} -> {}", entry.id, entry.url);
    Ok(entry.url.clone())
}

/// Fetch and decode the metadata document for one version
pub async fn fetch_version_details(client: &Client, url: &str) -> Result<VersionDetails> {
    log::info!("Downloading version details from {}", url);
    let details: VersionDetails = download_json_with_client(client, url, "version details")
        .await
        .context("Failed to fetch version details")?;

    log::info!(
        "Version info loaded: {} ({} libraries, asset index {})",
        details.id,
        details.libraries.len(),
        details.asset_index.id
    );
    Ok(details)
}
