use crate::game::installer::config::InstallerConfig;
use crate::game::installer::core::downloader::{
    download_json_with_client, fetch_and_verify, is_safe_relative_path,
};
use crate::game::installer::core::library::{maven_path, maven_url};
use crate::game::installer::error::InstallError;
use crate::game::installer::types::{ProgressReporter, SilentProgressReporter};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FabricProfileLibrary {
    /// Maven coordinates
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
}

/// Loader profile served by Fabric meta; a version document inheriting from vanilla
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricProfile {
    pub id: String,
    pub inherits_from: String,
    pub main_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    #[serde(default)]
    pub libraries: Vec<FabricProfileLibrary>,
}

/// `fabric-loader-<loader>-<mc>`
pub fn fabric_version_id(mc_version: &str, loader_version: &str) -> String {
    format!("fabric-loader-{}-{}", loader_version, mc_version)
}

/// `versions/<id>/<id>.json`
pub fn fabric_profile_path(config: &InstallerConfig, mc_version: &str, loader_version: &str) -> PathBuf {
    let id = fabric_version_id(mc_version, loader_version);
    config.versions_dir().join(&id).join(format!("{}.json", id))
}

pub fn is_fabric_installed(config: &InstallerConfig, mc_version: &str, loader_version: &str) -> bool {
    fabric_profile_path(config, mc_version, loader_version).is_file()
}

/// Fetch the loader profile, store it as a version document and install its libraries.
/// Returns the installed version id.
pub async fn install_fabric(
    client: &Client,
    config: &InstallerConfig,
    mc_version: &str,
    loader_version: &str,
    reporter: &dyn ProgressReporter,
) -> Result<String> {
    let version_id = fabric_version_id(mc_version, loader_version);
    let id_path = Path::new(&version_id);
    if !is_safe_relative_path(id_path) || id_path.components().count() != 1 {
        return Err(InstallError::invalid("fabric version", version_id).into());
    }

    log::info!(
        "Installing Fabric {} for Minecraft {}",
        loader_version,
        mc_version
    );

    let profile_url = format!(
        "{}/loader/{}/{}/profile/json",
        config.fabric.meta_url.trim_end_matches('/'),
        mc_version,
        loader_version
    );
    let raw: serde_json::Value = download_json_with_client(client, &profile_url, "fabric profile")
        .await
        .context("Failed to download Fabric profile")?;
    let profile: FabricProfile =
        serde_json::from_value(raw.clone()).map_err(|source| InstallError::Format {
            what: "fabric profile".to_string(),
            source,
        })?;

    log::debug!(
        "Fabric profile ID: {}, inherits: {}, {} libraries",
        profile.id,
        profile.inherits_from,
        profile.libraries.len()
    );

    let profile_path = fabric_profile_path(config, mc_version, loader_version);
    if let Some(parent) = profile_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let pretty = serde_json::to_vec_pretty(&raw)?;
    tokio::fs::write(&profile_path, pretty)
        .await
        .with_context(|| format!("Write Fabric profile {:?}", profile_path))?;

    let libraries_dir = config.libraries_dir();
    let total = profile.libraries.len() as u32;
    for (i, library) in profile.libraries.iter().enumerate() {
        let rel_path = maven_path(&library.name)?;
        let base = library.url.as_deref().unwrap_or(&config.fabric.maven_url);
        let url = maven_url(base, &rel_path);

        fetch_and_verify(
            client,
            &url,
            &libraries_dir.join(&rel_path),
            library.sha1.as_deref(),
            &SilentProgressReporter,
        )
        .await
        .with_context(|| format!("Failed to install library {}", library.name))?;

        reporter.set_step_count(i as u32 + 1, Some(total));
    }

    log::info!("Fabric installed as {}", version_id);
    Ok(version_id)
}
