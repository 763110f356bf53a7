use crate::game::installer::config::InstallerConfig;
use crate::game::installer::core::batch::{download_assets, plan_asset_jobs, AssetSummary};
use crate::game::installer::core::downloader::{fetch_and_verify, is_safe_relative_path};
use crate::game::installer::core::remove_path;
use crate::game::installer::error::InstallError;
use crate::game::installer::types::ProgressReporter;
use crate::game::metadata::{AssetIndex, AssetIndexRef, VersionDetails};
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};

fn check_version_id(version_id: &str) -> Result<()> {
    let path = Path::new(version_id);
    if !is_safe_relative_path(path) || path.components().count() != 1 {
        return Err(InstallError::invalid("version id", version_id).into());
    }
    Ok(())
}

/// Download the client jar to `versions/<id>/<id>.jar`
pub async fn install_client(
    client: &Client,
    config: &InstallerConfig,
    details: &VersionDetails,
    reporter: &dyn ProgressReporter,
) -> Result<PathBuf> {
    check_version_id(&details.id)?;
    let client_download = &details.downloads.client;
    if client_download.url.is_empty() {
        anyhow::bail!("No client download found in version info");
    }

    let client_jar_path = config.client_jar_path(&details.id);
    log::info!(
        "Starting client jar download: {} -> {:?} ({} bytes)",
        client_download.url,
        client_jar_path,
        client_download.size
    );

    fetch_and_verify(
        client,
        &client_download.url,
        &client_jar_path,
        Some(&client_download.sha1),
        reporter,
    )
    .await
    .context("Failed to download client jar")?;

    log::info!("Client jar ready at {:?}", client_jar_path);
    Ok(client_jar_path)
}

/// Fetch the asset index, then every object it lists
pub async fn install_assets(
    client: &Client,
    config: &InstallerConfig,
    index_ref: &AssetIndexRef,
    reporter: &dyn ProgressReporter,
) -> Result<AssetSummary> {
    let index_name = format!("{}.json", index_ref.id);
    if !is_safe_relative_path(Path::new(&index_name)) {
        return Err(InstallError::invalid("asset index id", &index_ref.id).into());
    }
    let index_path = config.asset_indexes_dir().join(index_name);

    log::info!(
        "Downloading asset index {} -> {:?}",
        index_ref.url,
        index_path
    );
    fetch_and_verify(
        client,
        &index_ref.url,
        &index_path,
        Some(&index_ref.sha1),
        reporter,
    )
    .await
    .context("Failed to download asset index")?;

    let bytes = tokio::fs::read(&index_path)
        .await
        .with_context(|| format!("Read asset index {:?}", index_path))?;
    let index: AssetIndex =
        serde_json::from_slice(&bytes).map_err(|source| InstallError::Format {
            what: "asset index".to_string(),
            source,
        })?;

    let jobs = plan_asset_jobs(&index)?;
    download_assets(client, config, jobs, reporter).await
}

/// Remove an installed version so the next run fetches everything again.
/// Libraries, assets and natives are shared between versions and go too.
pub async fn remove_version(config: &InstallerConfig, version_id: &str) -> Result<()> {
    check_version_id(version_id)?;
    log::info!("Removing version {}", version_id);

    let targets = [
        config.client_jar_path(version_id),
        config.libraries_dir(),
        config.assets_dir(),
        config.natives_dir(),
    ];
    for target in targets {
        if !remove_path(&target).await? {
            log::debug!("Nothing to remove at {:?}", target);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remove_version_tolerates_missing_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let config = InstallerConfig::new(tmp.path());

        let jar = config.client_jar_path("1.21.4");
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        std::fs::write(&jar, b"jar").unwrap();
        std::fs::create_dir_all(config.asset_objects_dir().join("ab")).unwrap();
        std::fs::write(tmp.path().join("options.txt"), b"keep").unwrap();

        remove_version(&config, "1.21.4").await.unwrap();

        assert!(!jar.exists());
        assert!(!config.assets_dir().exists());
        assert!(tmp.path().join("options.txt").exists());
        remove_version(&config, "1.21.4").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_path_like_version_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let config = InstallerConfig::new(tmp.path());
        assert!(remove_version(&config, "../1.21.4").await.is_err());
        assert!(remove_version(&config, "a/b").await.is_err());
    }
}
