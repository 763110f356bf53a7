pub mod config;
pub mod core;
pub mod error;
pub mod modloaders;
pub mod types;
pub mod vanilla;

use anyhow::{Context, Result};
use config::InstallerConfig;
use modloaders::fabric::install_fabric;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use types::{InstallSpec, Platform, ProgressReporter, RuntimePolicy};
use vanilla::{install_assets, install_client};

use crate::game::installer::core::batch::AssetSummary;
use crate::game::installer::core::jre_manager::{find_runtime_executable, install_runtime};
use crate::game::installer::core::library::{install_libraries, LibrarySummary};
use crate::game::installer::core::resources::install_third_party_items;
use crate::game::installer::core::static_files::write_static_files;
use crate::game::metadata::{fetch_version_details, resolve_version_url};

/// What an install run produced
#[derive(Debug, Clone, Default)]
pub struct InstallSummary {
    pub version_id: String,
    pub client_jar: PathBuf,
    pub libraries: LibrarySummary,
    pub assets: AssetSummary,
    /// Installed Fabric version id, when a loader was requested
    pub fabric_version_id: Option<String>,
    /// Java executable, when a runtime is present
    pub java_path: Option<PathBuf>,
    pub items_installed: usize,
}

/// Main entry point for game installation.
/// Runs every stage in order against the host platform.
pub async fn install_instance(
    config: &InstallerConfig,
    spec: &InstallSpec,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<InstallSummary> {
    install_instance_for(config, spec, Platform::current(), reporter).await
}

/// [`install_instance`] for an explicit platform
pub async fn install_instance_for(
    config: &InstallerConfig,
    spec: &InstallSpec,
    platform: Platform,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<InstallSummary> {
    log::info!(
        "Starting installation: version={}, fabric={:?}, runtime={:?}, game_dir={:?}",
        spec.version_id,
        spec.fabric_loader_version,
        spec.runtime,
        config.game_dir
    );

    let result = async {
        config.validate().context("Invalid installer configuration")?;
        tokio::fs::create_dir_all(&config.game_dir)
            .await
            .with_context(|| format!("Create game directory {:?}", config.game_dir))?;

        let client = config.http_client()?;
        run_stages(&client, config, spec, platform, reporter.as_ref()).await
    }
    .await;

    match &result {
        Ok(_) => {
            reporter.done(true, Some("Installation complete"));
            log::info!("Installation completed successfully: {}", spec.version_id);
        }
        Err(e) => {
            reporter.done(false, Some("Installation failed"));
            log::error!("Installation of {} failed: {:#}", spec.version_id, e);
        }
    }
    result
}

async fn run_stages(
    client: &Client,
    config: &InstallerConfig,
    spec: &InstallSpec,
    platform: Platform,
    reporter: &dyn ProgressReporter,
) -> Result<InstallSummary> {
    let mut summary = InstallSummary {
        version_id: spec.version_id.clone(),
        ..Default::default()
    };

    reporter.start_step("Fetching version manifest", Some(8));
    reporter.set_percent(0);
    let version_url = resolve_version_url(client, config, &spec.version_id).await?;
    let details = fetch_version_details(client, &version_url).await?;
    reporter.set_message(&format!("Installing Minecraft {}", details.id));

    reporter.start_step("Downloading game client", Some(8));
    reporter.set_percent(10);
    summary.client_jar = install_client(client, config, &details, reporter).await?;

    reporter.start_step("Downloading libraries", Some(8));
    reporter.set_percent(20);
    summary.libraries =
        install_libraries(client, config, platform, &details.libraries, reporter).await?;

    reporter.start_step("Downloading assets", Some(8));
    reporter.set_percent(35);
    summary.assets = install_assets(client, config, &details.asset_index, reporter).await?;
    reporter.set_message(&format!(
        "{} assets ({} downloaded, {} up to date)",
        summary.assets.total, summary.assets.downloaded, summary.assets.skipped
    ));

    if let Some(loader_version) = &spec.fabric_loader_version {
        reporter.start_step("Installing Fabric", Some(8));
        reporter.set_percent(70);
        summary.fabric_version_id = Some(
            install_fabric(client, config, &details.id, loader_version, reporter)
                .await
                .with_context(|| format!("Failed to install Fabric {}", loader_version))?,
        );
    }

    reporter.start_step("Installing Java runtime", Some(8));
    reporter.set_percent(80);
    summary.java_path = match spec.runtime {
        RuntimePolicy::Skip => find_runtime_executable(config, platform),
        RuntimePolicy::IfMissing => match find_runtime_executable(config, platform) {
            Some(existing) => {
                log::info!("Java runtime already present at {:?}", existing);
                Some(existing)
            }
            None => Some(install_runtime(client, config, platform, reporter).await?),
        },
        RuntimePolicy::Always => Some(install_runtime(client, config, platform, reporter).await?),
    };

    reporter.start_step("Writing default files", Some(8));
    reporter.set_percent(90);
    write_static_files(&config.game_dir, &spec.static_files).await?;

    reporter.start_step("Downloading mods and resource packs", Some(8));
    reporter.set_percent(95);
    summary.items_installed =
        install_third_party_items(client, config, &spec.items, reporter).await?;

    reporter.set_percent(100);
    reporter.set_message(&format!("Minecraft {} is ready", details.id));
    Ok(summary)
}
