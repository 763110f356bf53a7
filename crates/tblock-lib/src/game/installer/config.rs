//! Centralized installer settings.
//! Every remote location and tunable the stages need is carried by `InstallerConfig`,
//! which is built once and passed by reference into each stage.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// URL Constants
pub const VANILLA_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
pub const FABRIC_META_URL: &str = "https://meta.fabricmc.net/v2/versions";
pub const FABRIC_MAVEN_URL: &str = "https://maven.fabricmc.net/";
pub const TEMURIN_RELEASES_URL: &str =
    "https://github.com/adoptium/temurin21-binaries/releases/download";

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const REQUEST_TIMEOUT_SECS: u64 = 1800;
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

pub const JAVA_MAJOR_VERSION: &str = "21";
pub const JAVA_RELEASE: &str = "21.0.9+10";

/// Fabric needs a newer asm than the one vanilla pulls in.
pub const DEFAULT_LIBRARY_DENYLIST: &[&str] = &["asm-9.6.jar"];

/// Java runtime distribution to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Feature release, e.g. "21"
    pub major: String,
    /// Full release name, e.g. "21.0.9+10"
    pub release: String,
    /// Directory URL the archives are published under
    pub base_url: String,
}

impl RuntimeConfig {
    pub fn temurin(major: &str, release: &str) -> Self {
        Self {
            major: major.to_string(),
            release: release.to_string(),
            base_url: format!(
                "{}/jdk-{}",
                TEMURIN_RELEASES_URL,
                release.replace('+', "%2B")
            ),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::temurin(JAVA_MAJOR_VERSION, JAVA_RELEASE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    pub meta_url: String,
    pub maven_url: String,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            meta_url: FABRIC_META_URL.to_string(),
            maven_url: FABRIC_MAVEN_URL.to_string(),
        }
    }
}

/// Immutable installer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Root of the game installation (`~/.tblock` for the launcher)
    pub game_dir: PathBuf,

    /// Mojang version manifest (v2)
    pub manifest_url: String,

    /// Host serving content-addressed asset objects
    pub resources_url: String,

    /// Number of concurrent asset workers
    pub concurrency: usize,

    /// Library file names that are never installed
    pub library_denylist: Vec<String>,

    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,

    pub runtime: RuntimeConfig,
    pub fabric: FabricConfig,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            game_dir: PathBuf::from(".tblock"),
            manifest_url: VANILLA_MANIFEST_URL.to_string(),
            resources_url: RESOURCES_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            library_denylist: DEFAULT_LIBRARY_DENYLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            runtime: RuntimeConfig::default(),
            fabric: FabricConfig::default(),
        }
    }
}

impl InstallerConfig {
    pub fn new(game_dir: impl Into<PathBuf>) -> Self {
        Self {
            game_dir: game_dir.into(),
            ..Self::default()
        }
    }

    /// Check the values a stage would otherwise trip over halfway through a run.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }

        let urls = [
            ("manifest_url", &self.manifest_url),
            ("resources_url", &self.resources_url),
            ("runtime.base_url", &self.runtime.base_url),
            ("fabric.meta_url", &self.fabric.meta_url),
            ("fabric.maven_url", &self.fabric.maven_url),
        ];
        for (field, value) in urls {
            url::Url::parse(value).with_context(|| format!("Invalid {}: {}", field, value))?;
        }

        if self.runtime.major.is_empty() || self.runtime.release.is_empty() {
            anyhow::bail!("runtime major and release must be set");
        }

        Ok(())
    }

    /// Shared HTTP client for a whole install run.
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .pool_max_idle_per_host(self.concurrency.max(8))
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.game_dir.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.game_dir.join("assets")
    }

    pub fn asset_indexes_dir(&self) -> PathBuf {
        self.assets_dir().join("indexes")
    }

    pub fn asset_objects_dir(&self) -> PathBuf {
        self.assets_dir().join("objects")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.game_dir.join("versions")
    }

    /// `versions/<id>/<id>.jar`
    pub fn client_jar_path(&self, version_id: &str) -> PathBuf {
        self.versions_dir()
            .join(version_id)
            .join(format!("{}.jar", version_id))
    }

    pub fn natives_dir(&self) -> PathBuf {
        self.game_dir.join("natives")
    }

    pub fn java_dir(&self) -> PathBuf {
        self.game_dir.join("java")
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.game_dir.join("mods")
    }

    pub fn resourcepacks_dir(&self) -> PathBuf {
        self.game_dir.join("resourcepacks")
    }
}
