use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Progress reporter trait for installer operations
/// Implementations forward updates to the UI layer
pub trait ProgressReporter: Send + Sync {
    /// Start a new step with optional total steps
    fn start_step(&self, name: &str, total_steps: Option<u32>);

    /// Update bytes transferred for download progress
    fn update_bytes(&self, transferred: u64, total: Option<u64>);

    /// Set overall percentage (0-100)
    fn set_percent(&self, percent: i32);

    /// Set a short status message
    fn set_message(&self, message: &str);

    /// Set a numeric step count for the current step (e.g. "3/12").
    /// `total` may be None when unknown.
    fn set_step_count(&self, current: u32, total: Option<u32>);

    /// Mark operation as complete
    fn done(&self, success: bool, message: Option<&str>);
}

/// A progress reporter that does nothing (silent).
/// Used for per-item downloads inside a batch and in tests.
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn start_step(&self, _name: &str, _total_steps: Option<u32>) {}
    fn update_bytes(&self, _transferred: u64, _total: Option<u64>) {}
    fn set_percent(&self, _percent: i32) {}
    fn set_message(&self, _message: &str) {}
    fn set_step_count(&self, _current: u32, _total: Option<u32>) {}
    fn done(&self, _success: bool, _message: Option<&str>) {}
}

/// What to do about the Java runtime during an install run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimePolicy {
    Skip,
    #[default]
    IfMissing,
    Always,
}

/// A bundled file written verbatim into the game directory
#[derive(Debug, Clone)]
pub struct StaticAsset {
    /// Path relative to the game directory
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl StaticAsset {
    pub fn new(path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Mod,
    ResourcePack,
}

/// A curated add-on downloaded into `mods/` or `resourcepacks/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyItem {
    pub kind: ItemKind,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl ThirdPartyItem {
    pub fn new(kind: ItemKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            sha1: None,
        }
    }
}

/// Installation request for a single run
#[derive(Debug, Clone)]
pub struct InstallSpec {
    /// Minecraft version ID (e.g., "1.21.4")
    pub version_id: String,

    /// Fabric loader version, when the instance is modded
    pub fabric_loader_version: Option<String>,

    pub runtime: RuntimePolicy,

    /// Default files (options.txt, servers.dat, ...)
    pub static_files: Vec<StaticAsset>,

    /// Mods and resource packs
    pub items: Vec<ThirdPartyItem>,
}

impl InstallSpec {
    pub fn new(version_id: impl Into<String>) -> Self {
        Self {
            version_id: version_id.into(),
            fabric_loader_version: None,
            runtime: RuntimePolicy::default(),
            static_files: Vec::new(),
            items: Vec::new(),
        }
    }
}

/// Operating system types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    Windows,
    MacOS,
    Linux,
    Other,
}

impl OsType {
    /// Detect the current OS
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => OsType::Windows,
            "macos" => OsType::MacOS,
            "linux" => OsType::Linux,
            _ => OsType::Other,
        }
    }

    /// Get the OS name as used by library rules
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Windows => "windows",
            OsType::MacOS => "osx",
            OsType::Linux => "linux",
            OsType::Other => "unknown",
        }
    }
}

/// Architecture types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Arm64,
    X86,
    Arm32,
    Other,
}

impl Arch {
    /// Detect the current architecture
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "x86_64" => Arch::X64,
            "aarch64" => Arch::Arm64,
            "x86" => Arch::X86,
            "arm" => Arch::Arm32,
            _ => Arch::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x86_64",
            Arch::Arm64 => "arm64",
            Arch::X86 => "x86",
            Arch::Arm32 => "arm32",
            Arch::Other => "unknown",
        }
    }
}

/// The host a library set or runtime is resolved for.
/// Passed explicitly so rule evaluation and runtime selection are testable off-host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: OsType,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: OsType, arch: Arch) -> Self {
        Self { os, arch }
    }

    pub fn current() -> Self {
        Self::new(OsType::current(), Arch::current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_policy_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RuntimePolicy::IfMissing).unwrap(),
            "\"if_missing\""
        );
        assert_eq!(RuntimePolicy::default(), RuntimePolicy::IfMissing);
    }

    #[test]
    fn third_party_item_sha1_is_optional() {
        let item: ThirdPartyItem =
            serde_json::from_str(r#"{"kind": "resourcepack", "url": "https://cdn/x.zip"}"#)
                .unwrap();
        assert_eq!(item.kind, ItemKind::ResourcePack);
        assert!(item.sha1.is_none());
    }

    #[test]
    fn os_names_match_rule_vocabulary() {
        assert_eq!(OsType::MacOS.as_str(), "osx");
        assert_eq!(OsType::Windows.as_str(), "windows");
        assert_eq!(Arch::X86.as_str(), "x86");
    }
}
