//! Installer core for the tblock launcher: resolves a Minecraft version and brings the
//! client, libraries, assets, Java runtime, Fabric and curated add-ons onto disk.

pub mod game;

pub use game::installer::config::InstallerConfig;
pub use game::installer::error::InstallError;
pub use game::installer::types::{
    InstallSpec, ProgressReporter, RuntimePolicy, SilentProgressReporter,
};
pub use game::installer::{install_instance, InstallSummary};
