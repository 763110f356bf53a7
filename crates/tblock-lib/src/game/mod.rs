pub mod installer;
pub mod metadata;

// Re-export commonly used types
pub use installer::types::{Arch, OsType, Platform};
pub use metadata::{AssetIndexRef, Library, VersionDetails, VersionManifest};
