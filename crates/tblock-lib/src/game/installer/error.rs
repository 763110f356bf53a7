use std::path::PathBuf;

/// Typed failures raised by the installer.
///
/// Public functions return `anyhow::Result`; these variants sit at the root of the
/// chain so callers can `downcast_ref::<InstallError>()` to tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Failed to fetch {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status}: {url}")]
    Http {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("SHA1 mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Failed to parse {what}")]
    Format {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {what}: {reason}")]
    Invalid { what: String, reason: String },

    #[error("Version {0} not found")]
    VersionNotFound(String),

    #[error("Unsupported platform: {os} {arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("{failed} of {total} assets failed to download")]
    AssetsFailed {
        total: usize,
        downloaded: usize,
        skipped: usize,
        failed: usize,
        /// First few failure messages, for diagnostics.
        first_errors: Vec<String>,
    },
}

impl InstallError {
    pub(crate) fn invalid(what: impl Into<String>, reason: impl Into<String>) -> Self {
        InstallError::Invalid {
            what: what.into(),
            reason: reason.into(),
        }
    }
}
