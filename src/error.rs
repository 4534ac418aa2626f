use std::path::PathBuf;

/// A configuration value was rejected while resolving [`crate::Config`].
///
/// Every variant names the offending value so the user can find it in their
/// environment or `composer.json`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Wrong update frequency is requested: {0}")]
    UpdateFrequency(String),

    #[error("Wrong major version/channel is requested: {0}")]
    Channel(String),

    #[error("Wrong composer dir is requested: {} is not {reason}", dir.display())]
    Directory {
        dir: PathBuf,
        /// Either `a dir` or `accessible`.
        reason: &'static str,
    },

    #[error("Could not read wrapper config from {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Failures of the install/verify/update/delegate flow.
#[derive(Debug, thiserror::Error)]
pub enum WrapperError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("error downloading installer from {url}: {source}")]
    DownloadInstaller {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("error downloading checksum from {url}")]
    DownloadChecksum {
        url: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("checksum mismatch for {}: installer was removed", path.display())]
    ChecksumMismatch { path: PathBuf },

    #[error("error when installing composer (installer exit code: {exit_code})")]
    Install { exit_code: i32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The managed executable could not be run. Shown as-is so the wrapper
    /// stays invisible to the caller.
    #[error(transparent)]
    Delegate(std::io::Error),
}

pub type Result<T, E = WrapperError> = std::result::Result<T, E>;
