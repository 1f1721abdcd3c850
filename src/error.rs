//! Error handling for the remote script runner.
//!
//! Each stage of a run owns one error type. `RunnerError` unifies them so
//! the sequencer and the binary can tell fatal startup failures apart from
//! a lost status report. A script exiting non-zero is never an error: it is
//! counted and reported (see `ScriptRunResult::failed`).

use thiserror::Error;

/// Downloading the script bundle failed.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("Failed to fetch {url}: {reason}")]
    Request { url: String, reason: String },

    /// The controller answered with a non-success status.
    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// The downloaded bundle could not be unpacked.
#[derive(Error, Debug)]
#[error("Failed to extract script bundle into {dir}: {source}")]
pub struct ExtractError {
    pub dir: String,
    #[source]
    pub source: std::io::Error,
}

/// The bundle's `index.json` is missing or unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// `index.json` does not exist or could not be read
    #[error("Failed to read manifest {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// The JSON does not have the expected shape
    #[error("Invalid manifest format: {reason}")]
    InvalidFormat { reason: String },

    /// None of the protocol versions in the manifest are understood
    #[error("No supported manifest version (found: {found:?}, supported: {supported:?})")]
    UnsupportedVersion {
        found: Vec<String>,
        supported: Vec<String>,
    },

    /// Two scripts share a name, so their output files would collide
    #[error("Duplicate script name in manifest: {name}")]
    DuplicateName { name: String },

    /// A script name cannot be used as an output file name
    #[error("Invalid script name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
}

impl From<serde_json::Error> for ManifestError {
    fn from(err: serde_json::Error) -> Self {
        ManifestError::InvalidFormat {
            reason: err.to_string(),
        }
    }
}

/// A status signal could not be delivered to the controller.
#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("Failed to send {status} signal: {reason}")]
    Request { status: String, reason: String },

    #[error("Controller rejected {status} signal with HTTP {code}")]
    Rejected { status: String, code: u16 },
}

/// Invalid runner configuration (config file, CLI, credentials).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

impl ConfigError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Any failure that stops a run.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Reporting(#[from] ReportingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Preparing output capture files for a script failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Errors raised before any script ran; the controller saw no progress.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::Transfer(_) | Self::Extract(_) | Self::Manifest(_) | Self::Config(_)
        )
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;
