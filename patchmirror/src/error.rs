//! Error types for patchmirror.
//!
//! Per-file and per-manifest failures are reported through [`FetchError`] and
//! [`ManifestError`] and never abort a run on their own. [`MirrorError`] is
//! what escapes to the caller: setup problems and user cancellation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cancel::Cancelled;

/// Result type for top-level operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Errors that can occur while transferring a single file.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or no response was received.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with something other than 200.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The connection broke while streaming the body.
    #[error("failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },

    /// The mirror directory for the file could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// The destination file could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The user interrupted the transfer.
    #[error("transfer cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether another attempt might succeed.
    ///
    /// Transport errors, broken bodies and 5xx answers are retried; 4xx
    /// answers and local filesystem errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request { .. } | Self::Body { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::CreateDir { .. } | Self::Write { .. } | Self::Cancelled => false,
        }
    }
}

/// Errors that can occur while reading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest was never downloaded (or its download failed).
    #[error("manifest {} does not exist", path.display())]
    Missing { path: PathBuf },

    /// The manifest exists but could not be read.
    #[error("failed to read manifest {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// A line could not be decoded as a resource record.
    #[error("malformed record at {}:{line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl ManifestError {
    /// Whether this error ends the walk of its manifest in strict mode.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The file is not valid INI.
    #[error("failed to parse config {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// A key holds a value of the wrong shape.
    #[error("invalid value for [{section}] {key}: {value:?}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The user interrupted the run.
    #[error("interrupted by user")]
    Cancelled,

    /// A caller-supplied value is unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),

    /// The log subscriber could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl From<Cancelled> for MirrorError {
    fn from(_: Cancelled) -> Self {
        MirrorError::Cancelled
    }
}
