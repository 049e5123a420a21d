//! CLI error type and exit statuses.

use patchmirror::{ConfigError, MirrorError};
use thiserror::Error;

/// Run completed (per-file failures included).
pub const EXIT_OK: i32 = 0;
/// Setup error or a manifest abandoned as malformed.
pub const EXIT_FAILURE: i32 = 1;
/// Interrupted by the user (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Errors that stop the CLI before or during a run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Mirror(#[from] MirrorError),

    #[error("Failed to set signal handler: {0}")]
    SignalHandler(String),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Mirror(err.into())
    }
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Mirror(MirrorError::Cancelled) => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }
}
