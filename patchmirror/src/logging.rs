//! Log subscriber setup.
//!
//! Library code only emits `tracing` events; binaries call [`init_logging`]
//! once at startup and keep the returned guard alive until exit so the
//! optional file writer can flush.

use std::path::{Path, PathBuf};

use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{MirrorError, MirrorResult};

/// Logging options.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Lower the default level to `debug`.
    pub verbose: bool,
    /// Also append plain-text logs to this file.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            file: None,
        }
    }

    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn default_directive(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Keeps the background log writer alive.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the level chosen by [`LoggingConfig::verbose`].
pub fn init_logging(config: &LoggingConfig) -> MirrorResult<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));
    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_target(config.verbose);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let appender = open_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(timer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| MirrorError::Logging(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

fn open_appender(path: &Path) -> MirrorResult<RollingFileAppender> {
    let name = path
        .file_name()
        .ok_or_else(|| MirrorError::Logging(format!("{} is not a file path", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)
        .map_err(|e| MirrorError::Logging(format!("{}: {}", path.display(), e)))
}
