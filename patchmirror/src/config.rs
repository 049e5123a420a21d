//! Runtime configuration.
//!
//! [`FetchConfig`] holds the settings the fetcher and orchestrator run with.
//! [`ConfigFile`] is the optional on-disk INI file whose values sit between
//! the built-in defaults and command-line flags:
//!
//! ```ini
//! [fetch]
//! output = ./resources
//! timeout = 300
//! retries = 2
//! retry_delay = 1
//! parallel = 1
//! chunk_size = 16777216
//! lenient = false
//!
//! [live]
//! base_url = https://autopatchhk.yuanshen.com
//!
//! [beta]
//! base_url = https://autopatchcn.yuanshen.com
//!
//! [logging]
//! file = /var/log/patchmirror.log
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use crate::environment::Environment;
use crate::error::ConfigError;
use crate::manifest::ParseMode;

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "./resources";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default number of extra attempts for transient failures.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default base delay between attempts in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 1;

/// Default read buffer for streaming bodies to disk (16 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Settings for one fetch run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Root of the local mirror.
    pub output_dir: PathBuf,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Extra attempts for transient failures.
    pub retries: u32,

    /// Base delay between attempts; attempt `n` waits `n * retry_delay`.
    pub retry_delay: Duration,

    /// Maximum concurrent resource transfers (1 = sequential).
    pub parallel: usize,

    /// Read buffer size used while streaming a body to disk.
    pub chunk_size: usize,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Handling of undecodable manifest records.
    pub parse_mode: ParseMode,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            parallel: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            user_agent: format!("patchmirror/{}", env!("CARGO_PKG_VERSION")),
            parse_mode: ParseMode::Strict,
        }
    }
}

impl FetchConfig {
    /// Create a configuration mirroring into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of extra attempts.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the base retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the maximum concurrent transfers (minimum 1).
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    /// Set the streaming buffer size (minimum 1 byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the manifest parse mode.
    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }
}

/// `[fetch]` section of the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSection {
    pub output: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
    pub parallel: Option<usize>,
    pub chunk_size: Option<usize>,
    pub lenient: Option<bool>,
}

/// Contents of the on-disk config file. Every value is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub fetch: FetchSection,
    pub live_base_url: Option<String>,
    pub beta_base_url: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl ConfigFile {
    /// Default location: `<config dir>/patchmirror/config.ini`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("patchmirror").join("config.ini"))
    }

    /// Load the file at the default location, or defaults if there is none.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load the file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&text, path)
    }

    /// Parse INI text. `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let fetch = FetchSection {
            output: get(&ini, "fetch", "output").map(PathBuf::from),
            timeout: parse_value(&ini, "fetch", "timeout")?,
            retries: parse_value(&ini, "fetch", "retries")?,
            retry_delay: parse_value(&ini, "fetch", "retry_delay")?,
            parallel: parse_value(&ini, "fetch", "parallel")?,
            chunk_size: parse_value(&ini, "fetch", "chunk_size")?,
            lenient: parse_value(&ini, "fetch", "lenient")?,
        };

        Ok(Self {
            fetch,
            live_base_url: get(&ini, "live", "base_url").map(str::to_string),
            beta_base_url: get(&ini, "beta", "base_url").map(str::to_string),
            log_file: get(&ini, "logging", "file").map(PathBuf::from),
        })
    }

    /// Base URL override configured for `environment`.
    pub fn base_url(&self, environment: Environment) -> Option<&str> {
        match environment {
            Environment::Beta => self.beta_base_url.as_deref(),
            Environment::Live => self.live_base_url.as_deref(),
        }
    }

    /// Overlay the `[fetch]` values onto `config`.
    pub fn apply(&self, mut config: FetchConfig) -> FetchConfig {
        let f = &self.fetch;
        if let Some(ref output) = f.output {
            config.output_dir = output.clone();
        }
        if let Some(secs) = f.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = f.retries {
            config = config.with_retries(retries);
        }
        if let Some(secs) = f.retry_delay {
            config = config.with_retry_delay(Duration::from_secs(secs));
        }
        if let Some(parallel) = f.parallel {
            config = config.with_parallel(parallel);
        }
        if let Some(chunk_size) = f.chunk_size {
            config = config.with_chunk_size(chunk_size);
        }
        if let Some(lenient) = f.lenient {
            config = config.with_parse_mode(if lenient {
                ParseMode::Lenient
            } else {
                ParseMode::Strict
            });
        }
        config
    }
}

fn get<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.section(Some(section))
        .and_then(|props| props.get(key))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_value<T: FromStr>(ini: &Ini, section: &str, key: &str) -> Result<Option<T>, ConfigError> {
    match get(ini, section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: raw.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("./resources"));
        assert_eq!(config.parallel, 1);
        assert_eq!(config.retries, DEFAULT_RETRIES);
        assert_eq!(config.chunk_size, 16 * 1024 * 1024);
        assert_eq!(config.parse_mode, ParseMode::Strict);
    }

    #[test]
    fn test_builder_pattern() {
        let config = FetchConfig::new("/srv/mirror")
            .with_timeout(Duration::from_secs(60))
            .with_retries(0)
            .with_parallel(0)
            .with_chunk_size(4096)
            .with_parse_mode(ParseMode::Lenient);

        assert_eq!(config.output_dir, PathBuf::from("/srv/mirror"));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.retries, 0);
        assert_eq!(config.parallel, 1);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.parse_mode, ParseMode::Lenient);
    }

    #[test]
    fn test_parse_full_file() {
        let text = "\
[fetch]
output = /data/mirror
timeout = 30
retries = 5
retry_delay = 2
parallel = 4
chunk_size = 65536
lenient = true

[live]
base_url = http://live.local

[logging]
file = /tmp/patchmirror.log
";
        let file = ConfigFile::parse(text, Path::new("config.ini")).unwrap();
        assert_eq!(file.fetch.output, Some(PathBuf::from("/data/mirror")));
        assert_eq!(file.fetch.parallel, Some(4));
        assert_eq!(file.base_url(Environment::Live), Some("http://live.local"));
        assert_eq!(file.base_url(Environment::Beta), None);
        assert_eq!(file.log_file, Some(PathBuf::from("/tmp/patchmirror.log")));

        let config = file.apply(FetchConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("/data/mirror"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retries, 5);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.parallel, 4);
        assert_eq!(config.chunk_size, 65536);
        assert_eq!(config.parse_mode, ParseMode::Lenient);
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        let file = ConfigFile::parse("", Path::new("config.ini")).unwrap();
        assert_eq!(file, ConfigFile::default());
        let config = file.apply(FetchConfig::default());
        assert_eq!(config.retries, DEFAULT_RETRIES);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = ConfigFile::parse("[fetch]\nretries = lots\n", Path::new("config.ini")).unwrap_err();
        match err {
            ConfigError::InvalidValue { section, key, value } => {
                assert_eq!(section, "fetch");
                assert_eq!(key, "retries");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_from_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::load_from(&dir.path().join("nope.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[beta]\nbase_url = http://beta.local\n").unwrap();
        let file = ConfigFile::load_from(&path).unwrap();
        assert_eq!(file.base_url(Environment::Beta), Some("http://beta.local"));
    }
}
