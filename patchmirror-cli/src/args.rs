//! Command-line arguments and their merge with the config file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use patchmirror::{
    ConfigFile, Environment, FetchConfig, FetchRequest, MirrorResult, ParseMode, Variation,
    VersionDescriptor,
};

/// Distribution environment selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum EnvArg {
    /// Live and retail CDN (JSON manifests, five platforms)
    Live,
    /// Closed-beta CDN (token manifests, Windows and iOS)
    Beta,
}

impl From<EnvArg> for Environment {
    fn from(arg: EnvArg) -> Self {
        match arg {
            EnvArg::Live => Environment::Live,
            EnvArg::Beta => Environment::Beta,
        }
    }
}

/// Mirror game hot-patch resources from a CDN.
///
/// Files already present under the output directory are never downloaded
/// again, so an interrupted run can simply be restarted.
#[derive(Debug, Parser)]
#[command(name = "patchmirror", version)]
pub struct Cli {
    /// Release variation, e.g. 3.2_live
    pub variation: String,

    /// Distribution environment
    #[arg(long = "env", value_enum, default_value_t = EnvArg::Live)]
    pub env: EnvArg,

    /// Resource version descriptor ({version}_{suffix})
    #[arg(short = 'r', long = "res")]
    pub res: Option<String>,

    /// Client design-data version descriptor
    #[arg(short = 'c', long = "client")]
    pub client: Option<String>,

    /// Silent design-data version descriptor (live only)
    #[arg(short = 's', long = "silence")]
    pub silence: Option<String>,

    /// Treat the resource version as a base revision and fetch every file
    #[arg(short = 'b', long = "base")]
    pub base: bool,

    /// Output directory [default: ./resources]
    #[arg(short = 'o', long = "out", visible_alias = "output")]
    pub output: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Maximum concurrent transfers [default: 1]
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Extra attempts for transient failures [default: 2]
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-request timeout in seconds [default: 300]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Override the CDN base URL
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Skip undecodable manifest records instead of abandoning the manifest
    #[arg(long)]
    pub lenient: bool,

    /// Config file [default: <config dir>/patchmirror/config.ini]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn environment(&self) -> Environment {
        self.env.into()
    }

    /// Resolve fetch settings: flags > config file > defaults.
    pub fn fetch_config(&self, file: &ConfigFile) -> FetchConfig {
        let mut config = file.apply(FetchConfig::default());

        if let Some(ref output) = self.output {
            config.output_dir = output.clone();
        }
        if let Some(parallel) = self.parallel {
            config = config.with_parallel(parallel);
        }
        if let Some(retries) = self.retries {
            config = config.with_retries(retries);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if self.lenient {
            config = config.with_parse_mode(ParseMode::Lenient);
        }
        config
    }

    /// CDN host: flag > config file > built-in.
    pub fn base_url(&self, file: &ConfigFile) -> String {
        self.base_url
            .clone()
            .or_else(|| file.base_url(self.environment()).map(str::to_string))
            .unwrap_or_else(|| self.environment().profile().base_url)
    }

    /// Log file: flag > config file.
    pub fn log_file(&self, file: &ConfigFile) -> Option<PathBuf> {
        self.log_file.clone().or_else(|| file.log_file.clone())
    }

    /// Validate identifiers and build the run request.
    pub fn request(&self) -> MirrorResult<FetchRequest> {
        let mut request = FetchRequest::new(Variation::parse(&self.variation)?).with_base(self.base);
        if let Some(ref res) = self.res {
            request = request.with_res(VersionDescriptor::parse(res)?);
        }
        if let Some(ref client) = self.client {
            request = request.with_client(VersionDescriptor::parse(client)?);
        }
        if let Some(ref silence) = self.silence {
            request = request.with_silence(VersionDescriptor::parse(silence)?);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["patchmirror"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["3.2_live"]);
        assert_eq!(cli.env, EnvArg::Live);
        assert!(!cli.base);

        let config = cli.fetch_config(&ConfigFile::default());
        assert_eq!(config.output_dir, PathBuf::from("./resources"));
        assert_eq!(config.parallel, 1);
        assert_eq!(config.parse_mode, ParseMode::Strict);
        assert_eq!(
            cli.base_url(&ConfigFile::default()),
            "https://autopatchhk.yuanshen.com"
        );
    }

    #[test]
    fn test_short_flags() {
        let cli = parse(&["--env", "beta", "v1", "-r", "100", "-c", "200", "-b", "-o", "/tmp/m", "-v"]);
        assert_eq!(cli.environment(), Environment::Beta);
        assert_eq!(cli.res.as_deref(), Some("100"));
        assert_eq!(cli.client.as_deref(), Some("200"));
        assert!(cli.base);
        assert!(cli.verbose);
        assert_eq!(cli.output, Some(PathBuf::from("/tmp/m")));
    }

    #[test]
    fn test_out_flag_and_output_alias() {
        assert_eq!(parse(&["v", "--out", "/srv/a"]).output, Some(PathBuf::from("/srv/a")));
        assert_eq!(parse(&["v", "--output", "/srv/b"]).output, Some(PathBuf::from("/srv/b")));
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = ConfigFile::parse(
            "[fetch]\noutput = /from/file\nretries = 7\nparallel = 3\n[live]\nbase_url = http://file.local\n",
            Path::new("config.ini"),
        )
        .unwrap();

        let cli = parse(&["v", "--retries", "1", "--base-url", "http://flag.local", "--lenient"]);
        let config = cli.fetch_config(&file);

        assert_eq!(config.output_dir, PathBuf::from("/from/file"));
        assert_eq!(config.retries, 1);
        assert_eq!(config.parallel, 3);
        assert_eq!(config.parse_mode, ParseMode::Lenient);
        assert_eq!(cli.base_url(&file), "http://flag.local");
    }

    #[test]
    fn test_config_base_url_is_per_environment() {
        let file = ConfigFile::parse("[beta]\nbase_url = http://beta.local\n", Path::new("c.ini")).unwrap();
        assert_eq!(parse(&["--env", "beta", "v"]).base_url(&file), "http://beta.local");
        assert_eq!(
            parse(&["v"]).base_url(&file),
            "https://autopatchhk.yuanshen.com"
        );
    }

    #[test]
    fn test_request_validation() {
        let request = parse(&["v", "-r", "5_a", "-s", "7_c"]).request().unwrap();
        assert_eq!(request.res.unwrap().as_str(), "5_a");
        assert!(request.client.is_none());
        assert_eq!(request.silence.unwrap().as_str(), "7_c");

        assert!(parse(&["../v"]).request().is_err());
        assert!(parse(&["v", "-c", "a/b"]).request().is_err());
    }

    #[test]
    fn test_unknown_environment_rejected() {
        assert!(Cli::try_parse_from(["patchmirror", "--env", "staging", "v"]).is_err());
    }
}
