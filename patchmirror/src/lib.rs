//! patchmirror - Incremental mirror of a game resource CDN
//!
//! Given a release variation and version descriptors for the resource,
//! client-data and silent-data categories, this library downloads the
//! published manifests, walks the parseable ones and mirrors every listed
//! file into a local directory tree that matches the CDN layout. Files
//! already present locally are never requested again.
//!
//! # Example
//!
//! ```no_run
//! use patchmirror::{
//!     CancelToken, Environment, FetchConfig, FetchRequest, HttpFetcher, Orchestrator, Variation,
//!     VersionDescriptor,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = Environment::Live.profile();
//! let config = FetchConfig::new("./resources");
//! let fetcher = HttpFetcher::new(profile.base_url.clone(), &config, CancelToken::new())?;
//! let orchestrator = Orchestrator::from_config(profile, &config, fetcher);
//!
//! let request = FetchRequest::new(Variation::parse("3.2_live")?)
//!     .with_res(VersionDescriptor::parse("12345678_AbCdEf")?);
//! let report = orchestrator.run(&request)?;
//! println!("{} files downloaded", report.downloaded);
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod environment;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod manifest;
pub mod mirror;
pub mod orchestrator;
pub mod policy;
pub mod report;
pub mod router;
pub mod strategy;
pub mod version;

pub use cancel::{CancelToken, Cancelled};
pub use config::{ConfigFile, FetchConfig};
pub use environment::{Environment, EnvironmentProfile, ManifestKind, Platform};
pub use error::{ConfigError, FetchError, ManifestError, MirrorError, MirrorResult};
pub use fetcher::{FetchOutcome, HttpFetcher, ProgressCallback, ResourceFetcher, TransferProgress};
pub use manifest::{ManifestFormat, ManifestReader, ParseMode, ResourceLine};
pub use mirror::MirrorPath;
pub use orchestrator::{FetchRequest, Orchestrator};
pub use report::FetchReport;
pub use router::RouteTable;
pub use strategy::{ParallelStrategy, SequentialStrategy, TransferStrategy};
pub use version::{Variation, VersionDescriptor};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
