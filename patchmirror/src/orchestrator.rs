//! Run driver.
//!
//! [`Orchestrator`] walks the requested categories of one variation against
//! an environment's catalog:
//!
//! ```text
//! for category in res, client, silence (when a version was supplied):
//!   for target in platforms (or the fixed folder):
//!     for manifest in catalog order:
//!       fetch manifest
//!       if parseable and worth walking:
//!         for line in manifest:
//!           policy -> route -> fetch
//! ```
//!
//! Manifest files are always fetched one at a time; resource lines go
//! through the configured [`TransferStrategy`] in batches.

use std::collections::HashSet;
use std::slice;

use tracing::{debug, error, info, warn};

use crate::cancel::Cancelled;
use crate::config::FetchConfig;
use crate::environment::{
    EnvironmentProfile, ManifestDescriptor, ManifestKind, ManifestScope, ScopeTarget,
};
use crate::error::ManifestError;
use crate::fetcher::ResourceFetcher;
use crate::manifest::{ManifestReader, ParseMode};
use crate::mirror::MirrorPath;
use crate::policy;
use crate::report::FetchReport;
use crate::strategy::{strategy_for, SequentialStrategy, TransferStrategy};
use crate::version::{Variation, VersionDescriptor};

/// What to mirror in one run.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub variation: Variation,
    /// Resource build version.
    pub res: Option<VersionDescriptor>,
    /// Client design-data version.
    pub client: Option<VersionDescriptor>,
    /// Silent design-data version.
    pub silence: Option<VersionDescriptor>,
    /// Treat the resource version as a full snapshot.
    pub base: bool,
}

impl FetchRequest {
    /// Request nothing for `variation`; add categories with the builders.
    pub fn new(variation: Variation) -> Self {
        Self {
            variation,
            res: None,
            client: None,
            silence: None,
            base: false,
        }
    }

    pub fn with_res(mut self, version: VersionDescriptor) -> Self {
        self.res = Some(version);
        self
    }

    pub fn with_client(mut self, version: VersionDescriptor) -> Self {
        self.client = Some(version);
        self
    }

    pub fn with_silence(mut self, version: VersionDescriptor) -> Self {
        self.silence = Some(version);
        self
    }

    pub fn with_base(mut self, base: bool) -> Self {
        self.base = base;
        self
    }

    fn version_for(&self, kind: ManifestKind) -> Option<&VersionDescriptor> {
        match kind {
            ManifestKind::Resource => self.res.as_ref(),
            ManifestKind::ClientData => self.client.as_ref(),
            ManifestKind::Silence => self.silence.as_ref(),
        }
    }
}

/// Per-run bookkeeping.
#[derive(Default)]
struct RunState {
    report: FetchReport,
    /// Every path requested so far, successful or not.
    attempted: HashSet<MirrorPath>,
}

/// Drives one environment's catalog through a fetcher.
pub struct Orchestrator<F> {
    profile: EnvironmentProfile,
    fetcher: F,
    strategy: Box<dyn TransferStrategy>,
    parse_mode: ParseMode,
}

impl<F: ResourceFetcher> Orchestrator<F> {
    /// Sequential, strict orchestrator.
    pub fn new(profile: EnvironmentProfile, fetcher: F) -> Self {
        Self {
            profile,
            fetcher,
            strategy: Box::new(SequentialStrategy::new()),
            parse_mode: ParseMode::Strict,
        }
    }

    /// Orchestrator using the concurrency and parse mode from `config`.
    pub fn from_config(profile: EnvironmentProfile, config: &FetchConfig, fetcher: F) -> Self {
        Self::new(profile, fetcher)
            .with_strategy(strategy_for(config.parallel))
            .with_parse_mode(config.parse_mode)
    }

    pub fn with_strategy(mut self, strategy: Box<dyn TransferStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    pub fn profile(&self) -> &EnvironmentProfile {
        &self.profile
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Mirror everything `request` asks for.
    ///
    /// Per-file and per-manifest problems are counted in the report; only
    /// cancellation ends the run early.
    pub fn run(&self, request: &FetchRequest) -> Result<FetchReport, Cancelled> {
        let mut state = RunState::default();

        if request.base && request.res.is_none() {
            warn!("Base revision requested without a res version; the flag has no effect");
        }
        if request.base && !self.profile.revision_aware {
            debug!(
                "The {} environment treats every revision as base",
                self.profile.environment
            );
        }
        let is_base = request.base || !self.profile.revision_aware;

        for kind in [
            ManifestKind::Resource,
            ManifestKind::ClientData,
            ManifestKind::Silence,
        ] {
            let Some(version) = request.version_for(kind) else {
                continue;
            };
            let Some(scope) = self.profile.scope(kind) else {
                warn!(
                    "The {} environment publishes no {} manifests; ignoring version {}",
                    self.profile.environment,
                    kind.as_str(),
                    version
                );
                continue;
            };

            info!(
                "Mirroring {} {} for {}",
                kind.as_str(),
                version,
                request.variation
            );
            for target in self.targets(scope) {
                let directory = scope.directory(request.variation.as_str(), version.as_str(), target);
                let Some(directory) = MirrorPath::new(&directory) else {
                    error!("Refusing unsafe manifest directory {:?}", directory);
                    continue;
                };
                for manifest in scope.manifests {
                    self.process_manifest(&mut state, kind, &directory, manifest, is_base)?;
                }
            }
        }

        Ok(state.report)
    }

    fn targets(&self, scope: &ManifestScope) -> Vec<&'static str> {
        match scope.target {
            ScopeTarget::PerPlatform => self.profile.platforms.iter().map(|p| p.as_str()).collect(),
            ScopeTarget::Fixed(name) => vec![name],
        }
    }

    fn process_manifest(
        &self,
        state: &mut RunState,
        kind: ManifestKind,
        directory: &MirrorPath,
        manifest: &ManifestDescriptor,
        is_base: bool,
    ) -> Result<(), Cancelled> {
        let Some(manifest_path) = directory.join(manifest.name) else {
            error!("Refusing unsafe manifest name {:?}", manifest.name);
            return Ok(());
        };

        if state.attempted.insert(manifest_path.clone()) {
            SequentialStrategy::new().execute(
                slice::from_ref(&manifest_path),
                &self.fetcher,
                &mut state.report,
            )?;
        }

        if !manifest.parseable {
            return Ok(());
        }

        let local = self.fetcher.local_path(&manifest_path);
        let reader = match ManifestReader::open(&local, self.profile.format, self.parse_mode) {
            Ok(reader) => reader,
            Err(e) => {
                error!("{}; skipping", e);
                state.report.missing_manifests += 1;
                return Ok(());
            }
        };

        if !policy::should_walk(manifest, is_base) {
            debug!(
                "Not walking {}; the base revision already covers it",
                manifest_path
            );
            return Ok(());
        }

        info!("Walking manifest {}", manifest_path);
        self.walk(state, kind, directory, &manifest_path, reader, is_base)
    }

    fn walk(
        &self,
        state: &mut RunState,
        kind: ManifestKind,
        directory: &MirrorPath,
        manifest_path: &MirrorPath,
        mut reader: ManifestReader,
        is_base: bool,
    ) -> Result<(), Cancelled> {
        let batch_size = self.strategy.concurrency();
        let mut pending: Vec<MirrorPath> = Vec::with_capacity(batch_size);
        let mut aborted: Option<ManifestError> = None;

        for item in reader.by_ref() {
            let line = match item {
                Ok(line) => line,
                Err(e) => {
                    aborted = Some(e);
                    break;
                }
            };

            if !policy::should_fetch(&line, kind, is_base) {
                state.report.skipped_by_policy += 1;
                continue;
            }

            let category = self.profile.routes.category_for(&line.remote_name);
            let Some(path) = directory
                .join(category)
                .and_then(|p| p.join(&line.remote_name))
            else {
                warn!(
                    "Rejecting unsafe resource name {:?} in {}",
                    line.remote_name, manifest_path
                );
                state.report.rejected_names += 1;
                continue;
            };

            if !state.attempted.insert(path.clone()) {
                debug!("{} already attempted in this run", path);
                continue;
            }

            pending.push(path);
            if pending.len() >= batch_size {
                self.strategy
                    .execute(&pending, &self.fetcher, &mut state.report)?;
                pending.clear();
            }
        }

        state.report.malformed_records += reader.skipped();

        // Lines before a malformed record still get fetched.
        if !pending.is_empty() {
            self.strategy
                .execute(&pending, &self.fetcher, &mut state.report)?;
        }

        if let Some(e) = aborted {
            error!("Abandoning manifest {}: {}", manifest_path, e);
            state.report.malformed_manifests += 1;
        }
        Ok(())
    }
}
