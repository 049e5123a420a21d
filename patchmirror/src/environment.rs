//! Distribution environments and their fixed catalogs.
//!
//! The beta and live CDNs share one directory scheme but differ in host,
//! supported platforms, manifest names, manifest encoding and routing
//! tables. [`Environment`] selects one of the two built-in
//! [`EnvironmentProfile`]s; everything downstream is parameterized by the
//! profile instead of hard-coding either catalog.
//!
//! A manifest directory is laid out as
//!
//! ```text
//! {base_path}/{variation}/output_{version}/{channel}/{target}
//! ```
//!
//! where `target` is either a platform name or the fixed `General` folder.

use std::fmt;
use std::str::FromStr;

use crate::manifest::ManifestFormat;
use crate::router::RouteTable;

/// Default CDN host for closed-beta variations.
pub const BETA_BASE_URL: &str = "https://autopatchcn.yuanshen.com";

/// Default CDN host for live and retail variations.
pub const LIVE_BASE_URL: &str = "https://autopatchhk.yuanshen.com";

/// Client platforms served by the CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    StandaloneWindows64,
    Ios,
    Ps5,
    Ps4,
}

impl Platform {
    /// Folder name used on the CDN.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "Android",
            Platform::StandaloneWindows64 => "StandaloneWindows64",
            Platform::Ios => "iOS",
            Platform::Ps5 => "PS5",
            Platform::Ps4 => "PS4",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which build output a manifest belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// Game resources (asset bundles, audio, video).
    Resource,
    /// Client design data.
    ClientData,
    /// Silent design-data updates pushed without a client restart.
    Silence,
}

impl ManifestKind {
    /// Short name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestKind::Resource => "res",
            ManifestKind::ClientData => "client",
            ManifestKind::Silence => "silence",
        }
    }
}

/// One well-known manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestDescriptor {
    /// Path relative to the scope directory.
    pub name: &'static str,
    /// Whether the file lists further resources to fetch.
    pub parseable: bool,
    /// Whether walking the file is pointless for a base revision.
    pub skip_on_base: bool,
}

impl ManifestDescriptor {
    const fn plain(name: &'static str) -> Self {
        Self {
            name,
            parseable: false,
            skip_on_base: false,
        }
    }

    const fn parseable(name: &'static str) -> Self {
        Self {
            name,
            parseable: true,
            skip_on_base: false,
        }
    }

    const fn media(name: &'static str) -> Self {
        Self {
            name,
            parseable: true,
            skip_on_base: true,
        }
    }
}

/// Last path segment of a scope directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTarget {
    /// One directory per platform of the environment.
    PerPlatform,
    /// A single fixed folder.
    Fixed(&'static str),
}

/// Catalog of manifests for one [`ManifestKind`].
#[derive(Debug, Clone, Copy)]
pub struct ManifestScope {
    /// Top-level folder on the CDN.
    pub base_path: &'static str,
    /// Folder below `output_{version}`.
    pub channel: &'static str,
    pub target: ScopeTarget,
    pub manifests: &'static [ManifestDescriptor],
}

impl ManifestScope {
    /// Directory (relative to the CDN root) holding this scope's manifests.
    pub fn directory(&self, variation: &str, version: &str, target: &str) -> String {
        format!(
            "{}/{}/output_{}/{}/{}",
            self.base_path, variation, version, self.channel, target
        )
    }
}

/// Everything that distinguishes one distribution environment.
#[derive(Debug, Clone)]
pub struct EnvironmentProfile {
    pub environment: Environment,
    pub base_url: String,
    pub platforms: &'static [Platform],
    pub format: ManifestFormat,
    /// Whether manifests carry `isPatch` and revisions can be incremental.
    pub revision_aware: bool,
    pub routes: RouteTable,
    pub resources: ManifestScope,
    pub client: ManifestScope,
    pub silence: Option<ManifestScope>,
}

impl EnvironmentProfile {
    /// Scope for `kind`, if this environment publishes it.
    pub fn scope(&self, kind: ManifestKind) -> Option<&ManifestScope> {
        match kind {
            ManifestKind::Resource => Some(&self.resources),
            ManifestKind::ClientData => Some(&self.client),
            ManifestKind::Silence => self.silence.as_ref(),
        }
    }

    /// Replace the CDN host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Distribution environment selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Closed-beta CDN.
    Beta,
    /// Live and retail CDN.
    #[default]
    Live,
}

impl Environment {
    /// Name used in config sections and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Beta => "beta",
            Environment::Live => "live",
        }
    }

    /// Built-in profile for this environment.
    pub fn profile(&self) -> EnvironmentProfile {
        match self {
            Environment::Beta => beta_profile(),
            Environment::Live => live_profile(),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beta" => Ok(Environment::Beta),
            "live" => Ok(Environment::Live),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

// ============================================================================
// Built-in catalogs
// ============================================================================

const RES_BASE_PATH: &str = "client_game_res";
const DESIGN_DATA_BASE_PATH: &str = "client_design_data";
const DATA_VERSIONS: &[ManifestDescriptor] =
    &[ManifestDescriptor::parseable("AssetBundles/data_versions")];

const LIVE_PLATFORMS: &[Platform] = &[
    Platform::Android,
    Platform::StandaloneWindows64,
    Platform::Ios,
    Platform::Ps5,
    Platform::Ps4,
];

const LIVE_RES_MANIFESTS: &[ManifestDescriptor] = &[
    ManifestDescriptor::parseable("res_versions_external"),
    ManifestDescriptor::plain("res_versions_medium"),
    ManifestDescriptor::plain("res_versions_streaming"),
    ManifestDescriptor::parseable("release_res_versions_external"),
    ManifestDescriptor::plain("release_res_versions_medium"),
    ManifestDescriptor::plain("release_res_versions_streaming"),
    ManifestDescriptor::plain("base_revision"),
    ManifestDescriptor::plain("script_version"),
    ManifestDescriptor::media("AudioAssets/audio_versions"),
    ManifestDescriptor::media("VideoAssets/video_versions"),
];

const LIVE_ROUTES: RouteTable = RouteTable::new(
    &[
        ("blk", "AssetBundles"),
        ("pck", "AudioAssets"),
        ("cuepoint", "VideoAssets"),
        ("usm", "VideoAssets"),
    ],
    &[("svc_catalog", "AssetBundles")],
);

const BETA_PLATFORMS: &[Platform] = &[Platform::StandaloneWindows64, Platform::Ios];

const BETA_RES_MANIFESTS: &[ManifestDescriptor] = &[
    ManifestDescriptor::plain("AssetBundles/bundle_versions"),
    ManifestDescriptor::plain("AssetBundles/svc_catalog"),
    ManifestDescriptor::plain("AssetBundles/asset_index"),
    ManifestDescriptor::parseable("AssetBundles/zipMeta"),
    ManifestDescriptor::parseable("VideoAssets/video_versions"),
    ManifestDescriptor::parseable("AudioAssets/audio_versions"),
];

const BETA_ROUTES: RouteTable = RouteTable::new(
    &[
        ("zip", "AssetBundles"),
        ("pck", "AudioAssets"),
        ("mp4", "VideoAssets"),
        ("srt", "VideoAssets"),
    ],
    &[],
);

fn live_profile() -> EnvironmentProfile {
    EnvironmentProfile {
        environment: Environment::Live,
        base_url: LIVE_BASE_URL.to_string(),
        platforms: LIVE_PLATFORMS,
        format: ManifestFormat::JsonLines,
        revision_aware: true,
        routes: LIVE_ROUTES,
        resources: ManifestScope {
            base_path: RES_BASE_PATH,
            channel: "client",
            target: ScopeTarget::PerPlatform,
            manifests: LIVE_RES_MANIFESTS,
        },
        client: ManifestScope {
            base_path: DESIGN_DATA_BASE_PATH,
            channel: "client",
            target: ScopeTarget::Fixed("General"),
            manifests: DATA_VERSIONS,
        },
        silence: Some(ManifestScope {
            base_path: DESIGN_DATA_BASE_PATH,
            channel: "client_silence",
            target: ScopeTarget::Fixed("General"),
            manifests: DATA_VERSIONS,
        }),
    }
}

fn beta_profile() -> EnvironmentProfile {
    EnvironmentProfile {
        environment: Environment::Beta,
        base_url: BETA_BASE_URL.to_string(),
        platforms: BETA_PLATFORMS,
        format: ManifestFormat::Token,
        revision_aware: false,
        routes: BETA_ROUTES,
        resources: ManifestScope {
            base_path: RES_BASE_PATH,
            channel: "client",
            target: ScopeTarget::PerPlatform,
            manifests: BETA_RES_MANIFESTS,
        },
        client: ManifestScope {
            base_path: DESIGN_DATA_BASE_PATH,
            channel: "client",
            target: ScopeTarget::PerPlatform,
            manifests: DATA_VERSIONS,
        },
        silence: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_profile_shape() {
        let profile = Environment::Live.profile();
        assert_eq!(profile.base_url, LIVE_BASE_URL);
        assert_eq!(profile.platforms.len(), 5);
        assert_eq!(profile.format, ManifestFormat::JsonLines);
        assert!(profile.revision_aware);
        assert!(profile.silence.is_some());

        let parseable: Vec<_> = profile
            .resources
            .manifests
            .iter()
            .filter(|m| m.parseable)
            .map(|m| m.name)
            .collect();
        assert_eq!(
            parseable,
            vec![
                "res_versions_external",
                "release_res_versions_external",
                "AudioAssets/audio_versions",
                "VideoAssets/video_versions",
            ]
        );
    }

    #[test]
    fn test_only_media_manifests_skip_on_base() {
        let profile = Environment::Live.profile();
        let skippable: Vec<_> = profile
            .resources
            .manifests
            .iter()
            .filter(|m| m.skip_on_base)
            .map(|m| m.name)
            .collect();
        assert_eq!(
            skippable,
            vec!["AudioAssets/audio_versions", "VideoAssets/video_versions"]
        );
        assert!(Environment::Beta
            .profile()
            .resources
            .manifests
            .iter()
            .all(|m| !m.skip_on_base));
    }

    #[test]
    fn test_beta_profile_has_no_silence() {
        let profile = Environment::Beta.profile();
        assert_eq!(profile.base_url, BETA_BASE_URL);
        assert_eq!(
            profile.platforms,
            &[Platform::StandaloneWindows64, Platform::Ios]
        );
        assert!(!profile.revision_aware);
        assert!(profile.scope(ManifestKind::Silence).is_none());
        assert_eq!(profile.routes.category_for("a.zip"), "AssetBundles");
    }

    #[test]
    fn test_scope_directory_layout() {
        let profile = Environment::Live.profile();
        assert_eq!(
            profile.resources.directory("3.2_live", "100_abc", "Android"),
            "client_game_res/3.2_live/output_100_abc/client/Android"
        );
        let silence = profile.scope(ManifestKind::Silence).unwrap();
        assert_eq!(
            silence.directory("3.2_live", "7_x", "General"),
            "client_design_data/3.2_live/output_7_x/client_silence/General"
        );
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("LIVE".parse::<Environment>(), Ok(Environment::Live));
        assert_eq!("beta".parse::<Environment>(), Ok(Environment::Beta));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_with_base_url_override() {
        let profile = Environment::Beta.profile().with_base_url("http://127.0.0.1:9000");
        assert_eq!(profile.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::Ios.as_str(), "iOS");
        assert_eq!(Platform::Ps5.to_string(), "PS5");
    }
}
