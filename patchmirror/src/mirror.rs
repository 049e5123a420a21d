//! Remote-relative paths and their local mirror locations.
//!
//! Every file the fetcher touches is addressed by a [`MirrorPath`]: a
//! `/`-separated path relative to both the CDN base URL and the local output
//! root. Construction rejects anything that could escape the output root, so
//! a hostile manifest cannot write outside the mirror.

use std::fmt;
use std::path::{Path, PathBuf};

/// A validated `/`-separated path relative to the distribution root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MirrorPath(String);

impl MirrorPath {
    /// Build a path from `/`-separated text.
    ///
    /// Returns `None` for empty input, absolute paths, `.`/`..` segments,
    /// empty segments and backslashes.
    pub fn new(path: &str) -> Option<Self> {
        if is_safe_relative(path) {
            Some(Self(path.to_string()))
        } else {
            None
        }
    }

    /// Append a `/`-separated relative path.
    ///
    /// An empty `tail` returns `self` unchanged, which is how a flat routing
    /// category is expressed.
    pub fn join(&self, tail: &str) -> Option<Self> {
        if tail.is_empty() {
            return Some(self.clone());
        }
        if !is_safe_relative(tail) {
            return None;
        }
        Some(Self(format!("{}/{}", self.0, tail)))
    }

    /// The path text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Remote URL for this path under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Local file location for this path under `root`.
    pub fn local_path(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
    }
}

impl fmt::Display for MirrorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check that `path` is a non-empty relative path of ordinary segments.
pub fn is_safe_relative(path: &str) -> bool {
    !path.is_empty() && !path.contains('\\') && path.split('/').all(is_safe_segment)
}

/// Check that `segment` is a single ordinary path component.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
        && !segment.contains('\\')
        && !segment.contains(':')
}
