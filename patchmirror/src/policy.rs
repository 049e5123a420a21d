//! Fetch decisions for manifest records.
//!
//! A base revision is a full snapshot: every listed file belongs in the
//! mirror. An incremental revision only needs the files the server marked
//! with `isPatch`. Design-data manifests (client and silence) are small and
//! always mirrored in full.

use crate::environment::{ManifestDescriptor, ManifestKind};
use crate::manifest::ResourceLine;

/// Whether a manifest is worth walking at all.
///
/// Manifests flagged `skip_on_base` are fully covered by the unconditional
/// top-level fetch when the revision is base.
pub fn should_walk(manifest: &ManifestDescriptor, is_base_revision: bool) -> bool {
    manifest.parseable && !(is_base_revision && manifest.skip_on_base)
}

/// Whether the file named by `line` should be fetched.
pub fn should_fetch(line: &ResourceLine, kind: ManifestKind, is_base_revision: bool) -> bool {
    match kind {
        ManifestKind::ClientData | ManifestKind::Silence => true,
        ManifestKind::Resource => is_base_revision || line.is_patch,
    }
}
