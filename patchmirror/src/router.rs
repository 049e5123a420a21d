//! Routing of resource names to mirror sub-directories.
//!
//! Manifests list bare file names; the CDN stores them in category folders
//! (`AssetBundles`, `AudioAssets`, ...) next to the manifest. The folder is
//! inferred from the file extension first, then from the exact file name.
//! A name that matches neither lives directly in the manifest directory.

/// Extension and name lookup tables for one environment.
#[derive(Debug, Clone, Copy)]
pub struct RouteTable {
    /// `(extension without dot, category)` pairs.
    extensions: &'static [(&'static str, &'static str)],
    /// `(exact file name, category)` pairs.
    names: &'static [(&'static str, &'static str)],
}

impl RouteTable {
    /// Create a table from static extension and name mappings.
    pub const fn new(
        extensions: &'static [(&'static str, &'static str)],
        names: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { extensions, names }
    }

    /// Category folder for `remote_name`, or `""` when nothing matches.
    pub fn category_for(&self, remote_name: &str) -> &'static str {
        if let Some(ext) = extension_of(remote_name) {
            if let Some((_, category)) = self.extensions.iter().find(|(e, _)| *e == ext) {
                return *category;
            }
        }
        self.names
            .iter()
            .find(|(name, _)| *name == remote_name)
            .map(|(_, category)| *category)
            .unwrap_or("")
    }
}

/// Extension of the final path component.
///
/// A leading dot does not start an extension, so `.blk` has none while
/// `foo.blk` has `blk`.
fn extension_of(name: &str) -> Option<&str> {
    let file = name.rsplit('/').next().unwrap_or(name);
    let stem_len = file.len() - file.trim_start_matches('.').len();
    let body = &file[stem_len..];
    body.rfind('.').map(|idx| &body[idx + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TABLE: RouteTable = RouteTable::new(
        &[("zip", "AssetBundles"), ("pck", "AudioAssets"), ("usm", "VideoAssets")],
        &[("svc_catalog", "AssetBundles")],
    );

    #[test]
    fn test_extension_routes_asset_bundle() {
        assert_eq!(TABLE.category_for("foo.zip"), "AssetBundles");
        assert_eq!(TABLE.category_for("1234.pck"), "AudioAssets");
    }

    #[test]
    fn test_name_table_fallback() {
        assert_eq!(TABLE.category_for("svc_catalog"), "AssetBundles");
    }

    #[test]
    fn test_unknown_routes_flat() {
        assert_eq!(TABLE.category_for("readme.txt"), "");
        assert_eq!(TABLE.category_for("asset_index"), "");
    }

    #[test]
    fn test_extension_takes_last_suffix() {
        assert_eq!(TABLE.category_for("bundle.tar.zip"), "AssetBundles");
        assert_eq!(TABLE.category_for("bundle.zip.bak"), "");
    }

    #[test]
    fn test_leading_dot_is_not_an_extension() {
        assert_eq!(extension_of(".zip"), None);
        assert_eq!(extension_of("a.zip"), Some("zip"));
        assert_eq!(extension_of("dir.zip/plain"), None);
        assert_eq!(TABLE.category_for(".zip"), "");
    }

    #[test]
    fn test_extension_match_is_case_sensitive() {
        assert_eq!(TABLE.category_for("FOO.ZIP"), "");
    }

    proptest! {
        #[test]
        fn prop_category_is_from_table_or_empty(name in "[a-zA-Z0-9_.]{0,24}") {
            let category = TABLE.category_for(&name);
            prop_assert!(
                category.is_empty()
                    || category == "AssetBundles"
                    || category == "AudioAssets"
                    || category == "VideoAssets"
            );
        }
    }
}
