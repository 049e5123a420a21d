//! Caller-supplied identifiers that end up in CDN paths.
//!
//! Variations and version descriptors are opaque, but both become a single
//! directory name on the CDN and in the mirror, so they are checked once at
//! the boundary.

use std::fmt;
use std::str::FromStr;

use crate::error::{MirrorError, MirrorResult};
use crate::mirror::is_safe_segment;

fn validate(kind: &str, value: &str) -> MirrorResult<String> {
    let trimmed = value.trim();
    if is_safe_segment(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(MirrorError::InvalidArgument(format!(
            "{} must be a single path segment, got {:?}",
            kind, value
        )))
    }
}

/// Release channel name, e.g. `3.2_live`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variation(String);

impl Variation {
    pub fn parse(value: &str) -> MirrorResult<Self> {
        validate("variation", value).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Variation {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Build identifier for one category, usually `{version}_{suffix}`.
///
/// The underscore form is not enforced: beta builds publish bare numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionDescriptor(String);

impl VersionDescriptor {
    pub fn parse(value: &str) -> MirrorResult<Self> {
        validate("version descriptor", value).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VersionDescriptor {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_accepts_suffixed_and_bare() {
        let suffixed = VersionDescriptor::parse("12345678_AbCdEf").unwrap();
        assert_eq!(suffixed.as_str(), "12345678_AbCdEf");

        let bare: VersionDescriptor = "2041".parse().unwrap();
        assert_eq!(bare.as_str(), "2041");
    }

    #[test]
    fn test_descriptor_trims_whitespace() {
        assert_eq!(VersionDescriptor::parse(" 9_x \n").unwrap().as_str(), "9_x");
    }

    #[test]
    fn test_descriptor_rejects_path_tricks() {
        for bad in ["", "  ", "..", ".", "a/b", "a\\b", "c:x"] {
            let err = VersionDescriptor::parse(bad).unwrap_err();
            assert!(matches!(err, MirrorError::InvalidArgument(_)), "{:?}", bad);
        }
    }

    #[test]
    fn test_variation_validation() {
        assert_eq!(Variation::parse("3.2_live").unwrap().to_string(), "3.2_live");
        assert!(Variation::parse("../etc").is_err());
        assert!("".parse::<Variation>().is_err());
    }
}
