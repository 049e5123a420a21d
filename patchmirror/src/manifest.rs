//! Manifest parsing.
//!
//! A manifest is a line-oriented index of resource files. Two encodings are
//! in use:
//!
//! - **Token**: the first whitespace-delimited field of each line is the
//!   remote file name; the remaining fields are ignored.
//! - **JSON lines**: each line is an independent JSON object with a required
//!   `remoteName` and an optional `isPatch` flag.
//!
//! [`ManifestReader`] yields one [`ResourceLine`] per record. It is lazy and
//! forward-only; re-reading a manifest means opening it again.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ManifestError;

/// Textual encoding of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// Whitespace-delimited records, file name first.
    Token,
    /// One JSON object per line.
    JsonLines,
}

/// How the reader treats records it cannot decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Yield the error; callers abandon the manifest.
    #[default]
    Strict,
    /// Log the record and move on to the next line.
    Lenient,
}

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLine {
    /// File name as published on the CDN.
    pub remote_name: String,
    /// Whether the record is marked as changed in this revision.
    ///
    /// Always `false` for token manifests, which carry no such flag.
    pub is_patch: bool,
}

#[derive(Debug, Deserialize)]
struct JsonRecord {
    #[serde(rename = "remoteName")]
    remote_name: String,
    #[serde(rename = "isPatch", default)]
    is_patch: bool,
}

/// Lazy reader over the records of one manifest file.
#[derive(Debug)]
pub struct ManifestReader<R = BufReader<File>> {
    path: PathBuf,
    format: ManifestFormat,
    mode: ParseMode,
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    skipped: usize,
}

impl ManifestReader {
    /// Open the manifest at `path`.
    ///
    /// A missing file is reported as [`ManifestError::Missing`] so callers
    /// can distinguish "never downloaded" from I/O failures.
    pub fn open(path: &Path, format: ManifestFormat, mode: ParseMode) -> Result<Self, ManifestError> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ManifestError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                ManifestError::Read {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Ok(Self::from_reader(path, BufReader::new(file), format, mode))
    }
}

impl<R: BufRead> ManifestReader<R> {
    /// Read records from an arbitrary buffered source.
    ///
    /// `path` is only used in error messages.
    pub fn from_reader(path: &Path, reader: R, format: ManifestFormat, mode: ParseMode) -> Self {
        Self {
            path: path.to_path_buf(),
            format,
            mode,
            reader,
            buf: Vec::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Number of malformed records skipped in lenient mode.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode(&self, raw: &[u8]) -> Result<Option<ResourceLine>, ManifestError> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| ManifestError::Malformed {
                path: self.path.clone(),
                line: self.line_no,
                reason: format!("invalid UTF-8: {}", e),
            })?
            .trim();
        if line.is_empty() {
            return Ok(None);
        }

        match self.format {
            ManifestFormat::Token => Ok(line.split_whitespace().next().map(|name| ResourceLine {
                remote_name: name.to_string(),
                is_patch: false,
            })),
            ManifestFormat::JsonLines => {
                let record: JsonRecord =
                    serde_json::from_str(line).map_err(|e| ManifestError::Malformed {
                        path: self.path.clone(),
                        line: self.line_no,
                        reason: e.to_string(),
                    })?;
                Ok(Some(ResourceLine {
                    remote_name: record.remote_name,
                    is_patch: record.is_patch,
                }))
            }
        }
    }
}

impl<R: BufRead> Iterator for ManifestReader<R> {
    type Item = Result<ResourceLine, ManifestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    return Some(Err(ManifestError::Read {
                        path: self.path.clone(),
                        source: e,
                    }))
                }
            }
            self.line_no += 1;

            match self.decode(&self.buf) {
                Ok(Some(resource)) => return Some(Ok(resource)),
                Ok(None) => continue,
                Err(e) if self.mode == ParseMode::Lenient => {
                    tracing::warn!("Skipping record: {}", e);
                    self.skipped += 1;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(text: &str, format: ManifestFormat, mode: ParseMode) -> Vec<Result<ResourceLine, ManifestError>> {
        ManifestReader::from_reader(Path::new("manifest"), Cursor::new(text.to_string()), format, mode)
            .collect()
    }

    fn names(results: Vec<Result<ResourceLine, ManifestError>>) -> Vec<String> {
        results
            .into_iter()
            .map(|r| r.unwrap().remote_name)
            .collect()
    }

    #[test]
    fn test_token_format_takes_first_field() {
        let lines = read("a.zip 123\nb.pck 456 extra\n", ManifestFormat::Token, ParseMode::Strict);
        assert_eq!(names(lines), vec!["a.zip", "b.pck"]);
    }

    #[test]
    fn test_token_format_skips_blank_lines() {
        let lines = read("\n  \na.zip\n\n", ManifestFormat::Token, ParseMode::Strict);
        assert_eq!(names(lines), vec!["a.zip"]);
    }

    #[test]
    fn test_token_lines_are_never_patches() {
        let lines = read("a.zip true\n", ManifestFormat::Token, ParseMode::Strict);
        assert!(!lines[0].as_ref().unwrap().is_patch);
    }

    #[test]
    fn test_json_format_reads_patch_flag() {
        let text = concat!(
            r#"{"remoteName":"a.blk","isPatch":true,"md5":"x"}"#,
            "\n",
            r#"{"remoteName":"b.blk","isPatch":false}"#,
            "\n",
            r#"{"remoteName":"c.blk"}"#,
            "\n",
        );
        let lines: Vec<_> = read(text, ManifestFormat::JsonLines, ParseMode::Strict)
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].is_patch);
        assert!(!lines[1].is_patch);
        assert!(!lines[2].is_patch);
        assert_eq!(lines[2].remote_name, "c.blk");
    }

    #[test]
    fn test_json_malformed_line_is_error_in_strict_mode() {
        let text = concat!(r#"{"remoteName":"a.blk"}"#, "\n", "{not json\n", r#"{"remoteName":"b.blk"}"#, "\n");
        let results = read(text, ManifestFormat::JsonLines, ParseMode::Strict);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(ManifestError::Malformed { line, .. }) => assert_eq!(*line, 2),
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_missing_remote_name_is_malformed() {
        let results = read(r#"{"isPatch":true}"#, ManifestFormat::JsonLines, ParseMode::Strict);
        assert!(results[0].as_ref().unwrap_err().is_malformed());
    }

    #[test]
    fn test_json_non_bool_patch_flag_is_malformed() {
        let results = read(
            r#"{"remoteName":"a.blk","isPatch":"yes"}"#,
            ManifestFormat::JsonLines,
            ParseMode::Strict,
        );
        assert!(results[0].as_ref().unwrap_err().is_malformed());
    }

    #[test]
    fn test_lenient_mode_skips_malformed_lines() {
        let text = concat!("garbage\n", r#"{"remoteName":"b.blk","isPatch":true}"#, "\n");
        let mut reader = ManifestReader::from_reader(
            Path::new("manifest"),
            Cursor::new(text.to_string()),
            ManifestFormat::JsonLines,
            ParseMode::Lenient,
        );
        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.remote_name, "b.blk");
        assert!(reader.next().is_none());
        assert_eq!(reader.skipped(), 1);
    }

    #[test]
    fn test_lenient_mode_skips_invalid_utf8_line() {
        let bytes = b"a.blk 1\n\xff\xfe\nc.blk 3\n".to_vec();
        let mut reader = ManifestReader::from_reader(
            Path::new("manifest"),
            Cursor::new(bytes),
            ManifestFormat::Token,
            ParseMode::Lenient,
        );
        let names: Vec<_> = reader.by_ref().map(|r| r.unwrap().remote_name).collect();
        assert_eq!(names, vec!["a.blk", "c.blk"]);
        assert_eq!(reader.skipped(), 1);
    }

    #[test]
    fn test_invalid_utf8_line_is_malformed_in_strict_mode() {
        let bytes = b"{\"remoteName\":\"a.blk\"}\r\n\xff\n".to_vec();
        let results: Vec<_> = ManifestReader::from_reader(
            Path::new("manifest"),
            Cursor::new(bytes),
            ManifestFormat::JsonLines,
            ParseMode::Strict,
        )
        .collect();
        assert_eq!(results[0].as_ref().unwrap().remote_name, "a.blk");
        match &results[1] {
            Err(ManifestError::Malformed { line, .. }) => assert_eq!(*line, 2),
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ManifestReader::open(
            &dir.path().join("absent"),
            ManifestFormat::Token,
            ParseMode::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Missing { .. }));
    }

    #[test]
    fn test_open_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zipMeta");
        std::fs::write(&path, "a.zip 1\nb.zip 2\n").unwrap();
        let reader = ManifestReader::open(&path, ManifestFormat::Token, ParseMode::Strict).unwrap();
        let names: Vec<_> = reader.map(|r| r.unwrap().remote_name).collect();
        assert_eq!(names, vec!["a.zip", "b.zip"]);
    }
}
