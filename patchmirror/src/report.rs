//! Run summary.
//!
//! [`FetchReport`] accumulates the outcome of every transfer and manifest
//! walk in a run. Per-file failures never stop a run, so the report is the
//! only place they surface.

use crate::mirror::MirrorPath;

/// Counters and failure list for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Files transferred in this run.
    pub downloaded: usize,
    /// Bytes written in this run.
    pub bytes_downloaded: u64,
    /// Files that were already present in the mirror.
    pub already_present: usize,
    /// Manifest records the fetch policy left out.
    pub skipped_by_policy: usize,
    /// Records whose remote name could not be mapped to a safe path.
    pub rejected_names: usize,
    /// Parseable manifests that were not present locally.
    pub missing_manifests: usize,
    /// Manifests whose walk was aborted by an undecodable record.
    pub malformed_manifests: usize,
    /// Records skipped in lenient mode.
    pub malformed_records: usize,
    /// Paths whose transfer failed.
    pub failed: Vec<MirrorPath>,
}

impl FetchReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed transfer.
    pub fn record_download(&mut self, bytes: u64) {
        self.downloaded += 1;
        self.bytes_downloaded += bytes;
    }

    /// Record a cache hit.
    pub fn record_present(&mut self) {
        self.already_present += 1;
    }

    /// Record a failed transfer.
    pub fn record_failure(&mut self, path: MirrorPath) {
        self.failed.push(path);
    }

    /// Check if any transfer failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Get the number of failed transfers.
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}
