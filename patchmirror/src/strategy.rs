//! Transfer strategies for batches of resource files.
//!
//! This module implements the Strategy pattern for sequential vs bounded
//! parallel transfer. Paths in a batch are distinct, so workers never race
//! on the same destination and need no locking beyond the report merge.

use std::panic;
use std::thread;

use crate::cancel::Cancelled;
use crate::fetcher::{FetchOutcome, ResourceFetcher};
use crate::mirror::MirrorPath;
use crate::report::FetchReport;

/// Strategy for transferring a batch of files.
pub trait TransferStrategy: Send + Sync {
    /// Fetch every path in `batch`, recording outcomes in `report`.
    ///
    /// Returns `Err(Cancelled)` once the user interrupts; transfers not yet
    /// started are never issued.
    fn execute(
        &self,
        batch: &[MirrorPath],
        fetcher: &dyn ResourceFetcher,
        report: &mut FetchReport,
    ) -> Result<(), Cancelled>;

    /// How many files this strategy moves at once.
    fn concurrency(&self) -> usize;
}

/// Pick a strategy for the configured concurrency.
pub fn strategy_for(parallel: usize) -> Box<dyn TransferStrategy> {
    if parallel <= 1 {
        Box::new(SequentialStrategy::new())
    } else {
        Box::new(ParallelStrategy::new(parallel))
    }
}

/// Sequential transfer strategy.
///
/// One file at a time, in manifest order.
#[derive(Debug, Default)]
pub struct SequentialStrategy;

impl SequentialStrategy {
    /// Create a new sequential strategy.
    pub fn new() -> Self {
        Self
    }
}

impl TransferStrategy for SequentialStrategy {
    fn execute(
        &self,
        batch: &[MirrorPath],
        fetcher: &dyn ResourceFetcher,
        report: &mut FetchReport,
    ) -> Result<(), Cancelled> {
        for path in batch {
            let outcome = fetcher.fetch(path)?;
            record(report, path, outcome);
        }
        Ok(())
    }

    fn concurrency(&self) -> usize {
        1
    }
}

/// Parallel transfer strategy.
///
/// Runs up to `concurrency` transfers on scoped threads, one wave at a time.
#[derive(Debug)]
pub struct ParallelStrategy {
    /// Maximum number of concurrent transfers.
    pub concurrency: usize,
}

impl ParallelStrategy {
    /// Create a new parallel strategy (minimum concurrency 1).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }
}

impl Default for ParallelStrategy {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TransferStrategy for ParallelStrategy {
    fn execute(
        &self,
        batch: &[MirrorPath],
        fetcher: &dyn ResourceFetcher,
        report: &mut FetchReport,
    ) -> Result<(), Cancelled> {
        for wave in batch.chunks(self.concurrency) {
            let results: Vec<(&MirrorPath, Result<FetchOutcome, Cancelled>)> =
                thread::scope(|scope| {
                    let handles: Vec<_> = wave
                        .iter()
                        .map(|path| scope.spawn(move || (path, fetcher.fetch(path))))
                        .collect();

                    handles
                        .into_iter()
                        .map(|handle| match handle.join() {
                            Ok(result) => result,
                            Err(payload) => panic::resume_unwind(payload),
                        })
                        .collect()
                });

            // Record everything that finished before surfacing cancellation.
            let mut cancelled = false;
            for (path, result) in results {
                match result {
                    Ok(outcome) => record(report, path, outcome),
                    Err(Cancelled) => cancelled = true,
                }
            }
            if cancelled {
                return Err(Cancelled);
            }
        }
        Ok(())
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }
}

fn record(report: &mut FetchReport, path: &MirrorPath, outcome: FetchOutcome) {
    match outcome {
        FetchOutcome::AlreadyPresent => report.record_present(),
        FetchOutcome::Downloaded { bytes } => report.record_download(bytes),
        FetchOutcome::Failed(_) => report.record_failure(path.clone()),
    }
}
