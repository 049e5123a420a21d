//! Terminal transfer indicator.

use std::sync::Arc;
use std::time::Duration;

use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use patchmirror::{ProgressCallback, TransferProgress};

/// Whether a live progress bar makes sense for this run.
///
/// Verbose runs print a log line per event, which would fight the bar.
pub fn should_show(verbose: bool) -> bool {
    !verbose && Term::stderr().is_term()
}

/// Single-line bar showing the file currently being transferred.
pub struct TransferBar {
    bar: ProgressBar,
}

impl TransferBar {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {wide_msg} {bytes}/{total_bytes} ({bytes_per_sec})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Callback to hand to the fetcher.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |progress: &TransferProgress<'_>| {
            bar.set_message(progress.path.to_string());
            bar.set_length(progress.total.unwrap_or(progress.downloaded));
            bar.set_position(progress.downloaded);
        })
    }
}

impl Drop for TransferBar {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}
