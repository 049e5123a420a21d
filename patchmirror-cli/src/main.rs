//! patchmirror CLI - Command-line interface
//!
//! Mirrors one variation's resource, client-data and silent-data builds from
//! the CDN into a local directory.

mod args;
mod error;
mod progress;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use clap::Parser;
use patchmirror::logging::{init_logging, LoggingConfig};
use patchmirror::{CancelToken, ConfigFile, FetchReport, HttpFetcher, Orchestrator};
use tracing::{info, warn};

use crate::args::Cli;
use crate::error::{CliError, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_OK};
use crate::progress::TransferBar;

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

/// Run one mirror pass and return the process exit status.
fn run(cli: Cli) -> Result<i32, CliError> {
    let file = match cli.config {
        Some(ref path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    // Held until the end of the run so buffered file logs are flushed.
    let _log_guard = init_logging(
        &LoggingConfig::new(cli.verbose).with_file(cli.log_file(&file)),
    )?;

    let environment = cli.environment();
    let config = cli.fetch_config(&file);
    let request = cli.request()?;
    let profile = environment.profile().with_base_url(cli.base_url(&file));

    if request.res.is_none() && request.client.is_none() && request.silence.is_none() {
        warn!("No version given; pass --res, --client or --silence to fetch something");
    }

    info!(
        "patchmirror {} mirroring {} ({}) from {} into {}",
        patchmirror::VERSION,
        request.variation,
        environment,
        profile.base_url,
        config.output_dir.display()
    );

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    let interrupted = AtomicBool::new(false);
    ctrlc::set_handler(move || {
        eprintln!();
        if interrupt(&handler_token, &interrupted) {
            eprintln!("Interrupted again; exiting now");
            std::process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("Interrupted; cleaning up... (press Ctrl-C again to force exit)");
    })
    .map_err(|e| CliError::SignalHandler(e.to_string()))?;

    let mut fetcher = HttpFetcher::new(profile.base_url.clone(), &config, cancel)?;
    let bar = progress::should_show(cli.verbose).then(TransferBar::new);
    if let Some(ref bar) = bar {
        fetcher = fetcher.with_progress(bar.callback());
    }

    let orchestrator = Orchestrator::from_config(profile, &config, fetcher);
    let started = Instant::now();
    let result = orchestrator.run(&request);
    drop(bar);

    match result {
        Ok(report) => {
            print_summary(&report, started);
            if report.malformed_manifests > 0 {
                Ok(EXIT_FAILURE)
            } else {
                Ok(EXIT_OK)
            }
        }
        Err(_) => {
            eprintln!("Interrupted by user");
            Ok(EXIT_INTERRUPTED)
        }
    }
}

/// Cancel the run. Returns `true` if an earlier interrupt already did.
fn interrupt(token: &CancelToken, interrupted: &AtomicBool) -> bool {
    token.cancel();
    interrupted.swap(true, Ordering::SeqCst)
}

fn print_summary(report: &FetchReport, started: Instant) {
    println!();
    println!("Finished in {:.1}s", started.elapsed().as_secs_f64());
    println!(
        "  Downloaded:      {} files ({})",
        report.downloaded,
        indicatif::HumanBytes(report.bytes_downloaded)
    );
    println!("  Already present: {}", report.already_present);
    if report.skipped_by_policy > 0 {
        println!("  Not patched:     {}", report.skipped_by_policy);
    }
    if report.missing_manifests > 0 {
        println!("  Missing manifests:   {}", report.missing_manifests);
    }
    if report.malformed_manifests > 0 {
        println!("  Malformed manifests: {}", report.malformed_manifests);
    }
    if report.malformed_records > 0 {
        println!("  Skipped records:     {}", report.malformed_records);
    }
    if report.rejected_names > 0 {
        println!("  Rejected names:      {}", report.rejected_names);
    }
    if report.has_failures() {
        println!("  Failed:          {}", report.failure_count());
        for path in &report.failed {
            println!("    {}", path);
        }
    }
}
