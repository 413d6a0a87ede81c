//! dirshred - Concurrent Secure-Overwrite Directory Wiper
//!
//! Entry point for the CLI application.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dirshred::config::{CliArgs, WipeConfig};
use dirshred::progress::{print_header, print_summary, ProgressReporter};
use dirshred::report::{write_report, EraseReport, RunStatus};
use dirshred::walker::WipeCoordinator;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose, args.silent)?;

    // Validate and create config
    let config = WipeConfig::from_args(args).context("Invalid configuration")?;

    if !config.silent {
        print_header(
            &config.target_description(),
            config.method,
            config.effective_passes(),
            config.worker_count,
        );
    }

    // The report exists before any file is touched
    let report = EraseReport::for_config(&config);
    let report_path = config
        .report_path
        .clone()
        .unwrap_or_else(|| config.default_report_name(&report.run_id()));
    let report_format = config.report_format;
    let silent = config.silent;

    let coordinator = WipeCoordinator::new(config).context("Failed to initialize wiper")?;

    // Setup signal handler for graceful shutdown
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        if !silent {
            eprintln!("\nInterrupt received, finishing files in progress...");
        }
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let outcome = if silent {
        coordinator.run(&report)
    } else {
        let progress = ProgressReporter::new();
        progress.set_status("Scanning targets...");
        let outcome = coordinator.run_with_progress(&report, |p| progress.update(&p));
        match &outcome {
            Ok(result) if !result.completed => progress.finish("Wipe interrupted"),
            Ok(_) => progress.finish("Wipe completed"),
            Err(_) => progress.finish("Wipe stopped"),
        }
        outcome
    };

    // Every worker has been joined by now, so the report can be sealed.
    // A run-level failure marks the report FAILED even with no file errors.
    let completed = report.complete(RunStatus::from_run(&outcome));
    let written = write_report(&completed, &report_path, report_format);
    match &written {
        Ok(()) => info!(path = %report_path.display(), "Report written"),
        Err(e) => error!(path = %report_path.display(), error = %e, "Failed to write report"),
    }

    if !silent {
        print_summary(
            &completed,
            outcome.as_ref().ok(),
            written.is_ok().then_some(report_path.as_path()),
        );
    }

    let result = outcome.context("Wipe failed")?;
    written.context("Failed to write report")?;

    if !result.completed {
        warn!("Wipe was interrupted before completion");
        bail!("Wipe interrupted, {} files not wiped", completed.error_count);
    }

    if completed.error_count > 0 {
        bail!(
            "{} of {} files could not be wiped",
            completed.error_count,
            completed.outcomes.len()
        );
    }

    Ok(())
}

fn setup_logging(verbose: bool, silent: bool) -> Result<()> {
    let filter = if silent {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("dirshred=debug,warn")
    } else {
        EnvFilter::new("dirshred=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
