//! strm-mirror - Mirror a WebDAV media tree into .strm files
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use strm_mirror::config::{CliArgs, MirrorConfig};
use strm_mirror::progress::{print_header, print_summary, ProgressReporter};
use strm_mirror::remote::WebDavClientBuilder;
use strm_mirror::walker::MirrorCoordinator;
use tracing::error;
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
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = MirrorConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress {
        print_header(
            &config.address,
            &config.remote_root,
            config.worker_count,
            &config.local_root.display().to_string(),
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    runtime.block_on(run_mirror(config))
}

async fn run_mirror(config: MirrorConfig) -> Result<()> {
    let progress = config.show_progress.then(ProgressReporter::new);
    if let Some(p) = &progress {
        p.set_status("Connecting to WebDAV server...");
    }

    // Unreachable endpoint or bad credentials: fail before walking anything
    let client = WebDavClientBuilder::new(config.address.clone())
        .user(config.user.clone())
        .password(config.password.clone())
        .connect_timeout(Duration::from_secs(config.timeout_secs))
        .connect(&config.remote_root)
        .await
        .context("Failed to connect to WebDAV server")?;

    let local_root = config.local_root.display().to_string();
    let show_progress = config.show_progress;
    let coordinator = Arc::new(MirrorCoordinator::new(config, Arc::new(client)));

    let ticker = progress.clone().map(|p| {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(200));
            loop {
                interval.tick().await;
                p.update(&coordinator.progress());
            }
        })
    });

    let report = coordinator.run_report().await;

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    if let Some(p) = &progress {
        if report.is_success() {
            p.finish("Mirror completed");
        } else {
            p.finish("Mirror finished with errors");
        }
    }

    if show_progress {
        print_summary(&report, &local_root);
    }

    report.into_result().context("Mirror failed")?;
    println!("Mirror complete");
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("strm_mirror=debug,warn")
    } else {
        EnvFilter::new("strm_mirror=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
