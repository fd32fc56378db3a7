//! Cache warmup (parlcards-warmup) - Main entry point
//!
//! Fetches every current politician's raw data for one session, then builds
//! the rankings table and per-politician cards. Ctrl+C persists progress and
//! exits; the next invocation resumes from the progress file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parlcards_common::Settings;
use parlcards_core::warmup::{WarmupReport, WarmupState};
use parlcards_core::{Fetchers, RateLimitedClient, WarmupHandle, WarmupOptions, WarmupOrchestrator};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for parlcards-warmup
#[derive(Parser, Debug)]
#[command(name = "parlcards-warmup")]
#[command(about = "Populate the parlcards cache and precompute cards")]
#[command(version)]
struct Args {
    /// Session to warm (defaults to the configured session)
    #[arg(short, long)]
    session: Option<String>,

    /// Fetch at most this many politicians this run
    #[arg(short, long)]
    limit: Option<usize>,

    /// Stop after the per-politician fetch stage
    #[arg(long)]
    skip_rankings: bool,

    /// Retry politicians that failed in earlier runs
    #[arg(long)]
    retry_failed: bool,

    /// Completed politicians required before rankings are built
    #[arg(long, default_value = "11")]
    min_ranked: usize,

    /// Settings file
    #[arg(short, long, env = "PARLCARDS_CONFIG")]
    config: Option<PathBuf>,

    /// Cache root (overrides settings)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("parlcards_core=info,parlcards_common=info")
                }),
        )
        .init();

    let args = Args::parse();

    let mut settings =
        Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(dir) = args.cache_dir {
        settings.cache_dir = dir;
    }
    let settings = Arc::new(settings);

    let session = args.session.unwrap_or_else(|| settings.session.clone());
    info!(
        session = %session,
        cache_dir = %settings.cache_dir.display(),
        rate_limit = settings.rate_limit_per_minute,
        "Starting parlcards warmup"
    );

    let client = Arc::new(
        RateLimitedClient::from_settings(&settings).context("Failed to build API client")?,
    );
    let fetchers = Fetchers::from_settings(client, Arc::clone(&settings));

    let options = WarmupOptions {
        limit: args.limit,
        skip_rankings: args.skip_rankings,
        retry_failed: args.retry_failed,
        min_completed_for_rankings: args.min_ranked,
        ..WarmupOptions::for_session(session)
    };
    let handle = WarmupHandle::spawn(WarmupOrchestrator::new(fetchers, options));

    let mut status = handle.subscribe();
    let finished = async {
        // A closed channel means the task is gone; join reports why
        let _ = status.wait_for(|s| s.state.is_terminal()).await;
    };

    let report = tokio::select! {
        _ = finished => handle.join().await?,
        _ = shutdown_signal() => handle.shutdown().await?,
    };

    log_report(&report);
    match report.state {
        WarmupState::Failed { .. } => anyhow::bail!("Warmup failed"),
        _ => Ok(()),
    }
}

fn log_report(report: &WarmupReport) {
    info!(
        state = ?report.state,
        session = %report.session,
        fetched = report.fetched,
        failed = report.failed,
        completed_total = report.completed_total,
        failed_total = report.failed_total,
        "Warmup summary"
    );
    if report.rankings_built {
        info!(cards = report.cards_written, "Rankings and cards written");
    }
    if report.state == WarmupState::Cancelled {
        info!("Interrupted; rerun to resume");
    }
    if report.failed_total > 0 {
        warn!(
            failed_total = report.failed_total,
            "Some politicians failed; rerun with --retry-failed"
        );
    }
    info!(requests = report.total_api_requests, "Total API requests");
}

/// Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping warmup");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping warmup");
        },
    }
}
