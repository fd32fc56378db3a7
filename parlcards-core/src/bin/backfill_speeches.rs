//! Speech summary backfill (parlcards-backfill)
//!
//! Writes a `{speech_count}` summary for every cached full speech listing
//! of a session whose summary is missing or expired. Never touches the
//! network.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use parlcards_common::Settings;
use parlcards_core::cache::{CacheStore, RecessCalendar, TtlPolicy};
use parlcards_core::fetchers::backfill_speech_summaries;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "parlcards-backfill")]
#[command(about = "Derive speech-count summaries from cached speech listings")]
#[command(version)]
struct Args {
    /// Session to backfill (defaults to the configured session)
    #[arg(short, long)]
    session: Option<String>,

    /// Settings file
    #[arg(short, long, env = "PARLCARDS_CONFIG")]
    config: Option<PathBuf>,

    /// Cache root (overrides settings)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("parlcards_core=info,parlcards_common=info")
                }),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    let cache_dir = args.cache_dir.unwrap_or_else(|| settings.cache_dir.clone());
    let session = args.session.unwrap_or_else(|| settings.session.clone());

    let store = CacheStore::new(cache_dir.clone());
    let ttl = TtlPolicy::new(RecessCalendar::default(), settings.recess_multiplier)
        .effective(settings.ttl_speeches);

    info!(
        session = %session,
        cache_dir = %cache_dir.display(),
        ttl_seconds = ttl,
        "Backfilling speech summaries"
    );

    let report = backfill_speech_summaries(&store, ttl, &session);

    info!(
        generated = report.generated,
        skipped = report.skipped,
        failed = report.failed,
        "Backfill complete"
    );
    Ok(())
}
