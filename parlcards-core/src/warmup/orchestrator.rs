//! Warmup orchestrator
//!
//! Populates the cache for every current politician, then builds the
//! rankings table and one card per politician. Progress is persisted every
//! `progress_batch_size` entities so an interrupted run resumes where it
//! stopped. One politician's failure is recorded and never aborts the run.

use super::progress::WarmupProgress;
use super::state::{WarmupReport, WarmupState, WarmupStatus};
use crate::cache::keys::{cards_root, is_safe_component};
use crate::cache::CacheKey;
use crate::fetchers::Fetchers;
use crate::metrics::{compute_entity_metrics, EntityMetrics};
use crate::models::{Politician, RankingsTable, Vote};
use crate::rankings::percentiles_for;
use crate::services::FetchError;
use anyhow::{Context, Result};
use parlcards_common::time::format_eta;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Per-run options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupOptions {
    pub session: String,
    /// Cap on politicians fetched this run
    pub limit: Option<usize>,
    /// Stop after the per-entity fetch stage
    pub skip_rankings: bool,
    /// Clear the persisted failed set before fetching
    pub retry_failed: bool,
    /// Completed politicians required before rankings are built
    pub min_completed_for_rankings: usize,
}

impl WarmupOptions {
    pub fn for_session(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            limit: None,
            skip_rankings: false,
            retry_failed: false,
            min_completed_for_rankings: 0,
        }
    }
}

#[derive(Debug, Default)]
struct RunCounters {
    total_entities: usize,
    fetched: usize,
    failed: usize,
    rankings_built: bool,
    cards_written: usize,
}

/// Shared data loaded in the first stage
struct SharedData {
    politicians: Vec<Politician>,
    votes: Vec<Vote>,
}

pub struct WarmupOrchestrator {
    fetchers: Fetchers,
    options: WarmupOptions,
    status: watch::Sender<WarmupStatus>,
}

impl WarmupOrchestrator {
    pub fn new(fetchers: Fetchers, options: WarmupOptions) -> Self {
        let (status, _) = watch::channel(WarmupStatus::default());
        Self {
            fetchers,
            options,
            status,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WarmupStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> WarmupStatus {
        *self.status.borrow()
    }

    /// Run every stage, persisting progress on success, cancellation and failure
    pub async fn run(&self, cancel: &CancellationToken) -> Result<WarmupReport> {
        let session = self.options.session.clone();
        if !is_safe_component(&session) {
            self.set_state(WarmupState::Failed { partial: false }, 0, 0);
            anyhow::bail!("Invalid session identifier '{}'", session);
        }
        let mut progress = WarmupProgress::load(self.fetchers.store().root(), &session);
        let mut counters = RunCounters::default();

        info!(
            session = %session,
            completed = progress.completed_slugs.len(),
            failed = progress.failed_slugs.len(),
            "Starting warmup"
        );

        if self.options.retry_failed {
            let cleared = progress.clear_failed();
            info!(cleared, "Retrying previously failed politicians");
        }

        let outcome = match self.run_stages(&mut progress, &mut counters, cancel).await {
            Ok(state) => self.persist(&mut progress).map(|()| state),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(state) => {
                self.set_state(state, 0, 0);
                let report = self.report(state, &progress, &counters);
                info!(
                    state = ?report.state,
                    fetched = report.fetched,
                    failed = report.failed,
                    cards = report.cards_written,
                    requests = report.total_api_requests,
                    "Warmup finished"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(save_err) = self.persist(&mut progress) {
                    error!(error = %save_err, "Could not persist progress after failure");
                }
                let partial =
                    !progress.completed_slugs.is_empty() || !progress.failed_slugs.is_empty();
                self.set_state(WarmupState::Failed { partial }, 0, 0);
                error!(error = %e, "Warmup failed");
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        progress: &mut WarmupProgress,
        counters: &mut RunCounters,
        cancel: &CancellationToken,
    ) -> Result<WarmupState> {
        let Some(shared) = self.fetch_shared_data(cancel).await? else {
            return Ok(WarmupState::Cancelled);
        };
        counters.total_entities = shared.politicians.len();
        progress.rankings_complete = false;

        if !self.fetch_per_entity(&shared.politicians, progress, counters, cancel).await? {
            return Ok(WarmupState::Cancelled);
        }

        if self.options.skip_rankings {
            info!("Skipping rankings and cards");
            return Ok(WarmupState::Complete);
        }
        if progress.completed_slugs.len() < self.options.min_completed_for_rankings {
            info!(
                completed = progress.completed_slugs.len(),
                required = self.options.min_completed_for_rankings,
                "Too few politicians warmed for rankings"
            );
            return Ok(WarmupState::Complete);
        }

        // Cards are always rebuilt from fresh computations
        self.delete_session_cards();

        let Some((table, computed)) = self.build_rankings(&shared, progress, cancel).await? else {
            return Ok(WarmupState::Cancelled);
        };
        counters.rankings_built = true;

        let Some(cards) = self.cache_cards(&table, &computed, cancel) else {
            return Ok(WarmupState::Cancelled);
        };
        counters.cards_written = cards;

        progress.rankings_complete = true;
        Ok(WarmupState::Complete)
    }

    /// Politician list, session votes and every vote detail; None if cancelled
    async fn fetch_shared_data(&self, cancel: &CancellationToken) -> Result<Option<SharedData>> {
        let session = self.options.session.as_str();
        self.set_state(WarmupState::FetchingSharedData, 0, 0);

        let Some(politicians) = cancellable(cancel, self.fetchers.politician_list()).await else {
            return Ok(None);
        };
        let politicians = politicians.context("Failed to fetch politician list")?;
        info!(count = politicians.len(), "Politician list ready");

        let Some(votes) = cancellable(cancel, self.fetchers.session_votes(session)).await else {
            return Ok(None);
        };
        let votes = votes.with_context(|| format!("Failed to fetch votes for {}", session))?;
        info!(count = votes.len(), "Session votes ready");

        let missing: Vec<String> = votes
            .iter()
            .filter_map(Vote::number_key)
            .filter(|n| self.fetchers.vote_detail_missing(session, n))
            .collect();
        if !missing.is_empty() {
            info!(count = missing.len(), "Prefetching vote details");
            let batch = self.fetchers.vote_details_batch(session, &missing);
            let Some(fetched) = cancellable(cancel, batch).await else {
                return Ok(None);
            };
            info!(cached = fetched.len(), total = votes.len(), "Vote details ready");
        }

        Ok(Some(SharedData { politicians, votes }))
    }

    fn delete_session_cards(&self) {
        let store = self.fetchers.store();
        let mut removed = 0usize;
        for slug in store.list_dir(&cards_root()) {
            let key = CacheKey::Card {
                slug,
                session: self.options.session.clone(),
            };
            match store.delete(&key) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(key = %key, error = %e, "Could not delete stale card"),
            }
        }
        if removed > 0 {
            info!(removed, "Deleted stale session cards");
        }
    }

    /// Fetch ballots, speeches and bills for unsettled politicians
    ///
    /// Returns false when cancelled.
    async fn fetch_per_entity(
        &self,
        politicians: &[Politician],
        progress: &mut WarmupProgress,
        counters: &mut RunCounters,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let mut remaining: Vec<&Politician> = politicians
            .iter()
            .filter(|p| !progress.is_settled(&p.slug))
            .collect();
        if let Some(limit) = self.options.limit {
            remaining.truncate(limit);
        }

        info!(
            remaining = remaining.len(),
            already_completed = progress.completed_slugs.len(),
            previously_failed = progress.failed_slugs.len(),
            "Fetching per-politician data"
        );
        self.set_state(WarmupState::FetchingPerEntity, 0, remaining.len());

        let batch_size = self.fetchers.settings().progress_batch_size.max(1);
        let started = Instant::now();

        for (i, politician) in remaining.iter().enumerate() {
            // Dropping the fetch at an await point never interrupts a cache
            // write: writes are synchronous and atomic
            let Some(result) = cancellable(cancel, self.fetch_entity(&politician.slug)).await
            else {
                info!(slug = %politician.slug, "Warmup cancelled");
                return Ok(false);
            };

            match result {
                Ok(()) => {
                    progress.mark_completed(&politician.slug);
                    counters.fetched += 1;
                }
                Err(e) => {
                    warn!(slug = %politician.slug, error = %e, "Politician fetch failed");
                    progress.mark_failed(&politician.slug);
                    counters.failed += 1;
                }
            }

            let done = i + 1;
            self.set_processed(done);
            if done % batch_size == 0 {
                self.persist(progress)?;
                let per_entity = started.elapsed().as_secs_f64() / done as f64;
                let eta = (per_entity * (remaining.len() - done) as f64) as u64;
                info!(
                    processed = done,
                    total = remaining.len(),
                    eta = %format_eta(eta),
                    "Warmup progress"
                );
            }
        }

        self.persist(progress)?;
        info!(
            completed = progress.completed_slugs.len(),
            failed = progress.failed_slugs.len(),
            "Per-politician fetch complete"
        );
        Ok(true)
    }

    async fn fetch_entity(&self, slug: &str) -> std::result::Result<(), FetchError> {
        let session = self.options.session.as_str();
        tokio::try_join!(
            self.fetchers.politician_ballots(slug, session, false),
            self.fetchers.ensure_speech_summary(slug, session),
            self.fetchers.sponsored_bills(slug, session),
        )?;
        Ok(())
    }

    /// Compute metrics for every completed politician and write the table
    ///
    /// Inputs are all cache-warm at this point. None if cancelled.
    async fn build_rankings(
        &self,
        shared: &SharedData,
        progress: &WarmupProgress,
        cancel: &CancellationToken,
    ) -> Result<Option<(RankingsTable, Vec<EntityMetrics>)>> {
        let session = self.options.session.as_str();
        let ranked: Vec<&Politician> = shared
            .politicians
            .iter()
            .filter(|p| progress.completed_slugs.contains(&p.slug))
            .collect();

        info!(count = ranked.len(), "Building rankings table");
        self.set_state(WarmupState::BuildingRankings, 0, ranked.len());

        let mut computed = Vec::with_capacity(ranked.len());
        let mut failed: BTreeSet<String> = progress.failed_slugs.clone();

        for (i, politician) in ranked.iter().enumerate() {
            let metrics =
                compute_entity_metrics(&self.fetchers, politician, session, &shared.votes, true);
            let Some(result) = cancellable(cancel, metrics).await else {
                return Ok(None);
            };
            match result {
                Ok(metrics) => computed.push(metrics),
                Err(e) => {
                    warn!(slug = %politician.slug, error = %e, "Metric computation failed");
                    failed.insert(politician.slug.clone());
                }
            }
            self.set_processed(i + 1);
        }

        let table = RankingsTable {
            session: session.to_string(),
            total_mps: shared.politicians.len(),
            computed_mps: computed.len(),
            failed_slugs: failed.into_iter().collect(),
            metrics: computed.iter().map(|m| m.record.clone()).collect(),
        };

        let key = CacheKey::Rankings {
            session: session.to_string(),
        };
        self.fetchers
            .store()
            .write(&key, &table, self.fetchers.settings().ttl_rankings, "warmup")
            .context("Failed to write rankings table")?;
        info!(computed = table.computed_mps, total = table.total_mps, "Rankings table written");

        Ok(Some((table, computed)))
    }

    /// Write one card per computed politician; None if cancelled
    fn cache_cards(
        &self,
        table: &RankingsTable,
        computed: &[EntityMetrics],
        cancel: &CancellationToken,
    ) -> Option<usize> {
        let session = self.options.session.as_str();
        let store = self.fetchers.store();
        let ttl = self.fetchers.settings().ttl_rankings;
        self.set_state(WarmupState::CachingCards, 0, computed.len());

        let mut written = 0usize;
        for (i, metrics) in computed.iter().enumerate() {
            if cancel.is_cancelled() {
                return None;
            }
            let slug = &metrics.record.slug;
            let card = metrics.card(session, percentiles_for(slug, &table.metrics));
            let key = CacheKey::Card {
                slug: slug.clone(),
                session: session.to_string(),
            };
            match store.write(&key, &card, ttl, "warmup") {
                Ok(()) => written += 1,
                Err(e) => warn!(key = %key, error = %e, "Card write failed"),
            }
            self.set_processed(i + 1);
        }

        info!(written, total = computed.len(), "Cards cached");
        Some(written)
    }

    fn persist(&self, progress: &mut WarmupProgress) -> Result<()> {
        progress.total_api_requests = self.fetchers.client().request_count();
        progress
            .save(self.fetchers.store().root())
            .context("Failed to save warmup progress")
    }

    fn set_state(&self, state: WarmupState, processed: usize, total: usize) {
        self.status.send_replace(WarmupStatus {
            state,
            processed,
            total,
        });
    }

    fn set_processed(&self, processed: usize) {
        self.status.send_modify(|status| status.processed = processed);
    }

    fn report(
        &self,
        state: WarmupState,
        progress: &WarmupProgress,
        counters: &RunCounters,
    ) -> WarmupReport {
        WarmupReport {
            state,
            session: self.options.session.clone(),
            total_entities: counters.total_entities,
            fetched: counters.fetched,
            failed: counters.failed,
            completed_total: progress.completed_slugs.len(),
            failed_total: progress.failed_slugs.len(),
            rankings_built: counters.rankings_built,
            cards_written: counters.cards_written,
            total_api_requests: progress.total_api_requests,
        }
    }
}

/// Run `fut` unless `cancel` fires first
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}
