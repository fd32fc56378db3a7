//! Read-only accessors for the presentation layer
//!
//! Precomputed cards and the rankings table are read straight from the
//! cache; when no card exists the metrics are computed on demand through the
//! same fetchers the warmup uses.

use crate::cache::CacheKey;
use crate::fetchers::Fetchers;
use crate::metrics::{compute_entity_metrics, EntityMetrics};
use crate::models::{
    CardMetrics, CardSummary, Distributions, Percentiles, Politician, RankingsTable,
};
use crate::rankings::{
    distributions_for, filter_by_group, percentiles_for, Group, DEFAULT_BUCKET_COUNT,
};
use crate::services::FetchError;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to the serving layer
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServeError {
    /// HTTP status equivalent
    pub fn status_code(&self) -> u16 {
        match self {
            ServeError::NotFound(_) => 404,
            ServeError::Internal(_) => 500,
        }
    }
}

impl From<FetchError> for ServeError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(what) => ServeError::NotFound(what),
            other => ServeError::Internal(other.to_string()),
        }
    }
}

/// Everything needed to render one card
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub politician: Politician,
    pub session: String,
    pub group: Group,
    pub metrics: CardMetrics,
    pub percentiles: Option<Percentiles>,
    pub distributions: Option<Distributions>,
    pub rankings_available: bool,
    /// True when served from a warmup-built card
    pub precomputed: bool,
}

#[derive(Clone)]
pub struct CardService {
    fetchers: Fetchers,
}

impl CardService {
    pub fn new(fetchers: Fetchers) -> Self {
        Self { fetchers }
    }

    pub fn load_rankings(&self, session: &str) -> Option<RankingsTable> {
        self.fetchers.store().read(&CacheKey::Rankings {
            session: session.to_string(),
        })
    }

    pub fn load_card(&self, slug: &str, session: &str) -> Option<CardSummary> {
        self.fetchers.store().read(&CacheKey::Card {
            slug: slug.to_string(),
            session: session.to_string(),
        })
    }

    /// Card computed from (possibly network-fetched) raw data
    ///
    /// Percentiles are ranked against the rankings table with the subject
    /// added if missing, or neutral when no table exists yet.
    pub async fn compute_on_demand(
        &self,
        slug: &str,
        session: &str,
    ) -> Result<CardSummary, ServeError> {
        let politician = self.fetchers.politician_detail(slug).await?;
        let metrics = self.compute_metrics(&politician, session).await?;

        let percentiles = match self.load_rankings(session) {
            Some(mut table) => {
                table.ensure_member(metrics.record.clone());
                percentiles_for(slug, &table.metrics)
            }
            None => Percentiles::neutral(),
        };
        Ok(metrics.card(session, percentiles))
    }

    /// Card view ranked against `group`
    pub async fn card_view(
        &self,
        slug: &str,
        session: &str,
        group: Group,
    ) -> Result<CardView, ServeError> {
        let politician = self.fetchers.politician_detail(slug).await?;
        let government = self.fetchers.settings().government_party.clone();
        let table = self.load_rankings(session);

        if let (Some(card), Some(table)) = (self.load_card(slug, session), table.as_ref()) {
            let population =
                filter_by_group(slug, &table.metrics, group, &politician.party, &government);
            let percentiles = match group {
                Group::All => card.percentiles,
                _ => percentiles_for(slug, &population),
            };
            tracing::debug!(slug = %slug, group = %group, "Serving precomputed card");
            return Ok(CardView {
                politician,
                session: session.to_string(),
                group,
                metrics: card.metrics,
                percentiles: Some(percentiles),
                distributions: Some(distributions_for(slug, &population, DEFAULT_BUCKET_COUNT)),
                rankings_available: true,
                precomputed: true,
            });
        }

        tracing::debug!(slug = %slug, "No precomputed card, computing on demand");
        let metrics = self.compute_metrics(&politician, session).await?;

        let (percentiles, distributions) = match table {
            Some(mut table) => {
                table.ensure_member(metrics.record.clone());
                let population =
                    filter_by_group(slug, &table.metrics, group, &politician.party, &government);
                (
                    Some(percentiles_for(slug, &population)),
                    Some(distributions_for(slug, &population, DEFAULT_BUCKET_COUNT)),
                )
            }
            None => (None, None),
        };

        Ok(CardView {
            politician,
            session: session.to_string(),
            group,
            metrics: metrics.card_metrics(),
            rankings_available: percentiles.is_some(),
            percentiles,
            distributions,
            precomputed: false,
        })
    }

    async fn compute_metrics(
        &self,
        politician: &Politician,
        session: &str,
    ) -> Result<EntityMetrics, ServeError> {
        let votes = self.fetchers.session_votes(session).await?;
        Ok(compute_entity_metrics(&self.fetchers, politician, session, &votes, false).await?)
    }
}
