//! Metric computers
//!
//! The submodules are pure functions over normalized records.
//! [`compute_entity_metrics`] gathers one politician's inputs through the
//! fetchers and runs them all.

pub mod attendance;
pub mod bills;
pub mod loyalty;

pub use attendance::{attendance, votes_cast};
pub use bills::bill_summaries;
pub use loyalty::{is_independent, loyalty_vote_numbers, party_loyalty};

use crate::fetchers::Fetchers;
use crate::models::{
    BillSummary, CardMetrics, CardSummary, MetricRecord, Percentiles, Politician, Vote,
};
use crate::services::FetchError;
use chrono::Utc;

/// Bills kept on a card
pub const CARD_BILLS_LIMIT: usize = 5;

/// Round half away from zero to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Every metric for one politician in one session
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetrics {
    pub record: MetricRecord,
    pub bills_list: Vec<BillSummary>,
    pub total_votes: usize,
    pub votes_cast: usize,
}

impl EntityMetrics {
    /// Card view of these metrics
    pub fn card_metrics(&self) -> CardMetrics {
        CardMetrics {
            attendance: self.record.attendance,
            party_loyalty: self.record.party_loyalty,
            bills_sponsored: self.record.bills_sponsored,
            bills_list: self
                .bills_list
                .iter()
                .take(CARD_BILLS_LIMIT)
                .cloned()
                .collect(),
            debate_speeches: self.record.debate_speeches,
            total_votes: self.total_votes,
            votes_cast: self.votes_cast,
        }
    }

    /// Card for `session` with the given ranks
    pub fn card(&self, session: &str, percentiles: Percentiles) -> CardSummary {
        CardSummary {
            slug: self.record.slug.clone(),
            session: session.to_string(),
            computed_at: Utc::now(),
            metrics: self.card_metrics(),
            percentiles,
        }
    }
}

/// Fetch one politician's ballots, speech count and bills, then compute
///
/// Attendance only counts votes held since the politician's current run of
/// memberships began, when the record carries one.
///
/// With warm caches this performs no network requests: ballots may be
/// served stale (`stale_ok`), speech counts come from the summary record and
/// vote details are cached permanently.
pub async fn compute_entity_metrics(
    fetchers: &Fetchers,
    politician: &Politician,
    session: &str,
    session_votes: &[Vote],
    stale_ok: bool,
) -> Result<EntityMetrics, FetchError> {
    let slug = politician.slug.as_str();
    let (ballots, speech_count, bills) = tokio::try_join!(
        fetchers.politician_ballots(slug, session, stale_ok),
        fetchers.ensure_speech_summary(slug, session),
        fetchers.sponsored_bills(slug, session),
    )?;

    let party_loyalty = if is_independent(&politician.party) {
        None
    } else {
        let numbers = loyalty_vote_numbers(&ballots);
        let details = fetchers.vote_details_batch(session, &numbers).await;
        party_loyalty(
            &ballots,
            &politician.party,
            &details,
            fetchers.settings().free_vote_threshold,
        )
    };

    let (bills_sponsored, bills_list) = bill_summaries(&bills);

    Ok(EntityMetrics {
        record: MetricRecord {
            slug: politician.slug.clone(),
            party: politician.party.clone(),
            attendance: Some(attendance(
                &ballots,
                session_votes,
                politician.serving_since(),
            )),
            party_loyalty,
            bills_sponsored,
            debate_speeches: speech_count,
        },
        bills_list,
        total_votes: session_votes.len(),
        votes_cast: votes_cast(&ballots),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round1_half_away_from_zero() {
        assert_eq!(round1(66.66), 66.7);
        assert_eq!(round1(12.25), 12.3);
        assert_eq!(round1(100.0), 100.0);
        assert_eq!(round1(0.04), 0.0);
    }
}
