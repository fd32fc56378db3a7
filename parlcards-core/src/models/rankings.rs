//! Derived records: rankings table and precomputed cards

use super::BillSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metrics for one politician in one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub slug: String,
    /// Comparison group tag (party short name)
    #[serde(default)]
    pub party: String,
    /// 0-100, absent when not computed
    pub attendance: Option<f64>,
    /// 0-100, absent for unaffiliated members or when no vote is attributable
    pub party_loyalty: Option<f64>,
    pub bills_sponsored: u64,
    pub debate_speeches: u64,
}

/// Population-wide metrics for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingsTable {
    pub session: String,
    pub total_mps: usize,
    pub computed_mps: usize,
    #[serde(default)]
    pub failed_slugs: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<MetricRecord>,
}

impl RankingsTable {
    pub fn get(&self, slug: &str) -> Option<&MetricRecord> {
        self.metrics.iter().find(|m| m.slug == slug)
    }

    /// Append `record` unless its slug is already present
    pub fn ensure_member(&mut self, record: MetricRecord) {
        if self.get(&record.slug).is_none() {
            self.metrics.push(record);
        }
    }
}

/// Percentile ranks (0-100) keyed by metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Percentiles {
    pub attendance: u8,
    pub party_loyalty: Option<u8>,
    pub bills_sponsored: u8,
    pub debate_speeches: u8,
}

impl Percentiles {
    /// Midpoint ranks used when the subject cannot be ranked
    pub fn neutral() -> Self {
        Self {
            attendance: 50,
            party_loyalty: Some(50),
            bills_sponsored: 50,
            debate_speeches: 50,
        }
    }
}

/// Raw metrics shown on a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardMetrics {
    pub attendance: Option<f64>,
    pub party_loyalty: Option<f64>,
    pub bills_sponsored: u64,
    /// Newest first, at most five
    pub bills_list: Vec<BillSummary>,
    pub debate_speeches: u64,
    /// Votes held in the session
    pub total_votes: usize,
    /// Yes/No ballots cast
    pub votes_cast: usize,
}

/// Precomputed card for one politician in one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSummary {
    pub slug: String,
    pub session: String,
    pub computed_at: DateTime<Utc>,
    pub metrics: CardMetrics,
    pub percentiles: Percentiles,
}

/// Histogram of one metric across a comparison population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub buckets: Vec<u64>,
    /// Bucket holding the subject's own value
    pub subject_bucket: usize,
    pub lo: f64,
    pub hi: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distributions {
    pub attendance: Option<Distribution>,
    pub party_loyalty: Option<Distribution>,
    pub bills_sponsored: Option<Distribution>,
    pub debate_speeches: Option<Distribution>,
}
