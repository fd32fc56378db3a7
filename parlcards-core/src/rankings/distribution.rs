//! Histograms for spark charts

use crate::models::{Distribution, Distributions, MetricRecord};
use serde::{Deserialize, Serialize};

/// Default histogram resolution
pub const DEFAULT_BUCKET_COUNT: usize = 20;

/// Ranked metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Attendance,
    PartyLoyalty,
    BillsSponsored,
    DebateSpeeches,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Attendance,
        Metric::PartyLoyalty,
        Metric::BillsSponsored,
        Metric::DebateSpeeches,
    ];

    pub fn value(&self, record: &MetricRecord) -> Option<f64> {
        match self {
            Metric::Attendance => record.attendance,
            Metric::PartyLoyalty => record.party_loyalty,
            Metric::BillsSponsored => Some(record.bills_sponsored as f64),
            Metric::DebateSpeeches => Some(record.debate_speeches as f64),
        }
    }

    /// Metrics taking small non-negative integer values
    pub fn is_integer(&self) -> bool {
        matches!(self, Metric::BillsSponsored | Metric::DebateSpeeches)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Attendance => "attendance",
            Metric::PartyLoyalty => "party_loyalty",
            Metric::BillsSponsored => "bills_sponsored",
            Metric::DebateSpeeches => "debate_speeches",
        }
    }
}

/// Histogram of `metric` over `population` with the subject's bucket
///
/// Integer metrics whose maximum is below `bucket_count` get one bucket per
/// value 0..=max. Otherwise `bucket_count` equal-width bins span [min, max]
/// (a zero-width range uses a unit span). None when the subject is absent
/// from the population, has no value, or no member has a value.
pub fn distribution_buckets(
    subject_slug: &str,
    population: &[MetricRecord],
    metric: Metric,
    bucket_count: usize,
) -> Option<Distribution> {
    let subject_value = population
        .iter()
        .find(|m| m.slug == subject_slug)
        .and_then(|m| metric.value(m))?;
    let values: Vec<f64> = population.iter().filter_map(|m| metric.value(m)).collect();
    if values.is_empty() {
        return None;
    }

    let bucket_count = bucket_count.max(1);
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if metric.is_integer() && lo >= 0.0 && (hi as usize) < bucket_count {
        let mut buckets = vec![0u64; hi as usize + 1];
        for v in &values {
            buckets[*v as usize] += 1;
        }
        return Some(Distribution {
            buckets,
            subject_bucket: subject_value as usize,
            lo,
            hi,
        });
    }

    let span = if hi - lo == 0.0 { 1.0 } else { hi - lo };
    let index = |v: f64| (((v - lo) / span * bucket_count as f64) as usize).min(bucket_count - 1);

    let mut buckets = vec![0u64; bucket_count];
    for v in &values {
        buckets[index(*v)] += 1;
    }
    Some(Distribution {
        buckets,
        subject_bucket: index(subject_value),
        lo,
        hi,
    })
}

/// Histograms for every metric
pub fn distributions_for(
    subject_slug: &str,
    population: &[MetricRecord],
    bucket_count: usize,
) -> Distributions {
    let build = |metric| distribution_buckets(subject_slug, population, metric, bucket_count);
    Distributions {
        attendance: build(Metric::Attendance),
        party_loyalty: build(Metric::PartyLoyalty),
        bills_sponsored: build(Metric::BillsSponsored),
        debate_speeches: build(Metric::DebateSpeeches),
    }
}
