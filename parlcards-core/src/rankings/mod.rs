//! Percentile engine: ranks, comparison groups and histograms

pub mod distribution;
pub mod group;
pub mod percentile;

pub use distribution::{distribution_buckets, distributions_for, Metric, DEFAULT_BUCKET_COUNT};
pub use group::{filter_by_group, Group, MIN_GROUP_SIZE};
pub use percentile::percentile;

use crate::models::{MetricRecord, Percentiles};

/// Percentile ranks of `subject_slug` within `population`
///
/// A subject missing from the population gets [`Percentiles::neutral`].
/// A subject without attendance is ranked as 0; loyalty is only ranked when
/// the subject has one.
pub fn percentiles_for(subject_slug: &str, population: &[MetricRecord]) -> Percentiles {
    let Some(subject) = population.iter().find(|m| m.slug == subject_slug) else {
        return Percentiles::neutral();
    };

    let values = |metric: Metric| -> Vec<f64> {
        population.iter().filter_map(|m| metric.value(m)).collect()
    };

    Percentiles {
        attendance: percentile(subject.attendance.unwrap_or(0.0), &values(Metric::Attendance)),
        party_loyalty: subject
            .party_loyalty
            .map(|loyalty| percentile(loyalty, &values(Metric::PartyLoyalty))),
        bills_sponsored: percentile(
            subject.bills_sponsored as f64,
            &values(Metric::BillsSponsored),
        ),
        debate_speeches: percentile(
            subject.debate_speeches as f64,
            &values(Metric::DebateSpeeches),
        ),
    }
}

/// Percentiles of the subject against one comparison group
pub fn percentiles_by_group(
    subject_slug: &str,
    population: &[MetricRecord],
    group: Group,
    subject_party: &str,
    government_party: &str,
) -> Percentiles {
    let filtered = filter_by_group(
        subject_slug,
        population,
        group,
        subject_party,
        government_party,
    );
    percentiles_for(subject_slug, &filtered)
}
