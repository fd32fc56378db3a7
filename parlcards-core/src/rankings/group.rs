//! Comparison groups

use crate::models::MetricRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Groups smaller than this fall back to the full population
pub const MIN_GROUP_SIZE: usize = 5;

/// Population a politician is ranked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    #[default]
    All,
    /// Same party as the subject
    Party,
    /// Members of the governing party
    Government,
    /// Everyone outside the governing party
    Opposition,
}

impl Group {
    /// Parse a group name; unknown names mean [`Group::All`]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "party" => Group::Party,
            "government" => Group::Government,
            "opposition" => Group::Opposition,
            _ => Group::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::All => "all",
            Group::Party => "party",
            Group::Government => "government",
            Group::Opposition => "opposition",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Restrict `population` to `group` as seen from the subject
///
/// The subject is always kept when present in the population. A result
/// smaller than [`MIN_GROUP_SIZE`] is replaced by the whole population.
pub fn filter_by_group(
    subject_slug: &str,
    population: &[MetricRecord],
    group: Group,
    subject_party: &str,
    government_party: &str,
) -> Vec<MetricRecord> {
    let mut filtered: Vec<MetricRecord> = population
        .iter()
        .filter(|m| match group {
            Group::All => true,
            Group::Party => m.party == subject_party,
            Group::Government => m.party == government_party,
            Group::Opposition => m.party != government_party,
        })
        .cloned()
        .collect();

    if !filtered.iter().any(|m| m.slug == subject_slug) {
        if let Some(own) = population.iter().find(|m| m.slug == subject_slug) {
            filtered.push(own.clone());
        }
    }

    if filtered.len() < MIN_GROUP_SIZE {
        return population.to_vec();
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(slug: &str, party: &str) -> MetricRecord {
        MetricRecord {
            slug: slug.into(),
            party: party.into(),
            attendance: Some(90.0),
            party_loyalty: Some(95.0),
            bills_sponsored: 0,
            debate_speeches: 0,
        }
    }

    fn population() -> Vec<MetricRecord> {
        let mut pop = Vec::new();
        for i in 0..6 {
            pop.push(record(&format!("lib-{}", i), "Liberal"));
        }
        for i in 0..5 {
            pop.push(record(&format!("con-{}", i), "Conservative"));
        }
        for i in 0..3 {
            pop.push(record(&format!("ndp-{}", i), "NDP"));
        }
        pop
    }

    #[test]
    fn test_all_returns_everyone() {
        let pop = population();
        assert_eq!(filter_by_group("lib-0", &pop, Group::All, "Liberal", "Liberal").len(), 14);
    }

    #[test]
    fn test_party_group() {
        let pop = population();
        let filtered = filter_by_group("con-1", &pop, Group::Party, "Conservative", "Liberal");
        assert_eq!(filtered.len(), 5);
        assert!(filtered.iter().all(|m| m.party == "Conservative"));
    }

    #[test]
    fn test_subject_readded_to_foreign_group() {
        let pop = population();
        let filtered = filter_by_group("lib-2", &pop, Group::Opposition, "Liberal", "Liberal");
        assert_eq!(filtered.len(), 9);
        assert!(filtered.iter().any(|m| m.slug == "lib-2"));
    }

    #[test]
    fn test_small_group_falls_back_to_population() {
        let pop = population();
        // Three NDP members: non-empty but below the minimum
        let filtered = filter_by_group("ndp-0", &pop, Group::Party, "NDP", "Liberal");
        assert_eq!(filtered.len(), pop.len());
    }

    #[test]
    fn test_group_parse() {
        assert_eq!(Group::parse("party"), Group::Party);
        assert_eq!(Group::parse(" Government "), Group::Government);
        assert_eq!(Group::parse("opposition"), Group::Opposition);
        assert_eq!(Group::parse("everyone"), Group::All);
        assert_eq!(Group::Opposition.to_string(), "opposition");
    }
}
