//! Typed records for remote resources and derived data
//!
//! Raw API payloads are deserialized into `Raw*` shapes with every field
//! optional, then normalized at the fetch boundary. Everything cached and
//! everything passed to the metric computers uses the normalized types.

pub mod bill;
pub mod politician;
pub mod rankings;
pub mod vote;

pub use bill::{Bill, BillSummary, SpeechRef, SpeechSummary};
pub use politician::{party_slug, Membership, Politician, RawPolitician};
pub use rankings::{
    CardMetrics, CardSummary, Distribution, Distributions, MetricRecord, Percentiles,
    RankingsTable,
};
pub use vote::{vote_number_from_url, Ballot, BallotValue, PartyVote, Vote, VoteDetail};

use serde::{Deserialize, Deserializer};

/// Bilingual text field as served by the API
///
/// Usually `{"en": "...", "fr": "..."}`, occasionally a bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LocalizedRepr {
    Text(String),
    Map {
        #[serde(default)]
        en: Option<String>,
    },
}

/// Deserialize a localized field to its English text ("" when absent)
pub(crate) fn localized_en<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<LocalizedRepr>::deserialize(deserializer)?;
    Ok(match repr {
        Some(LocalizedRepr::Text(text)) => text,
        Some(LocalizedRepr::Map { en }) => en.unwrap_or_default(),
        None => String::new(),
    })
}

/// Deserialize a nullable string to "" when null
pub(crate) fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
