//! Sponsored bills and speech records

use super::{localized_en, string_or_empty};
use serde::{Deserialize, Serialize};

/// Bill sponsored by a politician
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub number: String,
    #[serde(default, deserialize_with = "localized_en")]
    pub name: String,
    /// Introduction date (YYYY-MM-DD), if known
    #[serde(default)]
    pub introduced: Option<String>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub session: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub url: String,
}

/// Display entry for a sponsored bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillSummary {
    pub number: String,
    pub name: String,
    pub introduced: Option<String>,
}

impl From<&Bill> for BillSummary {
    fn from(bill: &Bill) -> Self {
        Self {
            number: bill.number.clone(),
            name: bill.name.clone(),
            introduced: bill.introduced.clone().filter(|d| !d.is_empty()),
        }
    }
}

/// Reference to one speech; content is never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRef {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

/// Lightweight per-politician speech count record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechSummary {
    pub speech_count: u64,
}
