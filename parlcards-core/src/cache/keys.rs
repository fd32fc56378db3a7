//! Cache key namespace
//!
//! Each variant maps to one file under the cache root. Raw API data lives
//! under `raw/`, derived data under `computed/`.

use std::fmt;
use std::path::PathBuf;

/// Key identifying one cache record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    PoliticianList,
    PoliticianDetail { slug: String },
    SessionVotes { session: String },
    VoteDetail { session: String, number: String },
    Ballots { slug: String, session: String },
    Bills { slug: String, session: String },
    Speeches { slug: String, session: String },
    SpeechSummary { slug: String, session: String },
    Rankings { session: String },
    Card { slug: String, session: String },
}

impl CacheKey {
    /// Path of the record relative to the cache root
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.to_string())
    }

    /// Identifiers embedded in this key
    fn components(&self) -> Vec<&str> {
        match self {
            CacheKey::PoliticianList => vec![],
            CacheKey::PoliticianDetail { slug } => vec![slug.as_str()],
            CacheKey::SessionVotes { session } | CacheKey::Rankings { session } => {
                vec![session.as_str()]
            }
            CacheKey::VoteDetail { session, number } => vec![session.as_str(), number.as_str()],
            CacheKey::Ballots { slug, session }
            | CacheKey::Bills { slug, session }
            | CacheKey::Speeches { slug, session }
            | CacheKey::SpeechSummary { slug, session }
            | CacheKey::Card { slug, session } => vec![slug.as_str(), session.as_str()],
        }
    }

    /// True when every embedded identifier is a safe single path component
    pub fn is_safe(&self) -> bool {
        self.components().into_iter().all(is_safe_component)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::PoliticianList => write!(f, "raw/politicians/list.json"),
            CacheKey::PoliticianDetail { slug } => write!(f, "raw/politicians/{}.json", slug),
            CacheKey::SessionVotes { session } => {
                write!(f, "raw/votes/session_{}_all.json", session)
            }
            CacheKey::VoteDetail { session, number } => {
                write!(f, "raw/votes/detail_{}_{}.json", session, number)
            }
            CacheKey::Ballots { slug, session } => {
                write!(f, "raw/ballots/{}_{}.json", slug, session)
            }
            CacheKey::Bills { slug, session } => write!(f, "raw/bills/{}_{}.json", slug, session),
            CacheKey::Speeches { slug, session } => {
                write!(f, "raw/speeches/{}_{}.json", slug, session)
            }
            CacheKey::SpeechSummary { slug, session } => {
                write!(f, "raw/speeches/{}_{}_summary.json", slug, session)
            }
            CacheKey::Rankings { session } => {
                write!(f, "computed/rankings/all_metrics_{}.json", session)
            }
            CacheKey::Card { slug, session } => {
                write!(f, "computed/politicians/{}/sessions/{}.json", slug, session)
            }
        }
    }
}

/// Identifier usable inside a cache path: non-empty, no separators, no `..`
pub fn is_safe_component(value: &str) -> bool {
    !value.is_empty()
        && !value.contains("..")
        && !value.contains(['/', '\\'])
        && !value.chars().any(char::is_control)
}

/// Directory holding every politician's precomputed cards
pub fn cards_root() -> PathBuf {
    PathBuf::from("computed/politicians")
}

/// Directory holding speech caches
pub fn speeches_root() -> PathBuf {
    PathBuf::from("raw/speeches")
}
