//! Votes, ballots and per-party vote breakdowns

use super::{localized_en, string_or_empty};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One recorded division in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub session: String,
    #[serde(default)]
    pub number: Option<u64>,
    /// ISO date (YYYY-MM-DD)
    #[serde(default, deserialize_with = "string_or_empty")]
    pub date: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub result: String,
    #[serde(default, deserialize_with = "localized_en")]
    pub description: String,
}

impl Vote {
    /// Vote number as used in detail paths, from `number` or else the URL
    pub fn number_key(&self) -> Option<String> {
        self.number
            .map(|n| n.to_string())
            .or_else(|| vote_number_from_url(&self.url))
    }
}

/// Extract the vote number from `/votes/<session>/<n>/`
pub fn vote_number_from_url(vote_url: &str) -> Option<String> {
    let parts: Vec<&str> = vote_url.trim_matches('/').split('/').collect();
    if parts.len() >= 3 && !parts[parts.len() - 1].is_empty() {
        Some(parts[parts.len() - 1].to_string())
    } else {
        None
    }
}

/// A legislator's recorded position on one vote
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BallotValue {
    Yes,
    No,
    /// Procedural mutual abstention
    Paired,
    /// Present but abstained
    DidNotVote,
    Other(String),
}

impl BallotValue {
    /// True for Yes/No, the only values that count as a vote cast
    pub fn is_cast(&self) -> bool {
        matches!(self, BallotValue::Yes | BallotValue::No)
    }

    pub fn as_str(&self) -> &str {
        match self {
            BallotValue::Yes => "Yes",
            BallotValue::No => "No",
            BallotValue::Paired => "Paired",
            BallotValue::DidNotVote => "Didn't vote",
            BallotValue::Other(other) => other,
        }
    }
}

impl From<String> for BallotValue {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Yes" => BallotValue::Yes,
            "No" => BallotValue::No,
            "Paired" => BallotValue::Paired,
            "Didn't vote" => BallotValue::DidNotVote,
            _ => BallotValue::Other(value),
        }
    }
}

impl From<BallotValue> for String {
    fn from(value: BallotValue) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for BallotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BallotValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BallotValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(String::deserialize(deserializer)?.into())
    }
}

/// One ballot, normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ballot {
    pub vote_url: String,
    pub ballot: BallotValue,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBallot {
    #[serde(default)]
    vote_url: Option<String>,
    #[serde(default)]
    vote: Option<RawVoteRef>,
    #[serde(default, deserialize_with = "string_or_empty")]
    ballot: String,
}

#[derive(Debug, Deserialize)]
struct RawVoteRef {
    #[serde(default)]
    url: Option<String>,
}

impl Ballot {
    /// Normalize a raw ballot; None when it names no vote
    pub(crate) fn from_raw(raw: RawBallot) -> Option<Self> {
        let vote_url = raw
            .vote_url
            .filter(|u| !u.is_empty())
            .or_else(|| raw.vote.and_then(|v| v.url))
            .filter(|u| !u.is_empty())?;
        Some(Self {
            vote_url,
            ballot: raw.ballot.into(),
        })
    }

    pub fn vote_number(&self) -> Option<String> {
        vote_number_from_url(&self.vote_url)
    }

    /// True when the ballot belongs to `session`
    pub fn in_session(&self, session: &str) -> bool {
        self.vote_url.starts_with(&format!("/votes/{}/", session))
    }
}

/// Vote detail with the per-party breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteDetail {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub session: String,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub date: String,
    #[serde(default)]
    pub party_votes: Vec<PartyVote>,
}

/// A party's majority position on one vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyVote {
    /// Party short name
    #[serde(default, deserialize_with = "party_short_name")]
    pub party: String,
    pub vote: BallotValue,
    /// Share of the caucus voting against the majority (0.0-1.0)
    #[serde(default)]
    pub disagreement: Option<f64>,
}

impl VoteDetail {
    /// Breakdown entry matching `party` by case-insensitive containment either way
    pub fn party_vote(&self, party: &str) -> Option<&PartyVote> {
        let party = party.to_lowercase();
        if party.is_empty() {
            return None;
        }
        self.party_votes.iter().find(|pv| {
            let name = pv.party.to_lowercase();
            !name.is_empty() && (party.contains(&name) || name.contains(&party))
        })
    }
}

/// Accepts either a flat short name or the API's nested `party` object
fn party_short_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PartyRepr {
        Flat(String),
        Nested(super::politician::RawParty),
    }

    Ok(match Option::<PartyRepr>::deserialize(deserializer)? {
        Some(PartyRepr::Flat(name)) => name,
        Some(PartyRepr::Nested(party)) => party.short_name,
        None => String::new(),
    })
}
