//! Party loyalty
//!
//! Loyalty is the share of attributable ballots matching the party majority.
//! Paired ballots are excluded. "Didn't vote" ballots are attributable and
//! never match. Votes where the caucus disagreement exceeds the free-vote
//! threshold are not attributable. A vote listed more than once is scored
//! from its first ballot only.

use super::round1;
use crate::models::{Ballot, BallotValue, VoteDetail};
use std::collections::{HashMap, HashSet};

/// True for an unaffiliated member
pub fn is_independent(party: &str) -> bool {
    let party = party.trim().to_lowercase();
    party.is_empty() || party == "independent" || party == "ind."
}

/// Vote numbers whose details loyalty needs (paired ballots excluded)
pub fn loyalty_vote_numbers(ballots: &[Ballot]) -> Vec<String> {
    ballots
        .iter()
        .filter(|b| b.ballot != BallotValue::Paired)
        .filter_map(Ballot::vote_number)
        .collect()
}

/// Loyalty percentage, or None for independents or with nothing attributable
///
/// `details` maps vote numbers to their party breakdowns; ballots whose
/// detail is missing are skipped.
pub fn party_loyalty(
    ballots: &[Ballot],
    party: &str,
    details: &HashMap<String, VoteDetail>,
    free_vote_threshold: f64,
) -> Option<f64> {
    if is_independent(party) {
        return None;
    }

    let mut loyal = 0usize;
    let mut attributable = 0usize;
    let mut seen = HashSet::new();

    for ballot in ballots {
        if ballot.ballot == BallotValue::Paired {
            continue;
        }
        let Some(number) = ballot.vote_number() else {
            continue;
        };
        if !seen.insert(number.clone()) {
            continue;
        }
        let Some(detail) = details.get(&number) else {
            continue;
        };
        let Some(party_vote) = detail.party_vote(party) else {
            continue;
        };
        if party_vote
            .disagreement
            .is_some_and(|d| d > free_vote_threshold)
        {
            continue;
        }

        attributable += 1;
        if ballot.ballot == party_vote.vote {
            loyal += 1;
        }
    }

    if attributable == 0 {
        return None;
    }
    Some(round1(loyal as f64 / attributable as f64 * 100.0))
}
