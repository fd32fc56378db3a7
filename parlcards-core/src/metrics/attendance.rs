//! Voting attendance

use super::round1;
use crate::models::{Ballot, Vote};
use chrono::NaiveDate;
use parlcards_common::time::parse_date;

/// Share of eligible votes on which a Yes or No ballot was cast, 0-100
///
/// With `joined_on`, only votes held on or after that date are eligible.
/// Votes with unparsable dates are treated as predating any join date.
/// Returns 0.0 when no vote is eligible.
pub fn attendance(ballots: &[Ballot], session_votes: &[Vote], joined_on: Option<NaiveDate>) -> f64 {
    let eligible = match joined_on {
        Some(joined) => session_votes
            .iter()
            .filter(|v| parse_date(&v.date).is_some_and(|d| d >= joined))
            .count(),
        None => session_votes.len(),
    };
    if eligible == 0 {
        return 0.0;
    }

    round1(votes_cast(ballots) as f64 / eligible as f64 * 100.0)
}

/// Number of Yes/No ballots
pub fn votes_cast(ballots: &[Ballot]) -> usize {
    ballots.iter().filter(|b| b.ballot.is_cast()).count()
}
