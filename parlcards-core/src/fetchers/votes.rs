use super::{parse_items, parse_one, politician_ref, Fetchers};
use crate::cache::CacheKey;
use crate::models::vote::RawBallot;
use crate::models::{Ballot, Vote, VoteDetail};
use crate::services::FetchError;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};

impl Fetchers {
    /// Every vote held in `session`
    pub async fn session_votes(&self, session: &str) -> Result<Vec<Vote>, FetchError> {
        let key = CacheKey::SessionVotes {
            session: session.to_string(),
        };
        if let Some(hit) = self.fresh(&key)? {
            return Ok(hit);
        }

        let items = self
            .client
            .paginate("/votes/", &[("session", session)])
            .await?;
        let votes: Vec<Vote> = parse_items(items)?;

        tracing::info!(session = %session, count = votes.len(), "Fetched session votes");
        let ttl = self.seasonal_ttl(self.settings.ttl_session_votes);
        self.store_quietly(&key, &votes, ttl, &format!("/votes/?session={}", session));
        Ok(votes)
    }

    /// A politician's ballots on votes of `session`
    ///
    /// The source filters ballots by membership session rather than vote
    /// session, so every ballot is fetched and filtered on the vote URL.
    /// With `stale_ok`, an expired cache is returned before going to the
    /// network: ballots on votes already held never change.
    pub async fn politician_ballots(
        &self,
        slug: &str,
        session: &str,
        stale_ok: bool,
    ) -> Result<Vec<Ballot>, FetchError> {
        let key = CacheKey::Ballots {
            slug: slug.to_string(),
            session: session.to_string(),
        };
        if let Some(hit) = self.fresh(&key)? {
            return Ok(hit);
        }
        if stale_ok {
            if let Some(stale) = self.store.read_stale(&key) {
                tracing::debug!(key = %key, "Serving stale ballots");
                return Ok(stale);
            }
        }

        let politician = politician_ref(slug);
        let items = self
            .client
            .paginate("/votes/ballots/", &[("politician", politician.as_str())])
            .await?;
        let raw: Vec<RawBallot> = parse_items(items)?;
        let ballots: Vec<Ballot> = raw
            .into_iter()
            .filter_map(Ballot::from_raw)
            .filter(|b| b.in_session(session))
            .collect();

        let ttl = self.seasonal_ttl(self.settings.ttl_ballots);
        let source = format!("/votes/ballots/?politician={} (filtered to {})", slug, session);
        self.store_quietly(&key, &ballots, ttl, &source);
        Ok(ballots)
    }

    /// One vote's party breakdown; cached without expiry in practice
    pub async fn vote_detail(&self, session: &str, number: &str) -> Result<VoteDetail, FetchError> {
        let key = CacheKey::VoteDetail {
            session: session.to_string(),
            number: number.to_string(),
        };
        if let Some(hit) = self.fresh(&key)? {
            return Ok(hit);
        }

        let path = format!("/votes/{}/{}/", session, number);
        let detail: VoteDetail = parse_one(self.client.get(&path, &[]).await?)?;

        // Held votes are immutable: no recess stretch, just the permanent TTL
        self.store_quietly(&key, &detail, self.settings.ttl_vote_detail, &path);
        Ok(detail)
    }

    /// Fetch many vote details with bounded concurrency
    ///
    /// Failed lookups are logged and left out of the result.
    pub async fn vote_details_batch(
        &self,
        session: &str,
        numbers: &[String],
    ) -> HashMap<String, VoteDetail> {
        let unique: BTreeSet<&String> = numbers.iter().collect();
        let concurrency = self.settings.vote_detail_concurrency.max(1);

        let results: Vec<(String, Result<VoteDetail, FetchError>)> = stream::iter(unique.into_iter().cloned())
            .map(|number: String| async move {
                let result = self.vote_detail(session, &number).await;
                (number, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|(number, result)| match result {
                Ok(detail) => Some((number, detail)),
                Err(e) => {
                    tracing::warn!(
                        session = %session,
                        vote = %number,
                        error = %e,
                        "Vote detail unavailable"
                    );
                    None
                }
            })
            .collect()
    }

    /// True when the vote detail for `number` is missing or expired on disk
    pub fn vote_detail_missing(&self, session: &str, number: &str) -> bool {
        self.store.is_expired(&CacheKey::VoteDetail {
            session: session.to_string(),
            number: number.to_string(),
        })
    }
}
