//! Speech counts
//!
//! Only counts are consumed downstream. The full listing is stored as bare
//! references (no speech text) and a sibling summary record holds the count;
//! readers go through [`Fetchers::ensure_speech_summary`].

use super::{ensure_safe, parse_items, politician_ref, Fetchers};
use crate::cache::keys::speeches_root;
use crate::cache::{CacheKey, CacheStore};
use crate::models::{SpeechRef, SpeechSummary};
use crate::services::FetchError;
use serde::de::IgnoredAny;

impl Fetchers {
    /// Speech count for a politician in `session`
    ///
    /// Looks in order at: the fresh summary, the full listing cache (stale is
    /// fine, the summary is rewritten from it), then the network.
    pub async fn ensure_speech_summary(&self, slug: &str, session: &str) -> Result<u64, FetchError> {
        let key = summary_key(slug, session);
        if let Some(summary) = self.fresh::<SpeechSummary>(&key)? {
            return Ok(summary.speech_count);
        }

        let ttl = self.seasonal_ttl(self.settings.ttl_speeches);
        if let Some(count) = summary_from_stale_full(&self.store, ttl, slug, session) {
            return Ok(count);
        }

        self.fetch_speeches(slug, session).await
    }

    /// Fetch the speech listing from the network, caching references and count
    pub async fn fetch_speeches(&self, slug: &str, session: &str) -> Result<u64, FetchError> {
        let full_key = full_key(slug, session);
        ensure_safe(&full_key)?;

        let speaker = politician_ref(slug);
        let items = self
            .client
            .paginate(
                "/speeches/",
                &[("politician", speaker.as_str()), ("session", session)],
            )
            .await?;
        let refs: Vec<SpeechRef> = parse_items(items)?;
        let count = refs.len() as u64;

        let ttl = self.seasonal_ttl(self.settings.ttl_speeches);
        let source = format!("/speeches/?politician={}&session={}", slug, session);
        self.store_quietly(&full_key, &refs, ttl, &source);
        self.store_quietly(
            &summary_key(slug, session),
            &SpeechSummary {
                speech_count: count,
            },
            ttl,
            &source,
        );
        Ok(count)
    }
}

fn summary_key(slug: &str, session: &str) -> CacheKey {
    CacheKey::SpeechSummary {
        slug: slug.to_string(),
        session: session.to_string(),
    }
}

fn full_key(slug: &str, session: &str) -> CacheKey {
    CacheKey::Speeches {
        slug: slug.to_string(),
        session: session.to_string(),
    }
}

/// Count the full listing cache (ignoring expiry) and write a fresh summary
///
/// Returns None when no readable full listing exists.
pub fn summary_from_stale_full(
    store: &CacheStore,
    ttl_seconds: u64,
    slug: &str,
    session: &str,
) -> Option<u64> {
    // Item shape is irrelevant, only the length is needed
    let listing: Vec<IgnoredAny> = store.read_stale(&full_key(slug, session))?;
    let count = listing.len() as u64;

    let key = summary_key(slug, session);
    let summary = SpeechSummary {
        speech_count: count,
    };
    if let Err(e) = store.write(&key, &summary, ttl_seconds, "derived from speech listing") {
        tracing::warn!(key = %key, error = %e, "Speech summary write failed");
    }
    Some(count)
}

/// Outcome of a summary backfill pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Write summaries for every full speech listing of `session` lacking a fresh one
pub fn backfill_speech_summaries(
    store: &CacheStore,
    ttl_seconds: u64,
    session: &str,
) -> BackfillReport {
    let suffix = format!("_{}.json", session);
    let mut report = BackfillReport::default();

    for name in store.list_dir(&speeches_root()) {
        let Some(slug) = name.strip_suffix(&suffix) else {
            continue;
        };
        if slug.is_empty() {
            continue;
        }

        if !store.is_expired(&summary_key(slug, session)) {
            report.skipped += 1;
            continue;
        }

        match summary_from_stale_full(store, ttl_seconds, slug, session) {
            Some(count) => {
                tracing::debug!(slug = %slug, count, "Speech summary generated");
                report.generated += 1;
            }
            None => {
                tracing::warn!(slug = %slug, "Unreadable speech listing");
                report.failed += 1;
            }
        }
    }

    report
}
