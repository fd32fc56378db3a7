//! Cache-first fetchers, one per resource type
//!
//! Every fetcher follows the same shape: fresh cache hit → return; otherwise
//! fetch through the shared [`RateLimitedClient`], normalize, write the cache
//! with a recess-adjusted TTL, return. Cache write failures are logged and
//! never fail the fetch.

mod bills;
mod politicians;
mod speeches;
mod votes;

pub use speeches::{backfill_speech_summaries, summary_from_stale_full, BackfillReport};

use crate::cache::{CacheKey, CacheStore, RecessCalendar, TtlPolicy};
use crate::services::{FetchError, RateLimitedClient};
use parlcards_common::Settings;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Shared handle for all resource fetchers
#[derive(Clone)]
pub struct Fetchers {
    client: Arc<RateLimitedClient>,
    store: CacheStore,
    ttl: TtlPolicy,
    settings: Arc<Settings>,
}

impl Fetchers {
    pub fn new(
        client: Arc<RateLimitedClient>,
        store: CacheStore,
        ttl: TtlPolicy,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            client,
            store,
            ttl,
            settings,
        }
    }

    /// Fetchers over `settings.cache_dir` with the default recess calendar
    pub fn from_settings(client: Arc<RateLimitedClient>, settings: Arc<Settings>) -> Self {
        let store = CacheStore::new(settings.cache_dir.clone());
        let ttl = TtlPolicy::new(RecessCalendar::default(), settings.recess_multiplier);
        Self::new(client, store, ttl, settings)
    }

    pub fn client(&self) -> &Arc<RateLimitedClient> {
        &self.client
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Base TTL stretched for recess
    fn seasonal_ttl(&self, base_ttl: u64) -> u64 {
        self.ttl.effective(base_ttl)
    }

    /// Fresh cached value, rejecting keys built from unsafe identifiers
    fn fresh<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, FetchError> {
        ensure_safe(key)?;
        let hit = self.store.read(key);
        if hit.is_none() {
            tracing::debug!(key = %key, "Cache miss");
        }
        Ok(hit)
    }

    fn store_quietly<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: u64, source: &str) {
        if let Err(e) = self.store.write(key, value, ttl, source) {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}

fn ensure_safe(key: &CacheKey) -> Result<(), FetchError> {
    if key.is_safe() {
        Ok(())
    } else {
        Err(FetchError::NotFound(key.to_string()))
    }
}

/// Deserialize each listing item into a typed record
fn parse_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, FetchError> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| FetchError::Parse(e.to_string())))
        .collect()
}

fn parse_one<T: DeserializeOwned>(value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::Parse(e.to_string()))
}

fn politician_ref(slug: &str) -> String {
    format!("/politicians/{}/", slug)
}
