//! Filesystem cache with TTL and stale-read semantics
//!
//! Each key is one JSON file holding a [`CacheRecord`]. Reads never fail:
//! a missing, unreadable or malformed record is a cache miss. Writes replace
//! the whole file atomically.

use super::keys::CacheKey;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parlcards_common::{Error, Result};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound on stored TTLs (100 years) so expiry arithmetic cannot overflow
const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 3600;

/// Persisted cache unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    #[serde(default)]
    pub key: String,
    pub cached_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub source_descriptor: String,
    pub data: T,
}

impl<T> CacheRecord<T> {
    /// Build a record whose `expires_at` is `cached_at + ttl_seconds`
    pub fn new(
        key: &CacheKey,
        data: T,
        ttl_seconds: u64,
        source_descriptor: &str,
        cached_at: DateTime<Utc>,
    ) -> Self {
        let ttl_seconds = ttl_seconds.min(MAX_TTL_SECONDS);
        Self {
            key: key.to_string(),
            cached_at,
            ttl_seconds,
            expires_at: cached_at + ChronoDuration::seconds(ttl_seconds as i64),
            source_descriptor: source_descriptor.to_string(),
            data,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Record header used when only expiry matters
#[derive(Deserialize)]
struct RecordHeader {
    expires_at: DateTime<Utc>,
    #[allow(dead_code)]
    data: IgnoredAny,
}

/// Key/value store rooted at a cache directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a key, or None when the key embeds an unsafe identifier
    pub fn path_for(&self, key: &CacheKey) -> Option<PathBuf> {
        key.is_safe().then(|| self.root.join(key.relative_path()))
    }

    /// Fresh value for `key`, or None if missing, corrupt or expired
    pub fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.read_at(key, Utc::now())
    }

    /// Like [`read`](Self::read), evaluating expiry at `now`
    pub fn read_at<T: DeserializeOwned>(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<T> {
        let record: CacheRecord<T> = self.read_record(key)?;
        if record.is_expired_at(now) {
            tracing::debug!(key = %key, "Cache expired");
            return None;
        }
        tracing::debug!(key = %key, "Cache hit");
        Some(record.data)
    }

    /// Value for `key` ignoring expiry; None only if missing or corrupt
    pub fn read_stale<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.read_record::<T>(key).map(|r| r.data)
    }

    /// Full record for `key`, or None if missing or corrupt
    pub fn read_record<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CacheRecord<T>> {
        let bytes = self.read_bytes(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Corrupt cache record treated as miss");
                None
            }
        }
    }

    /// Write `value` under `key`, replacing any existing record
    pub fn write<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl_seconds: u64,
        source_descriptor: &str,
    ) -> Result<()> {
        self.write_at(key, value, ttl_seconds, source_descriptor, Utc::now())
    }

    /// Like [`write`](Self::write) with an explicit `cached_at`
    pub fn write_at<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl_seconds: u64,
        source_descriptor: &str,
        cached_at: DateTime<Utc>,
    ) -> Result<()> {
        let path = self
            .path_for(key)
            .ok_or_else(|| Error::InvalidInput(format!("unsafe cache key: {}", key)))?;
        let record = CacheRecord::new(key, value, ttl_seconds, source_descriptor, cached_at);
        parlcards_common::fs::write_json_atomic(&path, &record)?;
        tracing::debug!(key = %key, ttl_seconds = record.ttl_seconds, "Cache write");
        Ok(())
    }

    /// True if `key` is missing, corrupt or expired
    pub fn is_expired(&self, key: &CacheKey) -> bool {
        self.is_expired_at(key, Utc::now())
    }

    pub fn is_expired_at(&self, key: &CacheKey, now: DateTime<Utc>) -> bool {
        self.read_bytes(key)
            .and_then(|bytes| serde_json::from_slice::<RecordHeader>(&bytes).ok())
            .map(|header| now > header.expires_at)
            .unwrap_or(true)
    }

    /// Remove the record for `key`; returns whether a file was removed
    pub fn delete(&self, key: &CacheKey) -> Result<bool> {
        let Some(path) = self.path_for(key) else {
            return Ok(false);
        };
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of the entries directly under `relative_dir` (empty if absent)
    pub fn list_dir(&self, relative_dir: &Path) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.root.join(relative_dir)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    fn read_bytes(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let path = self.path_for(key)?;
        std::fs::read(path).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn key() -> CacheKey {
        CacheKey::Ballots {
            slug: "jane-doe".into(),
            session: "45-1".into(),
        }
    }

    #[test]
    fn test_round_trip_while_fresh() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let value = json!([{"ballot": "Yes"}, {"ballot": "No"}]);

        store.write(&key(), &value, 3600, "/votes/ballots/").unwrap();

        let read: serde_json::Value = store.read(&key()).unwrap();
        assert_eq!(read, value);
        assert!(!store.is_expired(&key()));
    }

    #[test]
    fn test_expires_at_invariant() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        store.write(&key(), &json!({"a": 1}), 600, "test").unwrap();

        let record: CacheRecord<serde_json::Value> = store.read_record(&key()).unwrap();
        assert_eq!(record.expires_at, record.cached_at + ChronoDuration::seconds(600));
        assert_eq!(record.ttl_seconds, 600);
        assert_eq!(record.key, "raw/ballots/jane-doe_45-1.json");
        assert_eq!(record.source_descriptor, "test");
    }

    #[test]
    fn test_expired_read_is_absent_but_stale_read_works() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let value = json!({"speech_count": 12});
        store.write(&key(), &value, 60, "test").unwrap();

        let later = Utc::now() + ChronoDuration::seconds(120);
        assert!(store.read_at::<serde_json::Value>(&key(), later).is_none());
        assert!(store.is_expired_at(&key(), later));
        assert_eq!(store.read_stale::<serde_json::Value>(&key()), Some(value));
    }

    #[test]
    fn test_missing_key_is_miss() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        assert!(store.read::<serde_json::Value>(&key()).is_none());
        assert!(store.read_stale::<serde_json::Value>(&key()).is_none());
        assert!(store.is_expired(&key()));
    }

    #[test]
    fn test_corrupt_record_is_miss() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let path = store.path_for(&key()).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{\"cached_at\": \"not json").unwrap();

        assert!(store.read::<serde_json::Value>(&key()).is_none());
        assert!(store.read_stale::<serde_json::Value>(&key()).is_none());
        assert!(store.is_expired(&key()));
    }

    #[test]
    fn test_type_mismatch_is_miss() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        store.write(&key(), &json!({"not": "a list"}), 60, "test").unwrap();

        assert!(store.read::<Vec<u32>>(&key()).is_none());
    }

    #[test]
    fn test_write_overwrites_wholesale() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        store.write(&key(), &json!({"a": 1, "b": 2}), 60, "first").unwrap();
        store.write(&key(), &json!({"c": 3}), 60, "second").unwrap();

        let read: serde_json::Value = store.read(&key()).unwrap();
        assert_eq!(read, json!({"c": 3}));
    }

    #[test]
    fn test_unsafe_key_rejected() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let bad = CacheKey::PoliticianDetail {
            slug: "../../escape".into(),
        };

        assert!(store.write(&bad, &json!(1), 60, "test").is_err());
        assert!(store.read::<serde_json::Value>(&bad).is_none());
        assert!(!store.delete(&bad).unwrap());
    }

    #[test]
    fn test_delete_and_list_dir() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        store.write(&key(), &json!(1), 60, "test").unwrap();

        assert_eq!(
            store.list_dir(Path::new("raw/ballots")),
            vec!["jane-doe_45-1.json".to_string()]
        );
        assert!(store.delete(&key()).unwrap());
        assert!(!store.delete(&key()).unwrap());
        assert!(store.list_dir(Path::new("raw/ballots")).is_empty());
        assert!(store.list_dir(Path::new("nope")).is_empty());
    }
}
