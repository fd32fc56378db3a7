//! Persisted warmup progress (`meta/warmup_status_{session}.json`)
//!
//! Each session keeps its own file. An entity is in at most one of the
//! completed and failed sets. A missing, unreadable or foreign-session file
//! loads as empty progress.

use chrono::{DateTime, Utc};
use parlcards_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Progress file location for `session` relative to the cache root
pub fn progress_path(cache_root: &Path, session: &str) -> PathBuf {
    cache_root
        .join("meta")
        .join(format!("warmup_status_{}.json", session))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupProgress {
    #[serde(default)]
    pub session: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub completed_slugs: BTreeSet<String>,
    #[serde(default)]
    pub failed_slugs: BTreeSet<String>,
    #[serde(default)]
    pub rankings_complete: bool,
    #[serde(default)]
    pub total_api_requests: u64,
}

impl WarmupProgress {
    /// Empty progress for `session`
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            last_updated: Utc::now(),
            completed_slugs: BTreeSet::new(),
            failed_slugs: BTreeSet::new(),
            rankings_complete: false,
            total_api_requests: 0,
        }
    }

    pub fn load(cache_root: &Path, session: &str) -> Self {
        let path = progress_path(cache_root, session);
        let Ok(bytes) = std::fs::read(&path) else {
            return Self::new(session);
        };
        match serde_json::from_slice::<Self>(&bytes) {
            Ok(progress) if !progress.session.is_empty() && progress.session != session => {
                tracing::warn!(
                    path = %path.display(),
                    recorded = %progress.session,
                    session = %session,
                    "Warmup progress belongs to another session, starting fresh"
                );
                Self::new(session)
            }
            Ok(mut progress) => {
                progress.session = session.to_string();
                // Files written by hand may overlap; completed wins
                let completed = progress.completed_slugs.clone();
                progress.failed_slugs.retain(|slug| !completed.contains(slug));
                progress
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Unreadable warmup progress, starting fresh"
                );
                Self::new(session)
            }
        }
    }

    /// Atomically persist, stamping `last_updated`
    pub fn save(&mut self, cache_root: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        parlcards_common::fs::write_json_atomic(&progress_path(cache_root, &self.session), self)
    }

    /// True when the entity needs no further fetch work this run
    pub fn is_settled(&self, slug: &str) -> bool {
        self.completed_slugs.contains(slug) || self.failed_slugs.contains(slug)
    }

    pub fn mark_completed(&mut self, slug: &str) {
        self.failed_slugs.remove(slug);
        self.completed_slugs.insert(slug.to_string());
    }

    pub fn mark_failed(&mut self, slug: &str) {
        self.completed_slugs.remove(slug);
        self.failed_slugs.insert(slug.to_string());
    }

    /// Forget previous failures so they are retried
    pub fn clear_failed(&mut self) -> usize {
        let cleared = self.failed_slugs.len();
        self.failed_slugs.clear();
        cleared
    }
}
