//! Settings loading and resolution
//!
//! Resolution order for the settings file:
//! 1. Explicit path (command-line argument)
//! 2. `PARLCARDS_CONFIG` environment variable
//! 3. `<os config dir>/parlcards/config.toml`
//! 4. Compiled defaults (no file)
//!
//! After the file is applied, every field may be overridden by an environment
//! variable named `PARLCARDS_<FIELD>` (e.g. `PARLCARDS_SESSION=44-1`).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV_VAR: &str = "PARLCARDS_CONFIG";

/// Prefix for per-field environment overrides
pub const ENV_PREFIX: &str = "PARLCARDS_";

/// Runtime settings shared by the fetch client, cache and warmup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Contact identifier sent in the outbound User-Agent
    pub contact_email: String,
    /// Root directory of the on-disk cache
    pub cache_dir: PathBuf,
    /// Active legislative session (e.g. "45-1")
    pub session: String,
    /// Remote API base URL
    pub api_base_url: String,

    // TTLs in seconds
    pub ttl_politician_list: u64,
    pub ttl_politician_detail: u64,
    /// Must stay <= `ttl_ballots` or attendance can exceed 100%
    pub ttl_session_votes: u64,
    pub ttl_vote_detail: u64,
    pub ttl_ballots: u64,
    pub ttl_speeches: u64,
    pub ttl_bills: u64,
    pub ttl_rankings: u64,

    /// Party tag treated as "government" for comparison groups
    pub government_party: String,

    /// TTL multiplier applied while the legislature is in recess
    pub recess_multiplier: f64,
    /// Party disagreement above which a vote counts as a free vote
    pub free_vote_threshold: f64,

    pub rate_limit_per_minute: u32,
    pub min_delay_seconds: f64,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_secs: f64,
    pub page_size: u32,

    /// Entities processed between progress-file writes
    pub progress_batch_size: usize,
    /// Concurrent vote-detail fetches in a batch
    pub vote_detail_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            contact_email: "parlcards@example.com".to_string(),
            cache_dir: PathBuf::from("cache"),
            session: "45-1".to_string(),
            api_base_url: "https://api.openparliament.ca".to_string(),
            ttl_politician_list: 172_800,
            ttl_politician_detail: 172_800,
            ttl_session_votes: 21_600,
            ttl_vote_detail: 315_360_000,
            ttl_ballots: 21_600,
            ttl_speeches: 14_400,
            ttl_bills: 43_200,
            ttl_rankings: 315_360_000,
            government_party: "Liberal".to_string(),
            recess_multiplier: 5.0,
            free_vote_threshold: 0.3,
            rate_limit_per_minute: 60,
            min_delay_seconds: 1.0,
            request_timeout_secs: 30,
            max_attempts: 4,
            backoff_base_secs: 5.0,
            page_size: 100,
            progress_batch_size: 10,
            vote_detail_concurrency: 3,
        }
    }
}

impl Settings {
    /// Load settings using the standard resolution order, then apply
    /// environment overrides and validate.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(explicit_path);
        let file_table = match &path {
            Some(p) => read_table(p)?,
            None => {
                warn!("No settings file found, using compiled defaults");
                toml::Table::new()
            }
        };

        let settings = Self::from_layers(file_table, |name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from TOML text (no environment overrides)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let settings = Self::from_layers(table, |_| None)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Merge defaults, a file table and environment lookups into settings.
    ///
    /// Environment values are parsed to the type of the field they override.
    fn from_layers<F>(file_table: toml::Table, env_lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = toml::Value::try_from(Settings::default())
            .map_err(|e| Error::Config(format!("Serialize defaults failed: {}", e)))?;
        let mut merged = match defaults {
            toml::Value::Table(t) => t,
            _ => return Err(Error::Internal("defaults are not a table".to_string())),
        };

        for (key, value) in file_table {
            if merged.contains_key(&key) {
                merged.insert(key, value);
            } else {
                warn!(key = %key, "Ignoring unknown settings key");
            }
        }

        let keys: Vec<String> = merged.keys().cloned().collect();
        for key in keys {
            let env_name = format!("{}{}", ENV_PREFIX, key.to_uppercase());
            let Some(raw) = env_lookup(&env_name) else {
                continue;
            };
            let current = &merged[&key];
            let parsed = parse_env_value(current, &raw).ok_or_else(|| {
                Error::Config(format!("{} has invalid value '{}'", env_name, raw))
            })?;
            info!(variable = %env_name, "Settings field overridden from environment");
            merged.insert(key, parsed);
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e| Error::Config(format!("Invalid settings: {}", e)))
    }

    /// Reject settings that would break pacing or metric computation
    pub fn validate(&self) -> Result<()> {
        if self.session.trim().is_empty() {
            return Err(Error::Config("session must not be empty".to_string()));
        }
        if self.rate_limit_per_minute == 0 {
            return Err(Error::Config("rate_limit_per_minute must be > 0".to_string()));
        }
        if !self.recess_multiplier.is_finite() || self.recess_multiplier <= 0.0 {
            return Err(Error::Config(
                "recess_multiplier must be a finite number > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.free_vote_threshold) {
            return Err(Error::Config(
                "free_vote_threshold must be within [0, 1]".to_string(),
            ));
        }
        for (name, delay) in [
            ("min_delay_seconds", self.min_delay_seconds),
            ("backoff_base_secs", self.backoff_base_secs),
        ] {
            if !delay.is_finite() || delay < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be a finite, non-negative number of seconds",
                    name
                )));
            }
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be > 0".to_string()));
        }
        if self.page_size == 0 || self.progress_batch_size == 0 || self.vote_detail_concurrency == 0
        {
            return Err(Error::Config(
                "page_size, progress_batch_size and vote_detail_concurrency must be > 0"
                    .to_string(),
            ));
        }
        if self.ttl_session_votes > self.ttl_ballots {
            warn!(
                ttl_session_votes = self.ttl_session_votes,
                ttl_ballots = self.ttl_ballots,
                "Session vote TTL exceeds ballot TTL; attendance may exceed 100%"
            );
        }
        Ok(())
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_secs_f64(self.min_delay_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs_f64(self.backoff_base_secs)
    }

    /// User-Agent announced to the remote source
    pub fn user_agent(&self) -> String {
        format!("ParlCards/1.0 (research; {})", self.contact_email)
    }
}

/// Find the settings file to load, if any
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    // Priority 3: Per-user config directory
    dirs::config_dir()
        .map(|d| d.join("parlcards").join("config.toml"))
        .filter(|p| p.exists())
}

fn read_table(path: &Path) -> Result<toml::Table> {
    if !path.exists() {
        warn!(path = %path.display(), "Settings file not found, using defaults");
        return Ok(toml::Table::new());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let table = toml::from_str(&content)?;
    info!(path = %path.display(), "Loaded settings file");
    Ok(table)
}

fn parse_env_value(current: &toml::Value, raw: &str) -> Option<toml::Value> {
    let raw = raw.trim();
    match current {
        toml::Value::String(_) => Some(toml::Value::String(raw.to_string())),
        toml::Value::Integer(_) => raw.parse::<i64>().ok().map(toml::Value::Integer),
        toml::Value::Float(_) => raw.parse::<f64>().ok().map(toml::Value::Float),
        toml::Value::Boolean(_) => raw.parse::<bool>().ok().map(toml::Value::Boolean),
        _ => None,
    }
}
