//! parlcards-core library interface
//!
//! Legislator statistics over a rate-limited remote source:
//! - [`services`]: paced, retrying API client
//! - [`cache`]: TTL file cache with stale reads and recess-aware TTLs
//! - [`fetchers`]: cache-first fetch per resource type
//! - [`metrics`]: attendance, party loyalty, bills, speeches
//! - [`rankings`]: percentiles, comparison groups, histograms
//! - [`warmup`]: resumable population-wide cache warmup
//! - [`serving`]: read-only accessors for the presentation layer

pub mod cache;
pub mod fetchers;
pub mod metrics;
pub mod models;
pub mod rankings;
pub mod serving;
pub mod services;
pub mod warmup;

pub use fetchers::Fetchers;
pub use serving::{CardService, CardView, ServeError};
pub use services::{FetchError, RateLimitedClient};
pub use warmup::{WarmupHandle, WarmupOptions, WarmupOrchestrator};
