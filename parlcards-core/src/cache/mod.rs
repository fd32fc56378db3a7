//! On-disk cache: key namespace, TTL store and recess-aware TTL policy

pub mod keys;
pub mod recess;
pub mod store;

pub use keys::{is_safe_component, CacheKey};
pub use recess::{effective_ttl, RecessCalendar, RecessWindow, TtlPolicy};
pub use store::{CacheRecord, CacheStore};
