//! Remote API access
//!
//! One [`RateLimitedClient`] is shared by every fetch path so request pacing
//! stays globally consistent.

pub mod api_client;
pub mod rate_limiter;

pub use api_client::{offset_from_next_url, ClientConfig, FetchError, RateLimitedClient};
pub use rate_limiter::RateLimiter;
