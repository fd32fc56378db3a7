//! Rate-limited client for the OpenParliament API
//!
//! Every request passes through one shared [`RateLimiter`], then is retried
//! according to the response class:
//! - 429: sleep for `Retry-After` (default 60s), retry
//! - 502/503/504: exponential backoff `base * 2^attempt`, retry
//! - timeout: linear backoff `base * (attempt + 1)`, fatal on the last attempt
//! - 404: fatal [`FetchError::NotFound`]
//! - any other non-2xx: fatal, no retry

use super::rate_limiter::RateLimiter;
use parlcards_common::Settings;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Fetch client errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Failed after {attempts} attempts: {path}")]
    Exhausted { path: String, attempts: u32 },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// True when the remote source says the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }

    /// True when a later retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_) | FetchError::Exhausted { .. } | FetchError::Network(_)
        )
    }
}

/// Outcome of a single request attempt
#[derive(Debug)]
enum Attempt {
    Success(Value),
    Retry { reason: String, wait: Duration },
    Fatal(FetchError),
}

/// Client pacing and retry configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub requests_per_minute: u32,
    pub min_delay: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub page_size: u32,
}

impl ClientConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.api_base_url.clone(),
            user_agent: settings.user_agent(),
            timeout: settings.request_timeout(),
            requests_per_minute: settings.rate_limit_per_minute,
            min_delay: settings.min_delay(),
            max_attempts: settings.max_attempts,
            backoff_base: settings.backoff_base(),
            page_size: settings.page_size,
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Default, Deserialize)]
struct Page {
    #[serde(default)]
    objects: Vec<Value>,
    #[serde(default)]
    pagination: Option<PageInfo>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PageInfo {
    #[serde(default)]
    next_url: Option<String>,
}

/// Rate-limited, retrying API client
///
/// Share one instance (behind `Arc`) between the warmup task and on-demand
/// callers so all pacing decisions see the same request history.
pub struct RateLimitedClient {
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
    config: ClientConfig,
    requests: AtomicU64,
}

impl RateLimitedClient {
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(config.requests_per_minute, config.min_delay),
            config,
            requests: AtomicU64::new(0),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        Self::new(ClientConfig::from_settings(settings))
    }

    /// Number of requests dispatched so far (retries included)
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Fetch a single endpoint with pacing and retry
    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let owned: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.get_with(path, &owned).await
    }

    async fn get_with(&self, path: &str, params: &[(String, String)]) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 0..max_attempts {
            self.rate_limiter.wait().await;
            self.requests.fetch_add(1, Ordering::Relaxed);

            let is_last = attempt + 1 == max_attempts;
            match self.attempt_once(&url, path, params, attempt, is_last).await {
                Attempt::Success(value) => return Ok(value),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Retry { reason, wait } => {
                    tracing::warn!(
                        path = %path,
                        attempt = attempt + 1,
                        max_attempts,
                        reason = %reason,
                        wait = ?wait,
                        "Retryable API failure"
                    );
                    if !is_last {
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            path: path.to_string(),
            attempts: max_attempts,
        })
    }

    async fn attempt_once(
        &self,
        url: &str,
        path: &str,
        params: &[(String, String)],
        attempt: u32,
        is_last: bool,
    ) -> Attempt {
        tracing::debug!(path = %path, attempt = attempt + 1, "Querying API");

        let response = match self.http_client.get(url).query(params).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                if is_last {
                    return Attempt::Fatal(FetchError::Timeout(path.to_string()));
                }
                return Attempt::Retry {
                    reason: "timeout".to_string(),
                    wait: linear_backoff(self.config.backoff_base, attempt),
                };
            }
            Err(e) => return Attempt::Fatal(FetchError::Network(e.to_string())),
        };

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = retry_after(response.headers());
            return Attempt::Retry {
                reason: "429 Too Many Requests".to_string(),
                wait,
            };
        }

        if matches!(
            status,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        ) {
            return Attempt::Retry {
                reason: format!("{} server error", status.as_u16()),
                wait: exponential_backoff(self.config.backoff_base, attempt),
            };
        }

        if status == StatusCode::NOT_FOUND {
            return Attempt::Fatal(FetchError::NotFound(path.to_string()));
        }

        if !status.is_success() {
            return Attempt::Fatal(FetchError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        match response.json::<Value>().await {
            Ok(value) => Attempt::Success(value),
            Err(e) if e.is_timeout() && !is_last => Attempt::Retry {
                reason: "timeout reading body".to_string(),
                wait: linear_backoff(self.config.backoff_base, attempt),
            },
            Err(e) if e.is_timeout() => Attempt::Fatal(FetchError::Timeout(path.to_string())),
            Err(e) => Attempt::Fatal(FetchError::Parse(e.to_string())),
        }
    }

    /// Fetch every page of a listing endpoint and merge the `objects` arrays
    pub async fn paginate(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Value>, FetchError> {
        let mut base: Vec<(String, String)> = params
            .iter()
            .filter(|(k, _)| *k != "offset" && *k != "limit")
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        base.push(("limit".to_string(), self.config.page_size.to_string()));

        let mut results = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut page_params = base.clone();
            page_params.push(("offset".to_string(), offset.to_string()));

            let value = self.get_with(path, &page_params).await?;
            let page: Page =
                serde_json::from_value(value).map_err(|e| FetchError::Parse(e.to_string()))?;

            let page_len = page.objects.len();
            results.extend(page.objects);

            let next = page
                .pagination
                .and_then(|p| p.next_url)
                .or(page.next)
                .filter(|n| !n.is_empty());

            let Some(next) = next else {
                break;
            };
            if page_len == 0 {
                break;
            }

            match offset_from_next_url(&next) {
                // A non-advancing offset would loop forever
                Some(next_offset) if next_offset > offset => offset = next_offset,
                _ => {
                    tracing::warn!(
                        path = %path,
                        next = %next,
                        "Unusable next-page link, stopping pagination"
                    );
                    break;
                }
            }
        }

        tracing::debug!(path = %path, items = results.len(), "Pagination complete");
        Ok(results)
    }
}

fn retry_after(headers: &HeaderMap) -> Duration {
    let secs = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    Duration::from_secs(secs)
}

fn exponential_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16))
}

fn linear_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt.saturating_add(1))
}

/// Extract the `offset` query parameter from a next-page link
///
/// Accepts absolute URLs and server-relative paths.
pub fn offset_from_next_url(next: &str) -> Option<u64> {
    let base = url::Url::parse("http://next-page.invalid/").ok()?;
    let url = base.join(next).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "offset")
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_from_relative_next_url() {
        assert_eq!(
            offset_from_next_url("/politicians/?current=True&limit=100&offset=200"),
            Some(200)
        );
    }

    #[test]
    fn test_offset_from_absolute_next_url() {
        assert_eq!(
            offset_from_next_url("https://api.openparliament.ca/votes/?offset=100&limit=100"),
            Some(100)
        );
    }

    #[test]
    fn test_offset_missing_or_malformed() {
        assert_eq!(offset_from_next_url("/votes/?limit=100"), None);
        assert_eq!(offset_from_next_url("/votes/?offset=abc"), None);
    }

    #[test]
    fn test_backoff_schedules() {
        let base = Duration::from_secs(5);
        assert_eq!(exponential_backoff(base, 0), Duration::from_secs(5));
        assert_eq!(exponential_backoff(base, 1), Duration::from_secs(10));
        assert_eq!(exponential_backoff(base, 3), Duration::from_secs(40));
        assert_eq!(linear_backoff(base, 0), Duration::from_secs(5));
        assert_eq!(linear_backoff(base, 2), Duration::from_secs(15));
    }

    #[test]
    fn test_retry_after_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), Duration::from_secs(60));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Duration::from_secs(7));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after(&headers), Duration::from_secs(60));
    }

    #[test]
    fn test_error_classification() {
        assert!(FetchError::NotFound("/x/".into()).is_not_found());
        assert!(!FetchError::NotFound("/x/".into()).is_transient());
        assert!(FetchError::Timeout("/x/".into()).is_transient());
        assert!(!FetchError::Status { status: 400, path: "/x/".into() }.is_transient());
    }

    #[test]
    fn test_client_creation() {
        let client = RateLimitedClient::from_settings(&Settings::default());
        assert!(client.is_ok());
        assert_eq!(client.unwrap().request_count(), 0);
    }
}
