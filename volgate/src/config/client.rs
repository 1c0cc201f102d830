//! Outbound client configuration.

use super::defaults::{
    DEFAULT_BACKOFF_MAX_MS, DEFAULT_BACKOFF_MIN_MS, DEFAULT_MAX_CONCURRENT_REQUESTS,
    DEFAULT_MAX_REDIRECTS, DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TOKEN_TTL_SECS,
};
use std::time::Duration;

/// Configuration for the [`ClusterClient`](crate::client::ClusterClient).
///
/// Groups the throttle, retry, polling and signing parameters.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use volgate::config::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_max_retries(10)
///     .with_backoff(Duration::from_millis(50), Duration::from_millis(500))
///     .with_poll_interval(Duration::from_millis(200));
///
/// assert_eq!(config.max_retries(), 10);
/// assert_eq!(config.backoff_max(), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Attempt budget for a call that keeps getting overload responses
    max_retries: u32,
    /// Lower bound of the randomized backoff
    backoff_min: Duration,
    /// Upper bound of the randomized backoff
    backoff_max: Duration,
    /// Delay between job-status polls
    poll_interval: Duration,
    /// Maximum concurrently open outbound calls
    max_concurrent_requests: usize,
    /// Redirect hops followed per call
    max_redirects: usize,
    /// Timeout applied to each individual HTTP exchange
    request_timeout: Duration,
    /// Validity window of each signed token
    token_ttl: Duration,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overload retry budget. At least one attempt is always made.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// Set the jitter bounds for overload backoff.
    ///
    /// Bounds given in the wrong order are swapped.
    pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.backoff_min = min.min(max);
        self.backoff_max = min.max(max);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the outbound concurrency limit (minimum 1).
    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max.max(1);
        self
    }

    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff_min(&self) -> Duration {
        self.backoff_min
    }

    pub fn backoff_max(&self) -> Duration {
        self.backoff_max
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_min: Duration::from_millis(DEFAULT_BACKOFF_MIN_MS),
            backoff_max: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.max_retries(), DEFAULT_MAX_RETRIES);
        assert_eq!(config.backoff_min(), Duration::from_millis(DEFAULT_BACKOFF_MIN_MS));
        assert_eq!(config.backoff_max(), Duration::from_millis(DEFAULT_BACKOFF_MAX_MS));
        assert_eq!(
            config.max_concurrent_requests(),
            DEFAULT_MAX_CONCURRENT_REQUESTS
        );
        assert_eq!(config.token_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_bounds_are_ordered() {
        let config =
            ClientConfig::new().with_backoff(Duration::from_secs(2), Duration::from_millis(5));
        assert_eq!(config.backoff_min(), Duration::from_millis(5));
        assert_eq!(config.backoff_max(), Duration::from_secs(2));
    }

    #[test]
    fn test_minimums() {
        let config = ClientConfig::new()
            .with_max_retries(0)
            .with_max_concurrent_requests(0);
        assert_eq!(config.max_retries(), 1);
        assert_eq!(config.max_concurrent_requests(), 1);
    }

    #[test]
    fn test_copy_semantics() {
        let config1 = ClientConfig::new().with_max_redirects(3);
        let config2 = config1;
        assert_eq!(config1, config2);
    }
}
