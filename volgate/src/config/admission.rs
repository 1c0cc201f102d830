//! Admission gate configuration.

use super::defaults::{
    DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_ENTRY_TTL_SECS, DEFAULT_MAX_CONCURRENT_OPERATIONS,
};
use crate::protocol::{default_async_actions, AsyncAction, DEFAULT_STATUS_RESOURCE};
use std::time::Duration;

/// Configuration for the [`AdmissionController`](crate::admission::AdmissionController).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use volgate::config::AdmissionConfig;
///
/// let config = AdmissionConfig::new()
///     .with_max_concurrent(2)
///     .with_cleanup_interval(Duration::from_secs(1))
///     .with_entry_ttl(Duration::from_secs(5));
///
/// assert_eq!(config.max_concurrent(), 2);
/// assert_eq!(config.status_resource(), "queue");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Capacity shared by in-flight mutating requests and live jobs
    max_concurrent: usize,
    /// How often the sweeper scans for stale records
    cleanup_interval: Duration,
    /// Age after which an unpolled record is purged
    entry_ttl: Duration,
    /// Path segment naming the job-status resource
    status_resource: String,
    /// Read-triggered actions that start async work
    async_actions: Vec<AsyncAction>,
}

impl AdmissionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the admission capacity.
    ///
    /// Values below 1 are raised to 1; a gate that admits nothing is useless.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Set the sweeper tick interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set the stale-record TTL.
    pub fn with_entry_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Set the path segment of the job-status resource.
    pub fn with_status_resource(mut self, resource: impl Into<String>) -> Self {
        self.status_resource = resource.into();
        self
    }

    /// Replace the whitelist of read-triggered async actions.
    pub fn with_async_actions(mut self, actions: Vec<AsyncAction>) -> Self {
        self.async_actions = actions;
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    pub fn entry_ttl(&self) -> Duration {
        self.entry_ttl
    }

    pub fn status_resource(&self) -> &str {
        &self.status_resource
    }

    pub fn async_actions(&self) -> &[AsyncAction] {
        &self.async_actions
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT_OPERATIONS,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            entry_ttl: Duration::from_secs(DEFAULT_ENTRY_TTL_SECS),
            status_resource: DEFAULT_STATUS_RESOURCE.to_string(),
            async_actions: default_async_actions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AdmissionConfig::default();
        assert_eq!(config.max_concurrent(), DEFAULT_MAX_CONCURRENT_OPERATIONS);
        assert_eq!(
            config.cleanup_interval(),
            Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS)
        );
        assert_eq!(config.entry_ttl(), Duration::from_secs(DEFAULT_ENTRY_TTL_SECS));
        assert_eq!(config.status_resource(), DEFAULT_STATUS_RESOURCE);
        assert_eq!(config.async_actions(), default_async_actions().as_slice());
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let config = AdmissionConfig::new().with_max_concurrent(0);
        assert_eq!(config.max_concurrent(), 1);
    }

    #[test]
    fn test_builder_chain() {
        let config = AdmissionConfig::new()
            .with_max_concurrent(3)
            .with_cleanup_interval(Duration::from_millis(250))
            .with_entry_ttl(Duration::from_secs(2))
            .with_status_resource("jobs")
            .with_async_actions(vec![]);

        assert_eq!(config.max_concurrent(), 3);
        assert_eq!(config.cleanup_interval(), Duration::from_millis(250));
        assert_eq!(config.entry_ttl(), Duration::from_secs(2));
        assert_eq!(config.status_resource(), "jobs");
        assert!(config.async_actions().is_empty());
    }
}
