//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use super::{AdmissionConfig, ClientConfig};
use std::time::Duration;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Listener settings for `volgate serve`
    pub server: ServerSettings,
    /// Server-side admission gate settings
    pub admission: AdmissionSettings,
    /// Outbound client settings
    pub client: ClientSettings,
    /// Log file location
    pub logging: LoggingSettings,
}

/// `[server]` section.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Socket address the server binds to
    pub listen: String,
    /// Base URL clients use to reach the server
    pub url: String,
}

/// `[admission]` section.
#[derive(Debug, Clone)]
pub struct AdmissionSettings {
    pub max_concurrent: usize,
    pub cleanup_interval_secs: u64,
    pub entry_ttl_secs: u64,
}

/// `[client]` section.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Token issuer
    pub user: String,
    /// Shared signing secret; unsigned calls when absent
    pub secret: Option<String>,
    pub max_retries: u32,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    pub poll_interval_ms: u64,
    pub max_concurrent_requests: usize,
}

/// `[logging]` section.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub directory: String,
    pub file: String,
}

impl ConfigFile {
    /// Builds the admission gate config from the `[admission]` section.
    pub fn admission_config(&self) -> AdmissionConfig {
        AdmissionConfig::new()
            .with_max_concurrent(self.admission.max_concurrent)
            .with_cleanup_interval(Duration::from_secs(self.admission.cleanup_interval_secs))
            .with_entry_ttl(Duration::from_secs(self.admission.entry_ttl_secs))
    }

    /// Builds the client transport config from the `[client]` section.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_max_retries(self.client.max_retries)
            .with_backoff(
                Duration::from_millis(self.client.backoff_min_ms),
                Duration::from_millis(self.client.backoff_max_ms),
            )
            .with_poll_interval(Duration::from_millis(self.client.poll_interval_ms))
            .with_max_concurrent_requests(self.client.max_concurrent_requests)
    }
}
