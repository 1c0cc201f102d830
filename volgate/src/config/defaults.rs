//! Default values and constants for all configuration settings.

use super::settings::*;

// =============================================================================
// Server defaults
// =============================================================================

/// Default listen address for `volgate serve`.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

// =============================================================================
// Admission defaults
// =============================================================================

/// Default number of async operations admitted at once.
pub const DEFAULT_MAX_CONCURRENT_OPERATIONS: usize = 10;

/// Default interval between stale-record sweeps, in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 10;

/// Default age after which an unpolled job record is purged, in seconds.
pub const DEFAULT_ENTRY_TTL_SECS: u64 = 3600;

// =============================================================================
// Client defaults
// =============================================================================

/// Default attempt budget for overload retries.
pub const DEFAULT_MAX_RETRIES: u32 = 1000;

/// Default lower bound of the randomized overload backoff, in milliseconds.
pub const DEFAULT_BACKOFF_MIN_MS: u64 = 10;

/// Default upper bound of the randomized overload backoff, in milliseconds.
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 3000;

/// Default delay between job-status polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default number of concurrently open outbound calls.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 1000;

/// Default number of redirect hops followed per call.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Default per-call timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default signed token validity, in seconds.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 300;

/// Default token issuer when no user is configured.
pub const DEFAULT_USER: &str = "admin";

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "volgate.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                listen: DEFAULT_LISTEN_ADDR.to_string(),
                url: format!("http://{}", DEFAULT_LISTEN_ADDR),
            },
            admission: AdmissionSettings {
                max_concurrent: DEFAULT_MAX_CONCURRENT_OPERATIONS,
                cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
                entry_ttl_secs: DEFAULT_ENTRY_TTL_SECS,
            },
            client: ClientSettings {
                user: DEFAULT_USER.to_string(),
                secret: None,
                max_retries: DEFAULT_MAX_RETRIES,
                backoff_min_ms: DEFAULT_BACKOFF_MIN_MS,
                backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
                poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
                max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            },
            logging: LoggingSettings {
                directory: DEFAULT_LOG_DIR.to_string(),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
