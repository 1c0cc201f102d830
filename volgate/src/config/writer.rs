//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let secret = config.client.secret.as_deref().unwrap_or("");

    format!(
        r#"[server]
; Address `volgate serve` binds to
listen = {}
; Base URL clients use to reach the server
url = {}

[admission]
; Mutating requests in flight plus async jobs still running (default: 10)
max_concurrent = {}
; Seconds between stale job record sweeps (default: 10)
cleanup_interval_secs = {}
; Seconds after which a job that was never polled to completion is forgotten (default: 3600)
entry_ttl_secs = {}

[client]
; Token issuer
user = {}
; Shared secret used to sign request tokens (leave empty for unsigned calls)
secret = {}
; Attempts per call while the server keeps answering 429 (default: 1000)
max_retries = {}
; Randomized backoff bounds between overload retries, milliseconds
backoff_min_ms = {}
backoff_max_ms = {}
; Delay between job status polls, milliseconds (default: 1000)
poll_interval_ms = {}
; Maximum concurrently open outbound calls (default: 1000)
max_concurrent_requests = {}

[logging]
directory = {}
file = {}
"#,
        config.server.listen,
        config.server.url,
        config.admission.max_concurrent,
        config.admission.cleanup_interval_secs,
        config.admission.entry_ttl_secs,
        config.client.user,
        secret,
        config.client.max_retries,
        config.client.backoff_min_ms,
        config.client.backoff_max_ms,
        config.client.poll_interval_ms,
        config.client.max_concurrent_requests,
        config.logging.directory,
        config.logging.file,
    )
}
