//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = section.get("listen") {
            let v = v.trim();
            if v.parse::<std::net::SocketAddr>().is_err() {
                return Err(invalid("server", "listen", v, "expected host:port, e.g. 127.0.0.1:8080"));
            }
            config.server.listen = v.to_string();
        }
        if let Some(v) = section.get("url") {
            let v = v.trim();
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(invalid("server", "url", v, "must start with http:// or https://"));
            }
            config.server.url = v.trim_end_matches('/').to_string();
        }
    }

    // [admission] section
    if let Some(section) = ini.section(Some("admission")) {
        if let Some(v) = section.get("max_concurrent") {
            config.admission.max_concurrent = parse_positive("admission", "max_concurrent", v)?;
        }
        if let Some(v) = section.get("cleanup_interval_secs") {
            config.admission.cleanup_interval_secs =
                parse_positive("admission", "cleanup_interval_secs", v)?;
        }
        if let Some(v) = section.get("entry_ttl_secs") {
            config.admission.entry_ttl_secs = parse_positive("admission", "entry_ttl_secs", v)?;
        }
    }

    // [client] section
    if let Some(section) = ini.section(Some("client")) {
        if let Some(v) = section.get("user") {
            let v = v.trim();
            if !v.is_empty() {
                config.client.user = v.to_string();
            }
        }
        if let Some(v) = section.get("secret") {
            let v = v.trim();
            if !v.is_empty() {
                config.client.secret = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("max_retries") {
            config.client.max_retries = parse_positive("client", "max_retries", v)?;
        }
        if let Some(v) = section.get("backoff_min_ms") {
            config.client.backoff_min_ms = parse_number("client", "backoff_min_ms", v)?;
        }
        if let Some(v) = section.get("backoff_max_ms") {
            config.client.backoff_max_ms = parse_number("client", "backoff_max_ms", v)?;
        }
        if config.client.backoff_min_ms > config.client.backoff_max_ms {
            return Err(invalid(
                "client",
                "backoff_min_ms",
                &config.client.backoff_min_ms.to_string(),
                "must not exceed backoff_max_ms",
            ));
        }
        if let Some(v) = section.get("poll_interval_ms") {
            config.client.poll_interval_ms = parse_positive("client", "poll_interval_ms", v)?;
        }
        if let Some(v) = section.get("max_concurrent_requests") {
            config.client.max_concurrent_requests =
                parse_positive("client", "max_concurrent_requests", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = v.to_string();
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer"))
}

fn parse_positive<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + Default + PartialEq,
{
    let parsed: T = value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a positive integer"))?;
    if parsed == T::default() {
        return Err(invalid(section, key, value, "must be a positive integer"));
    }
    Ok(parsed)
}
