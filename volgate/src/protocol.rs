//! Wire-level vocabulary shared by the server gate and the client transport.
//!
//! Both halves of the async job contract agree on a handful of headers,
//! status codes and path shapes. They live here so neither side hardcodes
//! its own copy.

use http::{HeaderMap, Method, StatusCode};

/// Header carrying the identifier issued for a mutating request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header present with value `true` while a job is still running.
pub const PENDING_HEADER: &str = "x-pending";

/// Default path segment naming the job-status resource (`/queue/<id>`).
pub const DEFAULT_STATUS_RESOURCE: &str = "queue";

/// A read-triggered action that starts async work.
///
/// Matches `GET /<resource>/<id>/<action>`, e.g. `GET /devices/abc/resync`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncAction {
    resource: String,
    action: String,
}

impl AsyncAction {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    fn matches(&self, segments: &[&str]) -> bool {
        segments.len() >= 4 && segments[1] == self.resource && segments[3] == self.action
    }
}

/// The built-in whitelist of read-triggered async actions.
pub fn default_async_actions() -> Vec<AsyncAction> {
    vec![AsyncAction::new("devices", "resync")]
}

/// How the admission pipeline treats a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Create/delete-style request that may start a job; subject to admission.
    Mutating,
    /// Read-only request, possibly a job-status poll.
    StatusCheck,
    /// Anything else; passed through untouched.
    Other,
}

impl RequestClass {
    /// Classifies a request by method and path.
    pub fn classify(method: &Method, path: &str, actions: &[AsyncAction]) -> Self {
        if method == Method::POST || method == Method::DELETE {
            return Self::Mutating;
        }
        if method == Method::GET {
            let segments = split_path(path);
            if actions.iter().any(|a| a.matches(&segments)) {
                return Self::Mutating;
            }
            return Self::StatusCheck;
        }
        Self::Other
    }
}

/// Splits a path on `/` after trimming trailing slashes.
///
/// `"/queue/abc/"` becomes `["", "queue", "abc"]`.
fn split_path(path: &str) -> Vec<&str> {
    path.trim_end_matches('/').split('/').collect()
}

/// Extracts the job identifier from a job-status resource path.
///
/// Returns `None` unless the path has the shape `/<status_resource>/<id>`.
pub fn job_id_from_path<'a>(path: &'a str, status_resource: &str) -> Option<&'a str> {
    let segments = split_path(path);
    match segments.as_slice() {
        ["", resource, id] if *resource == status_resource && !id.is_empty() => Some(*id),
        _ => None,
    }
}

/// Builds the job-status resource path for an identifier.
pub fn job_status_path(status_resource: &str, job_id: &str) -> String {
    format!("/{}/{}", status_resource, job_id)
}

/// Returns true if a status-poll response means the job is done.
///
/// Success range 200..=204 counts, and so does 500: a job that finished in
/// error is still finished.
pub fn is_completion_status(status: StatusCode) -> bool {
    (200..=204).contains(&status.as_u16()) || status == StatusCode::INTERNAL_SERVER_ERROR
}

/// Returns true if the headers carry the pending marker.
pub fn is_pending(headers: &HeaderMap) -> bool {
    headers
        .get(PENDING_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
