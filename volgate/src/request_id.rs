//! Request identifier issuer.
//!
//! Every mutating request gets a fresh opaque identifier before the
//! downstream handler runs. The identifier rides in the request extensions,
//! so the handler can use it as the job-status path segment and the
//! admission gate can record the job under the same value afterwards.

use crate::protocol::{default_async_actions, AsyncAction, RequestClass, REQUEST_ID_HEADER};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::HeaderValue;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identifier for a mutating request and the job it starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wraps an existing identifier (used by tests and replayed requests).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues request identifiers for requests that may start async work.
#[derive(Debug, Clone)]
pub struct RequestIdIssuer {
    actions: Vec<AsyncAction>,
}

impl RequestIdIssuer {
    pub fn new(actions: Vec<AsyncAction>) -> Self {
        Self { actions }
    }

    /// Attaches a fresh identifier to the request if it is mutating.
    ///
    /// Returns the identifier that was attached, if any.
    pub fn attach(&self, request: &mut Request) -> Option<RequestId> {
        let class = RequestClass::classify(request.method(), request.uri().path(), &self.actions);
        if class != RequestClass::Mutating {
            return None;
        }
        let id = RequestId::generate();
        request.extensions_mut().insert(id.clone());
        tracing::trace!(request_id = %id, path = request.uri().path(), "Issued request id");
        Some(id)
    }
}

impl Default for RequestIdIssuer {
    fn default() -> Self {
        Self::new(default_async_actions())
    }
}

/// Middleware that issues the identifier and echoes it on the response.
pub async fn issue_request_id(
    State(issuer): State<Arc<RequestIdIssuer>>,
    mut request: Request,
    next: Next,
) -> Response {
    let issued = issuer.attach(&mut request);
    let mut response = next.run(request).await;

    if let Some(id) = issued {
        if !response.headers().contains_key(REQUEST_ID_HEADER) {
            if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::collections::HashSet;

    fn request(method: &str, path: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| RequestId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_generated_id_is_path_safe() {
        let id = RequestId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_attach_on_mutating_request() {
        let issuer = RequestIdIssuer::default();
        let mut req = request("POST", "/volumes");

        let id = issuer.attach(&mut req).expect("POST should get an id");
        assert_eq!(req.extensions().get::<RequestId>(), Some(&id));
    }

    #[test]
    fn test_attach_on_whitelisted_action() {
        let issuer = RequestIdIssuer::default();
        let mut req = request("GET", "/devices/d1/resync");
        assert!(issuer.attach(&mut req).is_some());
    }

    #[test]
    fn test_no_id_for_reads() {
        let issuer = RequestIdIssuer::default();
        let mut req = request("GET", "/queue/abc");

        assert!(issuer.attach(&mut req).is_none());
        assert!(req.extensions().get::<RequestId>().is_none());
    }
}
