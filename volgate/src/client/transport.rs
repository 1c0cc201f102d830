//! HTTP transport abstraction for testability.
//!
//! [`ClusterClient`](super::ClusterClient) speaks to the server through
//! [`HttpTransport`], one exchange per call with no redirect following.
//! Production code uses [`ReqwestTransport`]; tests script responses.

use super::error::ClientError;
use crate::config::ClientConfig;
use crate::protocol::{is_pending, REQUEST_ID_HEADER};
use bytes::Bytes;
use http::header::LOCATION;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::future::Future;
use tracing::{trace, warn};

/// A single outbound HTTP exchange.
///
/// The body is held as [`Bytes`] so the same payload can be sent again on
/// every attempt.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: reqwest::Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundRequest {
    pub fn new(method: Method, url: reqwest::Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Path component of the target URL.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// Response to an [`OutboundRequest`], body fully read.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// True if the response carries the job pending marker.
    pub fn is_pending(&self) -> bool {
        is_pending(&self.headers)
    }

    /// The `Location` header, if present and valid UTF-8.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// The request id echoed by the server.
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// True for 301, 302, 303, 307 and 308.
    pub fn is_redirect(&self) -> bool {
        matches!(
            self.status,
            StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::SEE_OTHER
                | StatusCode::TEMPORARY_REDIRECT
                | StatusCode::PERMANENT_REDIRECT
        )
    }
}

/// Trait for performing one HTTP exchange.
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and reads the whole response.
    ///
    /// Redirects are returned as-is, not followed.
    fn execute(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<TransportResponse, ClientError>> + Send;
}

/// Real transport implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with the configured per-request timeout.
    ///
    /// Automatic redirects are disabled: every hop must be re-signed, so
    /// the client follows them itself.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(config.max_concurrent_requests().min(128))
            .tcp_nodelay(true)
            .user_agent(concat!("volgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<TransportResponse, ClientError> {
        trace!(method = %request.method, url = %request.url, "HTTP request starting");

        let url = request.url.clone();
        let response = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                warn!(
                    url = %url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                ClientError::from(e)
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            warn!(url = %url, error = %e, "Failed to read response body");
            ClientError::from(e)
        })?;

        trace!(
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            "HTTP response received"
        );
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PENDING_HEADER;

    #[test]
    fn test_response_helpers() {
        let response = TransportResponse::new(StatusCode::ACCEPTED)
            .with_header(LOCATION, HeaderValue::from_static("/queue/abc"))
            .with_header(
                HeaderName::from_static(PENDING_HEADER),
                HeaderValue::from_static("true"),
            )
            .with_body("working");

        assert_eq!(response.location(), Some("/queue/abc"));
        assert!(response.is_pending());
        assert_eq!(response.text(), "working");
        assert!(!response.is_redirect());
    }

    #[test]
    fn test_redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            let response = TransportResponse::new(StatusCode::from_u16(status).unwrap());
            assert!(response.is_redirect(), "{status} should be a redirect");
        }
        assert!(!TransportResponse::new(StatusCode::NOT_MODIFIED).is_redirect());
    }

    #[test]
    fn test_request_path() {
        let url = reqwest::Url::parse("http://localhost:8080/volumes?x=1").unwrap();
        let request = OutboundRequest::new(Method::POST, url).with_body(Bytes::from_static(b"{}"));
        assert_eq!(request.path(), "/volumes");
        assert_eq!(request.body.len(), 2);
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new(&ClientConfig::default()).is_ok());
    }
}
