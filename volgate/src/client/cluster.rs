//! High-level client for a volgate-fronted server.

use super::error::ClientError;
use super::poller::JobPoller;
use super::retry::RetryPolicy;
use super::throttle::OutboundThrottle;
use super::transport::{HttpTransport, OutboundRequest, ReqwestTransport, TransportResponse};
use crate::auth::TokenSigner;
use crate::config::ClientConfig;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{Method, StatusCode};
use reqwest::Url;
use tracing::debug;

/// Client for the async job protocol.
///
/// Every exchange takes an outbound throttle slot and is signed for its
/// exact method and path. Overload responses are retried with jittered
/// backoff, and `202 Accepted` responses are followed to completion by
/// polling the job-status resource named in `Location`.
///
/// # Example
///
/// ```ignore
/// use volgate::client::ClusterClient;
/// use volgate::config::ClientConfig;
///
/// let client = ClusterClient::new("http://127.0.0.1:8080", "admin", "secret", ClientConfig::default())?;
/// let volume = client.create("/volumes", r#"{"size":10}"#.into()).await?;
/// println!("{}", volume.text());
/// ```
pub struct ClusterClient<T = ReqwestTransport> {
    base: Url,
    transport: T,
    signer: Option<TokenSigner>,
    throttle: OutboundThrottle,
    retry: RetryPolicy,
    poller: JobPoller,
    max_redirects: usize,
}

impl ClusterClient<ReqwestTransport> {
    /// Creates a client that signs every request as `user`.
    pub fn new(
        base_url: &str,
        user: &str,
        secret: &str,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let signer = TokenSigner::new(user, secret, config.token_ttl());
        Self::with_transport(base_url, ReqwestTransport::new(&config)?, Some(signer), config)
    }

    /// Creates a client that sends no `Authorization` header.
    pub fn without_auth(base_url: &str, config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_transport(base_url, ReqwestTransport::new(&config)?, None, config)
    }
}

impl<T: HttpTransport> ClusterClient<T> {
    /// Creates a client over an arbitrary transport.
    pub fn with_transport(
        base_url: &str,
        transport: T,
        signer: Option<TokenSigner>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base,
            transport,
            signer,
            throttle: OutboundThrottle::new(config.max_concurrent_requests()),
            retry: RetryPolicy::from_config(&config),
            poller: JobPoller::new(config.poll_interval()),
            max_redirects: config.max_redirects(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn throttle(&self) -> &OutboundThrottle {
        &self.throttle
    }

    /// Resolves `path` against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(|e| ClientError::InvalidUrl {
            url: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Checks that the server is reachable.
    pub async fn hello(&self) -> Result<(), ClientError> {
        let response = self.retrying_send(Method::GET, "/hello", Bytes::new()).await?;
        if response.status != StatusCode::OK {
            return Err(unexpected(response));
        }
        Ok(())
    }

    /// POSTs `body` to `path` and waits for the job it starts, if any.
    pub async fn create(&self, path: &str, body: Bytes) -> Result<TransportResponse, ClientError> {
        let response = self.retrying_send(Method::POST, path, body).await?;
        self.complete(response).await
    }

    /// DELETEs `path` and waits for the job it starts, if any.
    pub async fn delete(&self, path: &str) -> Result<TransportResponse, ClientError> {
        let response = self.retrying_send(Method::DELETE, path, Bytes::new()).await?;
        self.complete(response).await
    }

    /// GETs `path`. Read-triggered async actions are waited on as well.
    pub async fn get(&self, path: &str) -> Result<TransportResponse, ClientError> {
        let response = self.retrying_send(Method::GET, path, Bytes::new()).await?;
        self.complete(response).await
    }

    /// Performs one throttled, signed exchange, following redirects.
    ///
    /// The throttle slot is held until the final hop returns. Each hop is
    /// signed for its own method and path.
    pub async fn send(&self, mut request: OutboundRequest) -> Result<TransportResponse, ClientError> {
        let _permit = self
            .throttle
            .acquire()
            .await
            .map_err(|_| ClientError::Transport("outbound throttle closed".to_string()))?;

        let mut hops = 0;
        loop {
            self.sign(&mut request)?;
            let response = self.transport.execute(request.clone()).await?;
            if !response.is_redirect() {
                return Ok(response);
            }

            hops += 1;
            if hops > self.max_redirects {
                return Err(ClientError::TooManyRedirects {
                    limit: self.max_redirects,
                });
            }
            let location = response.location().ok_or(ClientError::MissingLocation)?;
            let next = request.url.join(location).map_err(|e| ClientError::InvalidUrl {
                url: location.to_string(),
                reason: e.to_string(),
            })?;
            debug!(
                from = request.url.path(),
                to = next.path(),
                status = response.status.as_u16(),
                "Following redirect"
            );

            let switch_to_get = response.status == StatusCode::SEE_OTHER
                || (request.method == Method::POST
                    && matches!(
                        response.status,
                        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND
                    ));
            if switch_to_get {
                request.method = Method::GET;
                request.body = Bytes::new();
            }
            request.url = next;
        }
    }

    /// Sends with overload retry, rebuilding the request from `payload`
    /// on every attempt.
    pub async fn retrying_send(
        &self,
        method: Method,
        path: &str,
        payload: Bytes,
    ) -> Result<TransportResponse, ClientError> {
        let url = self.url(path)?;
        self.retry
            .run(move |_| {
                let request =
                    OutboundRequest::new(method.clone(), url.clone()).with_body(payload.clone());
                self.send(request)
            })
            .await
    }

    /// Polls the job named by an accepted response's `Location` until it
    /// is no longer pending, and returns the final response.
    pub async fn wait_for_job(
        &self,
        accepted: &TransportResponse,
    ) -> Result<TransportResponse, ClientError> {
        let location = accepted.location().ok_or(ClientError::MissingLocation)?;
        debug!(location, request_id = accepted.request_id(), "Waiting for job");
        self.poller
            .wait(move || self.retrying_send(Method::GET, location, Bytes::new()))
            .await
    }

    async fn complete(&self, response: TransportResponse) -> Result<TransportResponse, ClientError> {
        if response.status == StatusCode::ACCEPTED {
            let done = self.wait_for_job(&response).await?;
            return finished(done);
        }
        if response.status.is_success() {
            return Ok(response);
        }
        Err(unexpected(response))
    }

    fn sign(&self, request: &mut OutboundRequest) -> Result<(), ClientError> {
        match &self.signer {
            Some(signer) => {
                let value = signer.authorization(&request.method, request.url.path())?;
                request.headers.insert(AUTHORIZATION, value);
            }
            None => {
                request.headers.remove(AUTHORIZATION);
            }
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for ClusterClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterClient")
            .field("base", &self.base.as_str())
            .field("signer", &self.signer)
            .field("throttle", &self.throttle)
            .field("retry", &self.retry)
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

/// Maps the last response of a finished job to the call's outcome.
fn finished(response: TransportResponse) -> Result<TransportResponse, ClientError> {
    if response.status.is_success() {
        return Ok(response);
    }
    if response.status == StatusCode::INTERNAL_SERVER_ERROR {
        return Err(ClientError::JobFailed {
            status: response.status,
            message: response.text(),
        });
    }
    Err(unexpected(response))
}

fn unexpected(response: TransportResponse) -> ClientError {
    ClientError::UnexpectedStatus {
        status: response.status,
        message: response.text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenVerifier;
    use crate::protocol::PENDING_HEADER;
    use http::header::LOCATION;
    use http::{HeaderName, HeaderValue};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    const SECRET: &str = "s3cret";

    /// Replays scripted responses and records every request.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<TransportResponse>>,
        seen: Mutex<Vec<OutboundRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<TransportResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpTransport for ScriptedTransport {
        async fn execute(&self, request: OutboundRequest) -> Result<TransportResponse, ClientError> {
            self.seen.lock().push(request);
            self.responses
                .lock()
                .pop_front()
                .ok_or_else(|| ClientError::Transport("script exhausted".to_string()))
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new()
            .with_max_retries(5)
            .with_backoff(Duration::from_millis(10), Duration::from_millis(20))
            .with_poll_interval(Duration::from_millis(100))
            .with_max_redirects(2)
    }

    fn client(responses: Vec<TransportResponse>) -> ClusterClient<ScriptedTransport> {
        let signer = TokenSigner::new("admin", SECRET, Duration::from_secs(300));
        ClusterClient::with_transport(
            "http://storage.local:8080",
            ScriptedTransport::new(responses),
            Some(signer),
            config(),
        )
        .unwrap()
    }

    fn accepted(location: &'static str) -> TransportResponse {
        TransportResponse::new(StatusCode::ACCEPTED)
            .with_header(LOCATION, HeaderValue::from_static(location))
    }

    fn pending() -> TransportResponse {
        TransportResponse::new(StatusCode::OK).with_header(
            HeaderName::from_static(PENDING_HEADER),
            HeaderValue::from_static("true"),
        )
    }

    fn redirect(status: StatusCode, location: &'static str) -> TransportResponse {
        TransportResponse::new(status).with_header(LOCATION, HeaderValue::from_static(location))
    }

    fn seen(client: &ClusterClient<ScriptedTransport>) -> Vec<(Method, String)> {
        client
            .transport
            .seen
            .lock()
            .iter()
            .map(|r| (r.method.clone(), r.path().to_string()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_polls_until_done() {
        let client = client(vec![
            accepted("/queue/abc"),
            pending(),
            pending(),
            TransportResponse::new(StatusCode::OK).with_body("volume abc"),
        ]);

        let response = client.create("/volumes", Bytes::from_static(b"{}")).await.unwrap();

        assert_eq!(response.text(), "volume abc");
        assert_eq!(
            seen(&client),
            vec![
                (Method::POST, "/volumes".to_string()),
                (Method::GET, "/queue/abc".to_string()),
                (Method::GET, "/queue/abc".to_string()),
                (Method::GET, "/queue/abc".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_exchange_is_signed_for_its_own_path() {
        let client = client(vec![
            accepted("/queue/abc"),
            redirect(StatusCode::SEE_OTHER, "/volumes/abc"),
            TransportResponse::new(StatusCode::OK),
        ]);
        client.create("/volumes", Bytes::from_static(b"{}")).await.unwrap();

        let verifier = TokenVerifier::new().with_key("admin", SECRET);
        let requests = client.transport.seen.lock().clone();
        assert_eq!(requests.len(), 3);
        for request in &requests {
            verifier
                .verify_headers(&request.headers, &request.method, request.path())
                .unwrap();
        }
        assert_eq!(requests[2].path(), "/volumes/abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_payload_replayed_after_overload() {
        let client = client(vec![
            TransportResponse::new(StatusCode::TOO_MANY_REQUESTS),
            TransportResponse::new(StatusCode::TOO_MANY_REQUESTS),
            TransportResponse::new(StatusCode::CREATED).with_body("made"),
        ]);

        let response = client
            .create("/volumes", Bytes::from_static(b"{\"size\":1}"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        let requests = client.transport.seen.lock().clone();
        assert_eq!(requests.len(), 3);
        for request in requests {
            assert_eq!(&request.body[..], b"{\"size\":1}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_see_other_switches_to_get() {
        let client = client(vec![
            redirect(StatusCode::SEE_OTHER, "/volumes/1"),
            TransportResponse::new(StatusCode::OK),
        ]);
        client.create("/volumes", Bytes::from_static(b"{}")).await.unwrap();

        let requests = client.transport.seen.lock().clone();
        assert_eq!(requests[1].method, Method::GET);
        assert!(requests[1].body.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_too_many_redirects() {
        let client = client(vec![
            redirect(StatusCode::TEMPORARY_REDIRECT, "/a"),
            redirect(StatusCode::TEMPORARY_REDIRECT, "/b"),
            redirect(StatusCode::TEMPORARY_REDIRECT, "/c"),
        ]);
        let err = client.get("/start").await.unwrap_err();
        assert!(matches!(err, ClientError::TooManyRedirects { limit: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_without_location() {
        let client = client(vec![TransportResponse::new(StatusCode::ACCEPTED)]);
        let err = client.delete("/volumes/abc").await.unwrap_err();
        assert!(matches!(err, ClientError::MissingLocation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_surfaces_job_failed() {
        let client = client(vec![
            accepted("/queue/abc"),
            TransportResponse::new(StatusCode::INTERNAL_SERVER_ERROR).with_body("no space"),
        ]);
        let err = client.delete("/volumes/abc").await.unwrap_err();
        match err {
            ClientError::JobFailed { message, .. } => assert_eq!(message, "no space"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_status() {
        let client = client(vec![
            TransportResponse::new(StatusCode::BAD_REQUEST).with_body("bad size"),
        ]);
        let err = client.create("/volumes", Bytes::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnexpectedStatus { status: StatusCode::BAD_REQUEST, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_signer_sends_no_authorization() {
        let client = ClusterClient::with_transport(
            "http://storage.local:8080",
            ScriptedTransport::new(vec![TransportResponse::new(StatusCode::OK)]),
            None,
            config(),
        )
        .unwrap();
        client.hello().await.unwrap();

        let requests = client.transport.seen.lock().clone();
        assert!(requests[0].headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_released_after_each_call() {
        let client = client(vec![
            TransportResponse::new(StatusCode::OK),
            TransportResponse::new(StatusCode::OK),
        ]);
        client.hello().await.unwrap();
        client.hello().await.unwrap();

        assert_eq!(client.throttle().in_flight(), 0);
        assert_eq!(client.throttle().peak_in_flight(), 1);
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ClusterClient::with_transport(
            "not a url",
            ScriptedTransport::new(vec![]),
            None,
            config(),
        );
        assert!(matches!(result, Err(ClientError::InvalidUrl { .. })));
    }
}
