//! Waiting for an async job to finish.

use super::error::ClientError;
use super::transport::TransportResponse;
use http::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::trace;

/// Polls a job-status resource until the pending marker goes away.
///
/// There is no iteration bound. Wrap the call in `tokio::time::timeout`
/// to give up after a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPoller {
    interval: Duration,
}

impl JobPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Calls `poll` repeatedly until a response without the pending marker.
    ///
    /// A pending response with any status other than 200 ends the wait with
    /// [`ClientError::JobFailed`]. The first non-pending response is
    /// returned as-is.
    pub async fn wait<F, Fut>(&self, mut poll: F) -> Result<TransportResponse, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<TransportResponse, ClientError>>,
    {
        let mut polls: u64 = 0;
        loop {
            let response = poll().await?;
            polls += 1;

            if !response.is_pending() {
                trace!(polls, status = response.status.as_u16(), "Job finished");
                return Ok(response);
            }
            if response.status != StatusCode::OK {
                return Err(ClientError::JobFailed {
                    status: response.status,
                    message: response.text(),
                });
            }

            trace!(polls, interval_ms = self.interval.as_millis() as u64, "Job still pending");
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PENDING_HEADER;
    use http::{HeaderName, HeaderValue};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn pending(status: StatusCode) -> TransportResponse {
        TransportResponse::new(status).with_header(
            HeaderName::from_static(PENDING_HEADER),
            HeaderValue::from_static("true"),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_marker_clears() {
        let poller = JobPoller::new(Duration::from_millis(500));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let response = poller
            .wait(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 4 {
                        Ok(pending(StatusCode::OK))
                    } else {
                        Ok(TransportResponse::new(StatusCode::OK).with_body("volume-1"))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(response.text(), "volume-1");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_with_error_status_fails() {
        let poller = JobPoller::new(Duration::from_millis(10));

        let err = poller
            .wait(|| async {
                Ok(pending(StatusCode::INTERNAL_SERVER_ERROR).with_body("brick offline"))
            })
            .await
            .unwrap_err();

        match err {
            ClientError::JobFailed { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "brick offline");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_response_returned_unchanged() {
        let poller = JobPoller::new(Duration::from_millis(10));
        let response = poller
            .wait(|| async { Ok(TransportResponse::new(StatusCode::INTERNAL_SERVER_ERROR)) })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_timeout_cancels_wait() {
        let poller = JobPoller::new(Duration::from_millis(100));
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            poller.wait(|| async { Ok(pending(StatusCode::OK)) }),
        )
        .await;
        assert!(result.is_err());
    }
}
