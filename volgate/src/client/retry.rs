//! Overload retry with jittered backoff.
//!
//! A 429 from the admission gate means "come back later". Each retry waits
//! a random delay between the configured bounds so that many clients
//! rejected together do not come back together.

use super::error::ClientError;
use super::transport::TransportResponse;
use crate::config::ClientConfig;
use http::StatusCode;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Randomized delay between `min` and `max`, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    min: Duration,
    max: Duration,
}

impl Backoff {
    /// Bounds given in the wrong order are swapped.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws the next delay.
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// How many times to try a call that keeps being rejected, and how long
/// to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.max_retries(),
            Backoff::new(config.backoff_min(), config.backoff_max()),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Runs `attempt` until it yields something other than an overload.
    ///
    /// `attempt` is called with the 1-based attempt number and must build
    /// a fresh request each time. Errors are returned unchanged; only 429
    /// responses are retried. After the last rejected attempt the result
    /// is [`ClientError::RetriesExhausted`].
    pub async fn run<F, Fut>(&self, mut attempt: F) -> Result<TransportResponse, ClientError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<TransportResponse, ClientError>>,
    {
        for n in 1..=self.max_attempts {
            let response = attempt(n).await?;
            if response.status != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            // Rejected response body is discarded here.
            drop(response);

            if n == self.max_attempts {
                break;
            }
            let delay = self.backoff.next_delay();
            debug!(
                attempt = n,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Server overloaded, backing off"
            );
            tokio::time::sleep(delay).await;
        }

        Err(ClientError::RetriesExhausted {
            attempts: self.max_attempts,
        })
    }
}
