//! Client side of the async job protocol.
//!
//! Layers, innermost first:
//! - [`OutboundThrottle`] bounds concurrently open calls
//! - [`HttpTransport`] performs one exchange ([`ReqwestTransport`] in production)
//! - [`RetryPolicy`] retries overload responses with [`Backoff`] jitter
//! - [`JobPoller`] waits on a job-status resource
//! - [`ClusterClient`] ties them together and signs every exchange

mod cluster;
mod error;
mod poller;
mod retry;
mod throttle;
mod transport;

pub use cluster::ClusterClient;
pub use error::ClientError;
pub use poller::JobPoller;
pub use retry::{Backoff, RetryPolicy};
pub use throttle::{OutboundThrottle, ThrottlePermit};
pub use transport::{HttpTransport, OutboundRequest, ReqwestTransport, TransportResponse};
