//! Client error types.

use crate::auth::AuthError;
use http::StatusCode;
use thiserror::Error;

/// Errors surfaced by [`ClusterClient`](super::ClusterClient) calls.
///
/// Overload responses never appear here directly; they are retried inside
/// the transport and only show up as [`ClientError::RetriesExhausted`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or I/O failure talking to the server
    #[error("transport error: {0}")]
    Transport(String),

    /// The request token could not be minted
    #[error(transparent)]
    Signing(#[from] AuthError),

    /// The job finished, but in error
    #[error("job failed ({status}): {message}")]
    JobFailed { status: StatusCode, message: String },

    /// The server stayed overloaded for the whole attempt budget
    #[error("operation failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// The server answered with a status the call does not expect
    #[error("unexpected response ({status}): {message}")]
    UnexpectedStatus { status: StatusCode, message: String },

    /// An accepted or redirect response without a usable `Location`
    #[error("response has no usable Location header")]
    MissingLocation,

    /// A URL could not be built
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Redirect chain longer than the configured limit
    #[error("stopped after {limit} redirects")]
    TooManyRedirects { limit: usize },
}

impl ClientError {
    /// Returns true for errors that a caller could reasonably retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RetriesExhausted { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
