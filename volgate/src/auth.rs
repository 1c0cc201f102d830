//! Request-bound bearer tokens.
//!
//! Each outbound call carries an HS256 JWT whose `qsh` claim is the hex
//! SHA-256 of `METHOD&path`. A token minted for one request is useless for
//! any other, so the client re-signs on every attempt and redirect hop.
//! The server side verifies with [`TokenVerifier`] through the
//! [`require_token`] middleware.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

/// Errors from minting or checking a token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token could not be built or encoded
    #[error("failed to sign request token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// No bearer credential on the request
    #[error("missing bearer token")]
    MissingCredential,

    /// The credential is not a well-formed bearer token
    #[error("malformed bearer token: {0}")]
    Malformed(String),

    /// No key is configured for the token's issuer
    #[error("unknown token issuer '{0}'")]
    UnknownIssuer(String),

    /// Bad signature, expired, or otherwise rejected by validation
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// The token was minted for a different method or path
    #[error("token does not match {method} {path}")]
    RequestMismatch { method: Method, path: String },
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

/// Claims carried by a request token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
    /// Hash binding the token to one method and path
    pub qsh: String,
}

/// Hex SHA-256 of `METHOD&path`.
pub fn request_hash(method: &Method, path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"&");
    hasher.update(path.as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Mints request tokens for one issuer.
#[derive(Clone)]
pub struct TokenSigner {
    issuer: String,
    key: EncodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(issuer: impl Into<String>, secret: &str, ttl: Duration) -> Self {
        Self {
            issuer: issuer.into(),
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signs a token for `method` and `path`, valid from now for the TTL.
    pub fn sign(&self, method: &Method, path: &str) -> Result<String, AuthError> {
        self.sign_at(method, path, unix_now())
    }

    /// Signs a token as if issued at `issued_at` (unix seconds).
    pub fn sign_at(&self, method: &Method, path: &str, issued_at: u64) -> Result<String, AuthError> {
        let claims = TokenClaims {
            iss: self.issuer.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl.as_secs()),
            qsh: request_hash(method, path),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(AuthError::Signing)
    }

    /// Signs and formats the `Authorization` header value.
    pub fn authorization(&self, method: &Method, path: &str) -> Result<HeaderValue, AuthError> {
        let token = self.sign(method, path)?;
        HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| AuthError::Malformed(e.to_string()))
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Verifies request tokens against per-issuer secrets.
#[derive(Clone, Default)]
pub struct TokenVerifier {
    keys: HashMap<String, DecodingKey>,
}

impl TokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the shared secret for `issuer`.
    pub fn with_key(mut self, issuer: impl Into<String>, secret: &str) -> Self {
        self.keys
            .insert(issuer.into(), DecodingKey::from_secret(secret.as_bytes()));
        self
    }

    /// Checks signature, expiry and the request binding of `token`.
    pub fn verify(&self, token: &str, method: &Method, path: &str) -> Result<TokenClaims, AuthError> {
        let issuer = peek_issuer(token)?;
        let key = self
            .keys
            .get(&issuer)
            .ok_or_else(|| AuthError::UnknownIssuer(issuer.clone()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        let data = jsonwebtoken::decode::<TokenClaims>(token, key, &validation)
            .map_err(AuthError::Invalid)?;

        if data.claims.qsh != request_hash(method, path) {
            return Err(AuthError::RequestMismatch {
                method: method.clone(),
                path: path.to_string(),
            });
        }
        Ok(data.claims)
    }

    /// Verifies the bearer token found in `headers`.
    pub fn verify_headers(
        &self,
        headers: &HeaderMap,
        method: &Method,
        path: &str,
    ) -> Result<TokenClaims, AuthError> {
        let token = bearer_token(headers)?;
        self.verify(token, method, path)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuers", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Reads the `iss` claim without checking the signature, to pick a key.
fn peek_issuer(token: &str) -> Result<String, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.set_required_spec_claims::<&str>(&[]);

    let data = jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| AuthError::Malformed(e.to_string()))?;
    Ok(data.claims.iss)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let raw = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|e| AuthError::Malformed(e.to_string()))?;
    let token = match raw.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => return Err(AuthError::Malformed("expected 'Bearer <token>'".to_string())),
    };
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

/// Middleware rejecting requests without a valid request-bound token.
pub async fn require_token(
    State(verifier): State<Arc<TokenVerifier>>,
    request: Request,
    next: Next,
) -> Response {
    let result = verifier.verify_headers(
        request.headers(),
        request.method(),
        request.uri().path(),
    );
    match result {
        Ok(_) => next.run(request).await,
        Err(e) => {
            warn!(
                method = %request.method(),
                path = request.uri().path(),
                error = %e,
                "Rejected unauthenticated request"
            );
            e.into_response()
        }
    }
}
