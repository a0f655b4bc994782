//! Typed provider failures.

use std::time::Duration;

use reqwest::StatusCode;

/// Broad failure class, used by the backoff policy and for attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    RateLimited,
    AuthFailed,
    Malformed,
}

impl ErrorKind {
    /// Whether a retry can succeed without a configuration change.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::RateLimited)
    }
}

/// A page-level failure reported by a content provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            retryable: kind.is_retryable(),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthFailed, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed, message)
    }

    /// An adapter call that did not finish in time.
    pub fn timeout(after: Duration) -> Self {
        Self::network(format!("timed out after {}s", after.as_secs()))
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode) -> Self {
        let message = format!("HTTP {status}");
        match status.as_u16() {
            401 | 403 => Self::auth_failed(message),
            429 => Self::rate_limited(message),
            500..=599 => Self::network(message),
            _ => Self::malformed(message),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status);
        }
        if err.is_decode() {
            return Self::malformed(err.to_string());
        }
        Self::network(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(format!("invalid JSON body: {err}"))
    }
}
