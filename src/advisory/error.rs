// Advisory failure taxonomy
//
// Transient failures (network, timeout, 429, 5xx) are retried by the
// orchestrator and surface as RetriesExhausted once the budget is spent.
// Everything else is fatal and surfaces on the first occurrence.

use crate::advisory::template::TemplateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors from advisory calls
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdvisoryError {
    /// Provider rejected the credentials (HTTP 401) or none were configured
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// A single attempt exceeded the configured deadline
    #[error("Advisory call timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// Provider answered but the body carried no usable text
    #[error("Malformed advisory response: {0}")]
    MalformedResponse(String),

    /// Connection could not be established or was reset
    #[error("Connection failed: {0}")]
    Network(String),

    /// Provider returned a non-success status other than 401
    #[error("Provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Prompt template could not be rendered
    #[error("Invalid prompt template: {0}")]
    Template(#[from] TemplateError),

    /// Retry budget spent on transient failures
    #[error("Advisory call failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<AdvisoryError>,
    },

    /// Parameters could not be canonicalized or the call task died
    #[error("Internal advisory error: {0}")]
    Internal(String),
}

/// Coarse error classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryErrorKind {
    AuthFailure,
    Timeout,
    MalformedResponse,
    Transient,
    Unknown,
}

impl fmt::Display for AdvisoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AdvisoryErrorKind::AuthFailure => "auth failure",
            AdvisoryErrorKind::Timeout => "timeout",
            AdvisoryErrorKind::MalformedResponse => "malformed response",
            AdvisoryErrorKind::Transient => "transient failure",
            AdvisoryErrorKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

impl AdvisoryError {
    /// Classify for the caller
    ///
    /// Exhausted retries whose last attempt timed out still report
    /// `Timeout`, so a slow provider is distinguishable from a flaky one.
    pub fn kind(&self) -> AdvisoryErrorKind {
        match self {
            AdvisoryError::AuthFailure(_) => AdvisoryErrorKind::AuthFailure,
            AdvisoryError::Timeout(_) => AdvisoryErrorKind::Timeout,
            AdvisoryError::MalformedResponse(_) => AdvisoryErrorKind::MalformedResponse,
            AdvisoryError::RetriesExhausted { last, .. } => match last.kind() {
                AdvisoryErrorKind::Timeout => AdvisoryErrorKind::Timeout,
                _ => AdvisoryErrorKind::Transient,
            },
            AdvisoryError::Network(_) => AdvisoryErrorKind::Transient,
            AdvisoryError::Http { .. } if self.is_retryable() => AdvisoryErrorKind::Transient,
            AdvisoryError::Http { .. }
            | AdvisoryError::Template(_)
            | AdvisoryError::Internal(_) => AdvisoryErrorKind::Unknown,
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AdvisoryError::Timeout(_) | AdvisoryError::Network(_) => true,
            AdvisoryError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Map a transport error from reqwest
    pub(crate) fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            AdvisoryError::Timeout(timeout)
        } else if err.is_decode() {
            AdvisoryError::MalformedResponse(err.to_string())
        } else {
            AdvisoryError::Network(err.to_string())
        }
    }
}
