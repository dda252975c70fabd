//! Error types for the verification resolver.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
/// Error type for all resolver and inbox-provider operations.
pub enum Error {
    /// Required configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
    /// Underlying HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Inbox provider rejected or failed an allocation, fetch, or deletion.
    #[error("provider error: {0}")]
    Provider(String),
    /// HTTP response returned a non-success status with body.
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    /// Provider response could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),
    /// Long-poll elapsed without a delivery.
    #[error("no message within {timeout_ms}ms")]
    PollTimeout { timeout_ms: u64 },
    /// A message arrived but its subject did not contain the expected keyword.
    #[error("subject {subject:?} does not contain {keyword:?}")]
    SubjectMismatch { keyword: String, subject: String },
    /// No matching message after the full retry budget.
    #[error("no matching message after {attempts} attempt(s): {last}")]
    MessageTimeout { attempts: u32, last: String },
    /// Browser driver operation failed.
    #[error("browser error: {0}")]
    Browser(String),
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, Error>;
