//! Adapter error types
//!
//! Source fetch failures, alert dispatch failures and per-field parse
//! failures are kept apart because the orchestrator recovers from each one
//! differently.

use thiserror::Error;

/// A source adapter could not produce its batch this cycle
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Provider answered with a non-success status
    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Fetch exceeded the deadline set around it
    #[error("Fetch timed out after {0}ms")]
    Timeout(u64),

    /// HTTP client gave up on a single request
    #[error("Request timed out")]
    RequestTimedOut,

    /// Payload did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::RequestTimedOut
        } else if err.is_decode() {
            FetchError::InvalidResponse(err.to_string())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

/// The alert sink could not deliver an alert
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Delivery endpoint refused the message
    #[error("Delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Dispatch timed out after {0}ms")]
    Timeout(u64),

    #[error("Request timed out")]
    RequestTimedOut,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DispatchError::RequestTimedOut
        } else {
            DispatchError::Http(err.to_string())
        }
    }
}

/// One field of one record could not be parsed.
///
/// Never propagated past the adapter: the field is coerced to its absent
/// value and the record is kept.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Malformed field '{field}': {raw}")]
pub struct MalformedRecordError {
    pub field: String,
    pub raw: String,
}

/// Result type alias for source fetches
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for alert dispatch
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
