//! Application-wide error types using thiserror
//!
//! Startup and wiring errors are wrapped in AppError. The scan cycle itself
//! never returns one: adapter and sink failures are handled inside it.

use thiserror::Error;

use crate::adapters::errors::{DispatchError, FetchError};
use crate::config::CredentialsError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
