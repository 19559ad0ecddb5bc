//! Configuration module for scanner settings and YAML loading
//!
//! This module provides:
//! - Configuration types (`AppConfig`, `ScannerConfig`, `SourceConfig`, `TelegramSettings`)
//! - YAML loading functionality (`load_config`, `load_config_or_default`)
//! - Secrets from the environment (`Credentials`)
//! - Process constants with environment variable overrides
//! - Logging initialization and secret redaction

pub mod constants;
pub mod credentials;
pub mod logging;
mod loader;
mod types;

// Re-export types
pub use types::{AppConfig, ScannerConfig, SourceConfig, TelegramSettings};

// Re-export loader functions
pub use loader::{load_config, load_config_from_str, load_config_or_default};

pub use credentials::{Credentials, CredentialsError};
pub use logging::{init_logging, SanitizedValue};
