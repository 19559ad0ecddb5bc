//! Secrets loaded from environment variables
//!
//! `BIRDEYE_API_KEY` is required only when a Birdeye source is enabled.
//! `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` are always required. None of
//! them has a built-in fallback.

use thiserror::Error;
use tracing::info;

use crate::config::logging::SanitizedValue;

#[derive(Debug, Error, PartialEq)]
pub enum CredentialsError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Environment variable {0} contains a placeholder value")]
    Placeholder(String),
}

/// API secrets for the configured collaborators
#[derive(Clone)]
pub struct Credentials {
    pub birdeye_api_key: Option<String>,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("birdeye_api_key", &self.birdeye_api_key.as_deref().map(SanitizedValue::new))
            .field("telegram_bot_token", &SanitizedValue::new(&self.telegram_bot_token))
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish()
    }
}

fn required(name: &str) -> Result<String, CredentialsError> {
    let value = std::env::var(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default();

    if value.is_empty() {
        return Err(CredentialsError::MissingEnvVar(name.to_string()));
    }
    if value.starts_with("your-") || value.starts_with("<") {
        return Err(CredentialsError::Placeholder(name.to_string()));
    }
    Ok(value)
}

impl Credentials {
    /// Read secrets from the process environment.
    pub fn from_env(birdeye_enabled: bool) -> Result<Self, CredentialsError> {
        let birdeye_api_key = if birdeye_enabled {
            Some(required("BIRDEYE_API_KEY")?)
        } else {
            None
        };
        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let telegram_chat_id = required("TELEGRAM_CHAT_ID")?;

        let birdeye_display = birdeye_api_key
            .as_deref()
            .map(|k| SanitizedValue::new(k).to_string())
            .unwrap_or_else(|| "unused".to_string());
        info!(
            birdeye_api_key = %birdeye_display,
            telegram_bot_token = %SanitizedValue::new(&telegram_bot_token),
            telegram_chat_id = %telegram_chat_id,
            "Credentials loaded"
        );

        Ok(Self {
            birdeye_api_key,
            telegram_bot_token,
            telegram_chat_id,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
