//! Process-level constants with environment variable overrides

use std::path::PathBuf;

// =============================================================================
// Files
// =============================================================================

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Path of the YAML configuration file (default: `config.yaml`)
///
/// Environment variable: `SCANNER_CONFIG`
pub fn config_path() -> PathBuf {
    std::env::var("SCANNER_CONFIG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

// =============================================================================
// Health server
// =============================================================================

/// Port for the liveness endpoint (default: 10000)
///
/// Environment variable: `PORT`
pub fn health_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10000)
}

// =============================================================================
// Startup
// =============================================================================

/// Send a Telegram notice when the scanner starts (default: true)
///
/// Environment variable: `STARTUP_NOTICE`
pub fn startup_notice_enabled() -> bool {
    std::env::var("STARTUP_NOTICE")
        .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off"))
        .unwrap_or(true)
}

/// Capacity of the alert notice channel feeding the response tracker
pub const ALERT_NOTICE_CAPACITY: usize = 32;
