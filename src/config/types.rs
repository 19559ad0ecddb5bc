//! Configuration types for the scanner
//!
//! Defines the YAML shape (`scanner`, `sources`, `telegram`) and the
//! validation rules applied once at startup.

use std::collections::HashSet;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::orchestrator::OrchestratorConfig;
use crate::core::scoring::{ModeRules, ScoringPipeline, ScoringProfile, SourceMode};
use crate::core::types::Source;
use crate::error::AppError;

// =============================================================================
// Scanner
// =============================================================================

/// Timing and selection parameters of the scan loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub scan_interval_secs: u64,
    pub response_poll_interval_secs: u64,
    pub cooldown_secs: u64,
    pub ledger_capacity: usize,
    /// Minimum score for a passing candidate to enter the pool
    pub bullish_threshold: f64,
    /// Deadline for every external call
    pub request_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 180,
            response_poll_interval_secs: 10,
            cooldown_secs: 180,
            ledger_capacity: 30,
            bullish_threshold: 5.0,
            request_timeout_secs: 15,
        }
    }
}

impl ScannerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn response_poll_interval(&self) -> Duration {
        Duration::from_secs(self.response_poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            bullish_threshold: self.bullish_threshold,
            ledger_capacity: self.ledger_capacity,
            cooldown: chrono::Duration::seconds(self.cooldown_secs as i64),
            call_timeout: self.request_timeout(),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.ledger_capacity == 0 {
            return Err(AppError::Config("scanner.ledger_capacity must be >= 1".to_string()));
        }
        if self.scan_interval_secs == 0 {
            return Err(AppError::Config("scanner.scan_interval_secs must be > 0".to_string()));
        }
        if self.response_poll_interval_secs == 0 {
            return Err(AppError::Config(
                "scanner.response_poll_interval_secs must be > 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("scanner.request_timeout_secs must be > 0".to_string()));
        }
        if !self.bullish_threshold.is_finite() || self.bullish_threshold < 0.0 {
            return Err(AppError::Config(format!(
                "scanner.bullish_threshold must be a finite value >= 0 (got {})",
                self.bullish_threshold
            )));
        }
        if self.cooldown_secs > i64::MAX as u64 {
            return Err(AppError::Config("scanner.cooldown_secs is out of range".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Sources
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_max_tokens() -> usize {
    30
}

/// One entry of the ordered `sources` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: Source,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub mode: SourceMode,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Partial override of the mode's filter floors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_yaml::Mapping>,
    /// Partial override of the mode's signal weights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<serde_yaml::Mapping>,
}

impl SourceConfig {
    pub fn new(kind: Source, mode: SourceMode) -> Self {
        Self {
            kind,
            enabled: true,
            mode,
            max_tokens: default_max_tokens(),
            filters: None,
            weights: None,
        }
    }

    /// Mode defaults with the configured overrides applied on top
    pub fn rules(&self) -> Result<ModeRules, AppError> {
        let defaults = ScoringProfile::for_mode(self.mode).rules().clone();
        Ok(ModeRules {
            filters: merge_overrides(&defaults.filters, self.filters.as_ref(), self.kind, "filters")?,
            weights: merge_overrides(&defaults.weights, self.weights.as_ref(), self.kind, "weights")?,
        })
    }

    pub fn profile(&self) -> Result<ScoringProfile, AppError> {
        Ok(ScoringProfile::with_rules(self.mode, self.rules()?))
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.max_tokens == 0 {
            return Err(AppError::Config(format!("Source '{}': max_tokens must be >= 1", self.kind)));
        }

        let rules = self.rules()?;
        let f = &rules.filters;
        let w = &rules.weights;
        let values = [
            ("filters.min_liquidity_usd", f.min_liquidity_usd),
            ("filters.min_volume_24h_usd", f.min_volume_24h_usd),
            ("filters.min_market_cap_usd", f.min_market_cap_usd),
            ("weights.volume_multiple", w.volume_multiple),
            ("weights.spike_threshold_pct", w.spike_threshold_pct),
            ("weights.strong_ratio", w.strong_ratio),
            ("weights.max_top_holder_pct", w.max_top_holder_pct),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Config(format!(
                    "Source '{}': {} must be a finite value >= 0 (got {})",
                    self.kind, name, value
                )));
            }
        }
        Ok(())
    }
}

/// Overlay a partial YAML mapping onto a fully populated default.
fn merge_overrides<T>(
    base: &T,
    overrides: Option<&serde_yaml::Mapping>,
    kind: Source,
    section: &str,
) -> Result<T, AppError>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let Some(overrides) = overrides else {
        return Ok(base.clone());
    };

    let invalid = |e: serde_yaml::Error| AppError::Config(format!("Source '{}': invalid {}: {}", kind, section, e));

    let mut merged = match serde_yaml::to_value(base).map_err(invalid)? {
        serde_yaml::Value::Mapping(map) => map,
        _ => return Err(AppError::Config(format!("Source '{}': {} is not a mapping", kind, section))),
    };
    for (key, value) in overrides {
        if !merged.contains_key(key) {
            return Err(AppError::Config(format!(
                "Source '{}': unknown {} key {:?}",
                kind,
                section,
                key.as_str().unwrap_or("?")
            )));
        }
        merged.insert(key.clone(), value.clone());
    }
    serde_yaml::from_value(serde_yaml::Value::Mapping(merged)).map_err(invalid)
}

// =============================================================================
// Telegram
// =============================================================================

fn default_api_base() -> String {
    crate::adapters::telegram::TELEGRAM_API_BASE.to_string()
}

/// Non-secret Telegram settings; token and chat id come from the environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramSettings {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub disable_preview: bool,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            disable_preview: false,
        }
    }
}

// =============================================================================
// Application
// =============================================================================

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(Source::Birdeye, SourceMode::Established),
        SourceConfig::new(Source::DexScreener, SourceMode::NewListing),
    ]
}

/// Root of `config.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub telegram: TelegramSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            sources: default_sources(),
            telegram: TelegramSettings::default(),
        }
    }
}

impl AppConfig {
    /// Validate the whole configuration; first failure wins.
    pub fn validate(&self) -> Result<(), AppError> {
        self.scanner.validate()?;

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.kind) {
                return Err(AppError::Config(format!(
                    "Source '{}' is configured more than once",
                    source.kind
                )));
            }
            source.validate()?;
        }

        if !self.sources.iter().any(|s| s.enabled) {
            return Err(AppError::Config(
                "Configuration must enable at least one source".to_string(),
            ));
        }

        Ok(())
    }

    /// Enabled sources in configured order
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn source_enabled(&self, kind: Source) -> bool {
        self.enabled_sources().any(|s| s.kind == kind)
    }

    /// Scoring pipeline holding one profile per enabled source
    pub fn scoring_pipeline(&self) -> Result<ScoringPipeline, AppError> {
        let mut pipeline = ScoringPipeline::new();
        for source in self.enabled_sources() {
            pipeline.set_profile(source.kind, source.profile()?);
        }
        Ok(pipeline)
    }
}
