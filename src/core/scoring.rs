//! Filter/scoring pipeline
//!
//! Each source runs in one of two modes. Both modes share the same shape:
//! hard filters first (pass/fail, no partial credit), then additive signal
//! scoring. `Established` keeps strict floors and turns holder growth and
//! buy pressure into hard requirements. `NewListing` relaxes the floors by
//! roughly an order of magnitude and only scores what the source reports.
//!
//! Scoring is a pure function of the record and the profile: no clock, no
//! randomness, no I/O.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{BuySellRatio, CandidateRecord, ScoredCandidate, Source};

// ============================================================================
// Configuration
// ============================================================================

/// Pass/fail floors applied before any signal is scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardFilters {
    pub min_liquidity_usd: f64,
    pub min_volume_24h_usd: f64,
    pub min_market_cap_usd: f64,
}

impl HardFilters {
    pub fn established() -> Self {
        Self {
            min_liquidity_usd: 50_000.0,
            min_volume_24h_usd: 20_000.0,
            min_market_cap_usd: 100_000.0,
        }
    }

    pub fn new_listing() -> Self {
        Self {
            min_liquidity_usd: 5_000.0,
            min_volume_24h_usd: 2_000.0,
            min_market_cap_usd: 10_000.0,
        }
    }
}

impl Default for HardFilters {
    fn default() -> Self {
        Self::established()
    }
}

/// Point values and tunables for the additive signals.
///
/// A family whose weight is `0.0` is disabled: it contributes no points and
/// no rationale line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    /// 6h change strictly positive
    pub trend_positive: f64,
    /// 6h change exactly zero (or unreported)
    pub trend_flat: f64,
    /// 24h change strictly positive
    pub daily_positive: f64,
    /// 1h volume above `volume_multiple` times the trailing hourly average
    pub volume_confirmation: f64,
    pub volume_multiple: f64,
    /// Positive 6h trend together with volume confirmation
    pub momentum_bonus: f64,
    /// Subtracted when the 1h change exceeds `spike_threshold_pct`
    pub spike_penalty: f64,
    pub spike_threshold_pct: f64,
    pub holder_growth: f64,
    /// Buy/sell ratio above 1
    pub buy_pressure: f64,
    /// Extra points when the ratio exceeds `strong_ratio`
    pub strong_buy_pressure: f64,
    pub strong_ratio: f64,
    /// Top-10 holder share below `max_top_holder_pct`
    pub decentralization: f64,
    pub max_top_holder_pct: f64,
}

impl SignalWeights {
    pub fn established() -> Self {
        Self {
            trend_positive: 2.0,
            trend_flat: 1.0,
            daily_positive: 1.0,
            volume_confirmation: 2.0,
            volume_multiple: 2.0,
            momentum_bonus: 1.0,
            spike_penalty: 1.0,
            spike_threshold_pct: 20.0,
            holder_growth: 1.0,
            buy_pressure: 2.0,
            strong_buy_pressure: 1.0,
            strong_ratio: 2.0,
            decentralization: 1.0,
            max_top_holder_pct: 30.0,
        }
    }

    /// New listings have a short, noisy volume history, so the volume
    /// multiple is higher and a holder baseline is worth more when present.
    pub fn new_listing() -> Self {
        Self {
            volume_multiple: 3.0,
            holder_growth: 2.0,
            ..Self::established()
        }
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self::established()
    }
}

/// Thresholds and weights for one source mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeRules {
    pub filters: HardFilters,
    pub weights: SignalWeights,
}

/// Mode tag used in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    Established,
    NewListing,
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceMode::Established => write!(f, "established"),
            SourceMode::NewListing => write!(f, "new_listing"),
        }
    }
}

// ============================================================================
// Scoring Profile
// ============================================================================

/// Scoring behavior for one source, tagged by mode
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringProfile {
    Established(ModeRules),
    NewListing(ModeRules),
}

impl ScoringProfile {
    /// Profile with the mode's default rules
    pub fn for_mode(mode: SourceMode) -> Self {
        match mode {
            SourceMode::Established => ScoringProfile::Established(ModeRules {
                filters: HardFilters::established(),
                weights: SignalWeights::established(),
            }),
            SourceMode::NewListing => ScoringProfile::NewListing(ModeRules {
                filters: HardFilters::new_listing(),
                weights: SignalWeights::new_listing(),
            }),
        }
    }

    pub fn with_rules(mode: SourceMode, rules: ModeRules) -> Self {
        match mode {
            SourceMode::Established => ScoringProfile::Established(rules),
            SourceMode::NewListing => ScoringProfile::NewListing(rules),
        }
    }

    pub fn mode(&self) -> SourceMode {
        match self {
            ScoringProfile::Established(_) => SourceMode::Established,
            ScoringProfile::NewListing(_) => SourceMode::NewListing,
        }
    }

    pub fn rules(&self) -> &ModeRules {
        match self {
            ScoringProfile::Established(rules) | ScoringProfile::NewListing(rules) => rules,
        }
    }

    /// Run hard filters, then signal scoring, over one record.
    pub fn score(&self, record: &CandidateRecord) -> ScoredCandidate {
        let metrics = Metrics::from_record(record);

        if let Some(reason) = self.hard_filter_failure(&metrics) {
            return ScoredCandidate {
                record: record.clone(),
                passed: false,
                score: 0.0,
                signals: Vec::new(),
                warnings: vec![reason],
            };
        }

        let mut tally = Tally::default();
        self.score_signals(&metrics, &mut tally);

        ScoredCandidate {
            record: record.clone(),
            passed: true,
            score: tally.score.max(0.0),
            signals: tally.signals,
            warnings: tally.warnings,
        }
    }

    fn hard_filter_failure(&self, m: &Metrics) -> Option<String> {
        let filters = &self.rules().filters;

        if m.liquidity < filters.min_liquidity_usd {
            return Some(format!(
                "liquidity ${:.0} below ${:.0} minimum",
                m.liquidity, filters.min_liquidity_usd
            ));
        }
        if m.volume_24h < filters.min_volume_24h_usd {
            return Some(format!(
                "24h volume ${:.0} below ${:.0} minimum",
                m.volume_24h, filters.min_volume_24h_usd
            ));
        }
        if m.market_cap < filters.min_market_cap_usd {
            return Some(format!(
                "market cap ${:.0} below ${:.0} minimum",
                m.market_cap, filters.min_market_cap_usd
            ));
        }

        if let ScoringProfile::Established(_) = self {
            if m.change_24h < 0.0 {
                return Some(format!("negative 24h change ({:.1}%)", m.change_24h));
            }
            if m.holder_growth <= 0 {
                return Some(format!("no holder growth ({:+})", m.holder_growth));
            }
            if let BuySellRatio::Ratio(r) = m.ratio {
                if r <= 1.0 {
                    return Some(format!("more sells than buys (ratio {:.2})", r));
                }
            }
        }

        None
    }

    fn score_signals(&self, m: &Metrics, tally: &mut Tally) {
        let w = &self.rules().weights;
        let strict = matches!(self, ScoringProfile::Established(_));

        // Trend
        if m.change_6h > 0.0 {
            tally.add(w.trend_positive, format!("6h trend up {:+.1}%", m.change_6h));
        } else if m.change_6h == 0.0 {
            tally.add(w.trend_flat, "6h trend flat".to_string());
        } else {
            tally.warn(format!("6h trend down {:.1}%", m.change_6h));
        }

        if m.change_24h > 0.0 {
            tally.add(w.daily_positive, format!("24h up {:+.1}%", m.change_24h));
        } else if m.change_24h < 0.0 {
            tally.warn(format!("24h change negative ({:.1}%)", m.change_24h));
        }

        // Volume confirmation
        let hourly_average = m.volume_24h / 24.0;
        let volume_confirmed = match m.volume_1h {
            Some(recent) if hourly_average > 0.0 => recent > w.volume_multiple * hourly_average,
            _ => false,
        };
        if volume_confirmed {
            tally.add(
                w.volume_confirmation,
                format!("1h volume above {:.1}x hourly average", w.volume_multiple),
            );
        }

        // Momentum/volume correlation and anti-chase
        if m.change_6h > 0.0 && volume_confirmed {
            tally.add(w.momentum_bonus, "momentum confirmed by volume".to_string());
        }
        if m.change_1h > w.spike_threshold_pct && w.spike_penalty > 0.0 {
            tally.score -= w.spike_penalty;
            tally.warn(format!("possible top: 1h spike {:+.1}%", m.change_1h));
        }

        // Holder growth (hard requirement in strict mode, bonus otherwise)
        if m.holder_growth > 0 {
            tally.add(w.holder_growth, format!("holders +{} in 24h", m.holder_growth));
        } else if !strict && m.has_holder_baseline {
            tally.warn(format!("holder count not growing ({:+})", m.holder_growth));
        }

        // Buy/sell pressure
        match m.ratio {
            BuySellRatio::Ratio(r) if r > 1.0 => {
                tally.add(w.buy_pressure, format!("buy/sell ratio {:.2}", r));
                if r > w.strong_ratio {
                    tally.add(w.strong_buy_pressure, "strong buying pressure".to_string());
                }
            }
            BuySellRatio::Ratio(r) => {
                tally.warn(format!("sells outweigh buys (ratio {:.2})", r));
            }
            BuySellRatio::NoSellData => {
                if strict {
                    tally.warn("no sell volume recorded".to_string());
                }
            }
        }

        // Holder concentration, only when reported
        if let Some(pct) = m.top_holder_pct {
            if pct < w.max_top_holder_pct {
                tally.add(w.decentralization, format!("top holders own {:.1}%", pct));
            } else {
                tally.warn(format!("concentrated supply: top holders own {:.1}%", pct));
            }
        }
    }
}

/// Record fields after coercing non-finite values to the absent sentinel
struct Metrics {
    liquidity: f64,
    volume_24h: f64,
    volume_1h: Option<f64>,
    market_cap: f64,
    change_1h: f64,
    change_6h: f64,
    change_24h: f64,
    holder_growth: i64,
    has_holder_baseline: bool,
    ratio: BuySellRatio,
    top_holder_pct: Option<f64>,
}

impl Metrics {
    fn from_record(record: &CandidateRecord) -> Self {
        Self {
            liquidity: finite_or_zero(record.liquidity_usd),
            volume_24h: finite_or_zero(record.volume_24h_usd),
            volume_1h: record.volume_1h_usd.filter(|v| v.is_finite()),
            market_cap: finite_or_zero(record.market_cap_usd),
            change_1h: finite_or_zero(record.change_1h()),
            change_6h: finite_or_zero(record.change_6h()),
            change_24h: finite_or_zero(record.change_24h()),
            holder_growth: record.holder_growth(),
            has_holder_baseline: record.has_holder_baseline(),
            ratio: record.buy_sell_ratio(),
            top_holder_pct: record.top_holder_pct.filter(|v| v.is_finite()),
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[derive(Default)]
struct Tally {
    score: f64,
    signals: Vec<String>,
    warnings: Vec<String>,
}

impl Tally {
    fn add(&mut self, points: f64, signal: String) {
        if points == 0.0 {
            return;
        }
        self.score += points;
        self.signals.push(signal);
    }

    fn warn(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Dispatches each record to the profile configured for its source.
///
/// A source with no configured profile is scored with strict defaults.
#[derive(Debug, Clone, Default)]
pub struct ScoringPipeline {
    profiles: HashMap<Source, ScoringProfile>,
}

impl ScoringPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, source: Source, profile: ScoringProfile) -> Self {
        self.profiles.insert(source, profile);
        self
    }

    pub fn set_profile(&mut self, source: Source, profile: ScoringProfile) {
        self.profiles.insert(source, profile);
    }

    pub fn profile(&self, source: Source) -> Option<&ScoringProfile> {
        self.profiles.get(&source)
    }

    pub fn score(&self, record: &CandidateRecord) -> ScoredCandidate {
        match self.profiles.get(&record.source) {
            Some(profile) => profile.score(record),
            None => ScoringProfile::for_mode(SourceMode::Established).score(record),
        }
    }
}
