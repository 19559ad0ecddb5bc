//! Core data types shared by the scan pipeline
//!
//! A `CandidateRecord` is one observation of one asset from one source in
//! one cycle. A `ScoredCandidate` is that record after the scoring pipeline
//! ran over it. Neither is persisted.

use serde::{Deserialize, Serialize};

// ============================================================================
// Sources
// ============================================================================

/// Market-data source that produced a candidate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Birdeye,
    DexScreener,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Birdeye => write!(f, "birdeye"),
            Source::DexScreener => write!(f, "dexscreener"),
        }
    }
}

// ============================================================================
// Candidate Record
// ============================================================================

/// Normalized observation of one asset from one source.
///
/// Numeric fields use `0.0` for "unknown" where the zero value carries no
/// signal (liquidity, volume, market cap, buy/sell volume). Fields where zero
/// is meaningful are `Option`s and are read through the accessor helpers,
/// which apply the documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateRecord {
    /// Stable on-chain identity (mint address)
    pub asset_id: String,
    pub source: Source,
    /// Ticker shown to humans, not unique
    pub display_symbol: String,
    pub price: f64,
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    /// Volume over the most recent hour, when the source reports it
    pub volume_1h_usd: Option<f64>,
    pub market_cap_usd: f64,
    pub price_change_1h_pct: Option<f64>,
    pub price_change_6h_pct: Option<f64>,
    pub price_change_24h_pct: Option<f64>,
    pub holder_count: Option<u64>,
    pub holder_count_24h_ago: Option<u64>,
    pub buy_volume_24h_usd: f64,
    pub sell_volume_24h_usd: f64,
    /// Share of supply held by the top 10 wallets, in percent
    pub top_holder_pct: Option<f64>,
    pub chart_url: String,
}

impl CandidateRecord {
    /// Create a record with identity fields set and every metric unknown.
    pub fn new(asset_id: impl Into<String>, source: Source, display_symbol: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            source,
            display_symbol: display_symbol.into(),
            price: 0.0,
            liquidity_usd: 0.0,
            volume_24h_usd: 0.0,
            volume_1h_usd: None,
            market_cap_usd: 0.0,
            price_change_1h_pct: None,
            price_change_6h_pct: None,
            price_change_24h_pct: None,
            holder_count: None,
            holder_count_24h_ago: None,
            buy_volume_24h_usd: 0.0,
            sell_volume_24h_usd: 0.0,
            top_holder_pct: None,
            chart_url: String::new(),
        }
    }

    pub fn change_1h(&self) -> f64 {
        self.price_change_1h_pct.unwrap_or(0.0)
    }

    pub fn change_6h(&self) -> f64 {
        self.price_change_6h_pct.unwrap_or(0.0)
    }

    pub fn change_24h(&self) -> f64 {
        self.price_change_24h_pct.unwrap_or(0.0)
    }

    /// Holder delta over 24h. Absent counts are treated as equal (zero growth).
    pub fn holder_growth(&self) -> i64 {
        match (self.holder_count, self.holder_count_24h_ago) {
            (Some(now), Some(before)) => now as i64 - before as i64,
            _ => 0,
        }
    }

    /// Whether both holder counts were reported by the source
    pub fn has_holder_baseline(&self) -> bool {
        self.holder_count.is_some() && self.holder_count_24h_ago.is_some()
    }

    pub fn buy_sell_ratio(&self) -> BuySellRatio {
        BuySellRatio::from_volumes(self.buy_volume_24h_usd, self.sell_volume_24h_usd)
    }
}

// ============================================================================
// Buy/Sell Ratio
// ============================================================================

/// Buy volume over sell volume for the last 24h.
///
/// `NoSellData` is kept distinct from any numeric value so that assets with
/// no recorded sells are not ranked as infinitely favorable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BuySellRatio {
    Ratio(f64),
    NoSellData,
}

impl BuySellRatio {
    pub fn from_volumes(buy: f64, sell: f64) -> Self {
        if sell > 0.0 && sell.is_finite() && buy.is_finite() {
            BuySellRatio::Ratio(buy.max(0.0) / sell)
        } else {
            BuySellRatio::NoSellData
        }
    }

    /// Numeric value, if meaningful
    pub fn value(&self) -> Option<f64> {
        match self {
            BuySellRatio::Ratio(r) => Some(*r),
            BuySellRatio::NoSellData => None,
        }
    }
}

impl std::fmt::Display for BuySellRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuySellRatio::Ratio(r) => write!(f, "{:.2}x", r),
            BuySellRatio::NoSellData => write!(f, "no sell data"),
        }
    }
}

// ============================================================================
// Scored Candidate
// ============================================================================

/// A candidate record plus the pipeline's verdict
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredCandidate {
    pub record: CandidateRecord,
    pub passed: bool,
    pub score: f64,
    pub signals: Vec<String>,
    pub warnings: Vec<String>,
}

impl ScoredCandidate {
    /// Eligible for alerting: passed every hard filter and reached the threshold
    pub fn is_bullish(&self, bullish_threshold: f64) -> bool {
        self.passed && self.score >= bullish_threshold
    }

    pub fn buy_sell_ratio(&self) -> BuySellRatio {
        self.record.buy_sell_ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_with_sells_is_numeric() {
        let ratio = BuySellRatio::from_volumes(25_000.0, 10_000.0);
        assert_eq!(ratio, BuySellRatio::Ratio(2.5));
        assert_eq!(ratio.value(), Some(2.5));
    }

    #[test]
    fn test_ratio_without_sells_is_sentinel() {
        assert_eq!(BuySellRatio::from_volumes(5_000.0, 0.0), BuySellRatio::NoSellData);
        assert_eq!(BuySellRatio::from_volumes(0.0, 0.0), BuySellRatio::NoSellData);
        assert_eq!(BuySellRatio::NoSellData.value(), None);
    }

    #[test]
    fn test_holder_growth_defaults_to_zero_when_absent() {
        let mut record = CandidateRecord::new("mint", Source::Birdeye, "TKN");
        assert_eq!(record.holder_growth(), 0);
        assert!(!record.has_holder_baseline());

        record.holder_count = Some(1_050);
        assert_eq!(record.holder_growth(), 0);

        record.holder_count_24h_ago = Some(1_000);
        assert_eq!(record.holder_growth(), 50);
    }

    #[test]
    fn test_absent_changes_read_as_zero() {
        let record = CandidateRecord::new("mint", Source::DexScreener, "TKN");
        assert_eq!(record.change_1h(), 0.0);
        assert_eq!(record.change_6h(), 0.0);
        assert_eq!(record.change_24h(), 0.0);
    }

    #[test]
    fn test_source_display() {
        assert_eq!(Source::Birdeye.to_string(), "birdeye");
        assert_eq!(Source::DexScreener.to_string(), "dexscreener");
    }

    #[test]
    fn test_ratio_display() {
        assert_eq!(BuySellRatio::Ratio(2.0).to_string(), "2.00x");
        assert_eq!(BuySellRatio::NoSellData.to_string(), "no sell data");
    }
}
