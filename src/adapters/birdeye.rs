//! Birdeye source adapter (established tokens)
//!
//! Two-step fetch: the token list sorted by 24h change, then a per-token
//! overview call that fills in holders, buy/sell volume and short-window
//! price changes. Overview calls are skipped for tokens already alerted and
//! for tokens that cannot clear the hard filter floors anyway. Up to
//! `OVERVIEW_CONCURRENCY` overview calls run at once, each bounded by the
//! client timeout.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::adapters::errors::{FetchError, FetchResult};
use crate::adapters::fields::{amount, count, lenient_f64, text};
use crate::adapters::traits::{FetchContext, SourceAdapter};
use crate::core::scoring::HardFilters;
use crate::core::types::{CandidateRecord, Source};

pub const BIRDEYE_API_BASE: &str = "https://public-api.birdeye.so";
const TOKENLIST_LIMIT: usize = 50;
/// Overview calls kept in flight at once
pub const OVERVIEW_CONCURRENCY: usize = 5;

/// Connection settings for the Birdeye adapter
#[derive(Debug, Clone)]
pub struct BirdeyeConfig {
    pub base_url: String,
    pub api_key: String,
    /// Tokens taken from the list each cycle
    pub max_tokens: usize,
    pub request_timeout: Duration,
    /// Only tokens above these floors are enriched
    pub enrich_floor: Option<HardFilters>,
}

impl BirdeyeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: BIRDEYE_API_BASE.to_string(),
            api_key: api_key.into(),
            max_tokens: 30,
            request_timeout: Duration::from_secs(15),
            enrich_floor: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub struct BirdeyeAdapter {
    config: BirdeyeConfig,
    http_client: reqwest::Client,
}

impl BirdeyeAdapter {
    pub fn new(config: BirdeyeConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(2)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> FetchResult<Value> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self
            .http_client
            .get(&url)
            .header("X-API-KEY", &self.config.api_key)
            .header("x-chain", "solana")
            .header("accept", "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response.json().await?;
        if json.get("success").and_then(Value::as_bool) == Some(false) {
            let message = text(json.get("message")).unwrap_or_else(|| "success=false".to_string());
            return Err(FetchError::InvalidResponse(message));
        }
        Ok(json)
    }

    async fn token_list(&self) -> FetchResult<Vec<Value>> {
        let query = [
            ("sort_by", "v24hChangePercent".to_string()),
            ("sort_type", "desc".to_string()),
            ("offset", "0".to_string()),
            ("limit", TOKENLIST_LIMIT.to_string()),
        ];
        let json = self.get_json("/defi/tokenlist", &query).await?;

        json.get("data")
            .and_then(|d| d.get("tokens"))
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| FetchError::InvalidResponse("missing data.tokens".to_string()))
    }

    async fn overview(&self, address: &str) -> FetchResult<Value> {
        let json = self
            .get_json("/defi/token_overview", &[("address", address.to_string())])
            .await?;
        json.get("data")
            .cloned()
            .ok_or_else(|| FetchError::InvalidResponse("missing data".to_string()))
    }

    fn worth_enriching(&self, record: &CandidateRecord) -> bool {
        match &self.config.enrich_floor {
            Some(floor) => {
                record.liquidity_usd >= floor.min_liquidity_usd
                    && record.volume_24h_usd >= floor.min_volume_24h_usd
                    && record.market_cap_usd >= floor.min_market_cap_usd
            }
            None => true,
        }
    }

    /// Returns the record and whether the overview was merged into it.
    async fn enrich(&self, ctx: &FetchContext, mut record: CandidateRecord) -> (CandidateRecord, bool) {
        if ctx.is_alerted(&record.asset_id) || !self.worth_enriching(&record) {
            return (record, false);
        }
        match self.overview(&record.asset_id).await {
            Ok(data) => {
                apply_overview(&mut record, &data);
                (record, true)
            }
            Err(e) => {
                debug!(
                    cycle_id = %ctx.cycle_id,
                    asset_id = %record.asset_id,
                    error = %e,
                    "Overview failed, keeping base record"
                );
                (record, false)
            }
        }
    }
}

/// Normalize one token list entry. Returns `None` when there is no address.
pub fn parse_list_token(token: &Value) -> Option<CandidateRecord> {
    let address = text(token.get("address"))?;
    let symbol = text(token.get("symbol")).unwrap_or_else(|| "UNKNOWN".to_string());

    let mut record = CandidateRecord::new(address.clone(), Source::Birdeye, symbol);
    record.price = amount("price", token.get("price"));
    record.liquidity_usd = amount("liquidity", token.get("liquidity"));
    record.volume_24h_usd = amount("v24hUSD", token.get("v24hUSD"));
    record.market_cap_usd = amount("mc", token.get("mc"));
    record.price_change_24h_pct = lenient_f64("price24hChangePercent", token.get("price24hChangePercent"))
        .or_else(|| lenient_f64("v24hChangePercent", token.get("v24hChangePercent")));
    record.chart_url = chart_url(&address);
    Some(record)
}

/// Merge token overview fields into a list record.
pub fn apply_overview(record: &mut CandidateRecord, data: &Value) {
    record.holder_count = count("holder", data.get("holder"));
    record.holder_count_24h_ago = count("holder24hAgo", data.get("holder24hAgo"));

    record.buy_volume_24h_usd = lenient_f64("vBuy24hUSD", data.get("vBuy24hUSD"))
        .or_else(|| lenient_f64("buy24h", data.get("buy24h")))
        .map(|v| v.max(0.0))
        .unwrap_or(0.0);
    record.sell_volume_24h_usd = lenient_f64("vSell24hUSD", data.get("vSell24hUSD"))
        .or_else(|| lenient_f64("sell24h", data.get("sell24h")))
        .map(|v| v.max(0.0))
        .unwrap_or(0.0);

    record.volume_1h_usd = lenient_f64("v1hUSD", data.get("v1hUSD"));
    record.price_change_1h_pct = lenient_f64("priceChange1hPercent", data.get("priceChange1hPercent"));
    // Closest reported window when 6h is missing
    record.price_change_6h_pct = lenient_f64("priceChange6hPercent", data.get("priceChange6hPercent"))
        .or_else(|| lenient_f64("priceChange4hPercent", data.get("priceChange4hPercent")));
    if let Some(change) = lenient_f64("priceChange24hPercent", data.get("priceChange24hPercent")) {
        record.price_change_24h_pct = Some(change);
    }
    record.top_holder_pct = lenient_f64("top10HolderPercent", data.get("top10HolderPercent"));
}

pub fn chart_url(address: &str) -> String {
    format!("https://dexscreener.com/solana/{}", address)
}

#[async_trait]
impl SourceAdapter for BirdeyeAdapter {
    fn source(&self) -> Source {
        Source::Birdeye
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult<Vec<CandidateRecord>> {
        let tokens = self.token_list().await?;

        let mut listed = Vec::new();
        for token in tokens.iter().take(self.config.max_tokens) {
            match parse_list_token(token) {
                Some(record) => listed.push(record),
                None => warn!(cycle_id = %ctx.cycle_id, source = "birdeye", "Token without address dropped"),
            }
        }

        // `buffered` keeps list order
        let results: Vec<(CandidateRecord, bool)> = stream::iter(listed)
            .map(|record| self.enrich(ctx, record))
            .buffered(OVERVIEW_CONCURRENCY)
            .collect()
            .await;
        let enriched = results.iter().filter(|(_, merged)| *merged).count();
        let records: Vec<CandidateRecord> = results.into_iter().map(|(record, _)| record).collect();

        info!(
            cycle_id = %ctx.cycle_id,
            source = "birdeye",
            listed = tokens.len(),
            records = records.len(),
            enriched,
            "Birdeye batch fetched"
        );
        Ok(records)
    }

    /// Token list, then the overview calls in waves of `OVERVIEW_CONCURRENCY`
    fn call_rounds(&self) -> u32 {
        1 + self.config.max_tokens.div_ceil(OVERVIEW_CONCURRENCY) as u32
    }
}
