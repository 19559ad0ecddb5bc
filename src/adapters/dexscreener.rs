//! DexScreener source adapter (new listings)
//!
//! Reads the latest token profiles, keeps Solana tokens, then resolves their
//! pairs in one batched call. DexScreener exposes no holder or buy/sell
//! volume data, so those fields stay absent.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::adapters::errors::{FetchError, FetchResult};
use crate::adapters::fields::{amount, lenient_f64, text};
use crate::adapters::traits::{FetchContext, SourceAdapter};
use crate::core::types::{CandidateRecord, Source};

pub const DEXSCREENER_API_BASE: &str = "https://api.dexscreener.com";
const CHAIN_ID: &str = "solana";
/// Addresses accepted per `tokens/v1` call
const MAX_ADDRESSES_PER_CALL: usize = 30;

#[derive(Debug, Clone)]
pub struct DexScreenerConfig {
    pub base_url: String,
    pub max_tokens: usize,
    pub request_timeout: Duration,
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: DEXSCREENER_API_BASE.to_string(),
            max_tokens: 30,
            request_timeout: Duration::from_secs(15),
        }
    }
}

pub struct DexScreenerAdapter {
    config: DexScreenerConfig,
    http_client: reqwest::Client,
}

impl DexScreenerAdapter {
    pub fn new(config: DexScreenerConfig) -> Self {
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

    async fn get_json(&self, path: &str) -> FetchResult<Value> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self.http_client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Solana addresses from the latest profiles, first-seen order, ledger hits removed
    async fn latest_addresses(&self, ctx: &FetchContext) -> FetchResult<Vec<String>> {
        let json = self.get_json("/token-profiles/latest/v1").await?;
        let profiles = json
            .as_array()
            .ok_or_else(|| FetchError::InvalidResponse("profiles is not an array".to_string()))?;

        let mut addresses: Vec<String> = Vec::new();
        for profile in profiles {
            if text(profile.get("chainId")).as_deref() != Some(CHAIN_ID) {
                continue;
            }
            let Some(address) = text(profile.get("tokenAddress")) else {
                continue;
            };
            if ctx.is_alerted(&address) || addresses.contains(&address) {
                continue;
            }
            addresses.push(address);
            if addresses.len() >= self.config.max_tokens {
                break;
            }
        }
        Ok(addresses)
    }

    async fn pairs_for(&self, addresses: &[String]) -> FetchResult<Vec<Value>> {
        let mut pairs = Vec::new();
        for chunk in addresses.chunks(MAX_ADDRESSES_PER_CALL) {
            let path = format!("/tokens/v1/{}/{}", CHAIN_ID, chunk.join(","));
            let json = self.get_json(&path).await?;
            match json {
                Value::Array(items) => pairs.extend(items),
                _ => return Err(FetchError::InvalidResponse("pairs is not an array".to_string())),
            }
        }
        Ok(pairs)
    }
}

fn pair_liquidity(pair: &Value) -> f64 {
    amount("liquidity.usd", pair.get("liquidity").and_then(|l| l.get("usd")))
}

/// Keep the most liquid pair per base token address.
pub fn most_liquid_pairs(pairs: &[Value]) -> HashMap<String, &Value> {
    let mut best: HashMap<String, &Value> = HashMap::new();
    for pair in pairs {
        let Some(address) = text(pair.get("baseToken").and_then(|t| t.get("address"))) else {
            continue;
        };
        let replace = match best.get(&address) {
            Some(current) => pair_liquidity(pair) > pair_liquidity(current),
            None => true,
        };
        if replace {
            best.insert(address, pair);
        }
    }
    best
}

/// Normalize one DexScreener pair into a record keyed by its base token.
pub fn parse_pair(address: &str, pair: &Value) -> CandidateRecord {
    let base = pair.get("baseToken");
    let symbol = text(base.and_then(|b| b.get("symbol"))).unwrap_or_else(|| "UNKNOWN".to_string());
    let window = |group: &str, key: &str| pair.get(group).and_then(|g| g.get(key));

    let mut record = CandidateRecord::new(address, Source::DexScreener, symbol);
    record.price = amount("priceUsd", pair.get("priceUsd"));
    record.liquidity_usd = pair_liquidity(pair);
    record.volume_24h_usd = amount("volume.h24", window("volume", "h24"));
    record.volume_1h_usd = lenient_f64("volume.h1", window("volume", "h1"));
    record.market_cap_usd = lenient_f64("marketCap", pair.get("marketCap"))
        .or_else(|| lenient_f64("fdv", pair.get("fdv")))
        .map(|v| v.max(0.0))
        .unwrap_or(0.0);
    record.price_change_1h_pct = lenient_f64("priceChange.h1", window("priceChange", "h1"));
    record.price_change_6h_pct = lenient_f64("priceChange.h6", window("priceChange", "h6"));
    record.price_change_24h_pct = lenient_f64("priceChange.h24", window("priceChange", "h24"));
    record.chart_url = text(pair.get("url"))
        .unwrap_or_else(|| format!("https://dexscreener.com/{}/{}", CHAIN_ID, address));
    record
}

#[async_trait]
impl SourceAdapter for DexScreenerAdapter {
    fn source(&self) -> Source {
        Source::DexScreener
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult<Vec<CandidateRecord>> {
        let addresses = self.latest_addresses(ctx).await?;
        if addresses.is_empty() {
            debug!(cycle_id = %ctx.cycle_id, source = "dexscreener", "No new Solana profiles");
            return Ok(Vec::new());
        }

        let pairs = self.pairs_for(&addresses).await?;
        let best = most_liquid_pairs(&pairs);

        // Profile order is preserved so selector ties stay deterministic
        let records: Vec<CandidateRecord> = addresses
            .iter()
            .filter_map(|address| best.get(address).map(|pair| parse_pair(address, pair)))
            .collect();

        info!(
            cycle_id = %ctx.cycle_id,
            source = "dexscreener",
            profiles = addresses.len(),
            pairs = pairs.len(),
            records = records.len(),
            "DexScreener batch fetched"
        );
        Ok(records)
    }

    /// Profile list, then one pair lookup per address chunk
    fn call_rounds(&self) -> u32 {
        1 + self.config.max_tokens.div_ceil(MAX_ADDRESSES_PER_CALL) as u32
    }
}
