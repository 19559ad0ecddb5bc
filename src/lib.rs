//! Solana token scanner
//!
//! Polls market-data sources, scores each token against per-source rules,
//! and sends at most one alert per cooldown window for the best candidate.
//! - Source adapters (Birdeye, DexScreener) and the Telegram alert sink
//! - Filter/scoring pipeline, dedup ledger, cooldown gate, selector
//! - Skip-if-busy scan scheduler and reply tracking

pub mod adapters;
pub mod config;
pub mod core;
pub mod error;
pub mod server;

pub use error::AppError;
