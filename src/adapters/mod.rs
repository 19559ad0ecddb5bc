//! Source adapters for Birdeye and DexScreener, and the Telegram alert sink
//!
//! Each adapter turns a provider payload into normalized `CandidateRecord`s
//! or delivers an alert. Nothing in here scores or decides.

pub mod birdeye;
pub mod dexscreener;
pub mod errors;
pub mod fields;
pub mod telegram;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types for convenience
pub use birdeye::{BirdeyeAdapter, BirdeyeConfig};
pub use dexscreener::{DexScreenerAdapter, DexScreenerConfig};
pub use errors::{DispatchError, DispatchResult, FetchError, FetchResult, MalformedRecordError};
pub use telegram::{format_alert, format_startup_notice, TelegramConfig, TelegramReplies, TelegramSink};
pub use traits::{AlertSink, DeliveryHandle, FetchContext, Reply, ReplySource, SourceAdapter};
