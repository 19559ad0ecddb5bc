//! Collaborator contracts consumed by the scan orchestrator
//!
//! Source adapters turn provider payloads into `CandidateRecord`s, the alert
//! sink delivers the cycle winner, and the reply source feeds the response
//! tracker with human answers to earlier alerts.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::errors::{DispatchResult, FetchResult};
use crate::core::types::{CandidateRecord, ScoredCandidate, Source};

/// Per-cycle context handed to every adapter by value
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    /// Correlation id for log lines of this cycle
    pub cycle_id: Uuid,
    /// Copy of the deduplication ledger at cycle start
    pub already_alerted: HashSet<String>,
}

impl FetchContext {
    pub fn new(cycle_id: Uuid, already_alerted: HashSet<String>) -> Self {
        Self {
            cycle_id,
            already_alerted,
        }
    }

    /// Adapters use this to skip enrichment calls for assets that can no
    /// longer win.
    pub fn is_alerted(&self, asset_id: &str) -> bool {
        self.already_alerted.contains(asset_id)
    }
}

/// Market-data source producing candidate records
///
/// # Example Implementation
///
/// ```ignore
/// struct StaticSource(Vec<CandidateRecord>);
///
/// #[async_trait]
/// impl SourceAdapter for StaticSource {
///     fn source(&self) -> Source {
///         Source::Birdeye
///     }
///
///     async fn fetch(&self, _ctx: &FetchContext) -> FetchResult<Vec<CandidateRecord>> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which source this adapter reports as
    fn source(&self) -> Source;

    /// Fetch and normalize the current batch.
    ///
    /// An empty batch is a valid result. Transport or payload failures for
    /// the whole batch return `Err`; a single bad record is coerced or
    /// dropped inside the adapter.
    async fn fetch(&self, ctx: &FetchContext) -> FetchResult<Vec<CandidateRecord>>;

    /// Worst-case number of back-to-back external calls one `fetch` makes.
    ///
    /// Each call is bounded by the per-call timeout on its own, so the whole
    /// fetch is given that timeout once per round.
    fn call_rounds(&self) -> u32 {
        1
    }
}

/// Opaque identity of a delivered alert, used to correlate replies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeliveryHandle(pub String);

impl std::fmt::Display for DeliveryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery channel for the cycle winner
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn dispatch(&self, winner: &ScoredCandidate) -> DispatchResult<DeliveryHandle>;
}

impl DeliveryHandle {
    /// Numeric message id, when the sink issues increasing ids
    pub fn sequence(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

/// One human message received after an alert
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    /// Alert the message answers, when the client threaded it
    pub reply_to: Option<DeliveryHandle>,
    /// Id of the reply itself, comparable with `DeliveryHandle::sequence`
    pub message_id: Option<i64>,
}

/// Source of human replies to earlier alerts
#[async_trait]
pub trait ReplySource: Send {
    /// Acknowledge everything received before startup without returning it
    async fn skip_backlog(&mut self) -> FetchResult<usize> {
        Ok(0)
    }

    /// Return replies received since the previous poll
    async fn poll_replies(&mut self) -> FetchResult<Vec<Reply>>;
}
