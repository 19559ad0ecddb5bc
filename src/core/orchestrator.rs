//! Scan orchestrator
//!
//! Drives one full cycle:
//! `Idle → Fetching → Scoring → Selecting → (Gated | Dispatching) → Idle`.
//!
//! The orchestrator exclusively owns the deduplication ledger and the
//! cooldown gate. Both are mutated in one place only, after the alert sink
//! reports success, and always together.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::adapters::errors::{DispatchError, FetchError};
use crate::adapters::traits::{AlertSink, DeliveryHandle, FetchContext, SourceAdapter};
use crate::core::cooldown::CooldownGate;
use crate::core::ledger::DedupLedger;
use crate::core::scoring::ScoringPipeline;
use crate::core::selector::select_winner;
use crate::core::types::{CandidateRecord, ScoredCandidate, Source};

/// Tunables consumed by the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub bullish_threshold: f64,
    pub ledger_capacity: usize,
    pub cooldown: chrono::Duration,
    /// Deadline for one external call. The alert dispatch gets it once; an
    /// adapter fetch gets it once per `SourceAdapter::call_rounds`.
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bullish_threshold: 5.0,
            ledger_capacity: crate::core::ledger::DEFAULT_LEDGER_CAPACITY,
            cooldown: chrono::Duration::seconds(180),
            call_timeout: Duration::from_secs(15),
        }
    }
}

/// Current position in the cycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Fetching,
    Scoring,
    Selecting,
    Gated,
    Dispatching,
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Nothing qualified
    NoCandidate,
    /// A winner existed but the cooldown was still running
    Gated {
        asset_id: String,
        remaining_secs: i64,
    },
    Dispatched {
        asset_id: String,
        handle: DeliveryHandle,
    },
    /// The sink failed; state untouched so the asset can win again
    DispatchFailed { asset_id: String, error: String },
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::NoCandidate => "no_candidate",
            CycleOutcome::Gated { .. } => "gated",
            CycleOutcome::Dispatched { .. } => "dispatched",
            CycleOutcome::DispatchFailed { .. } => "dispatch_failed",
        }
    }
}

/// Counters and outcome of one cycle, for logs and the health endpoint
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub fetched: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub below_threshold: usize,
    pub qualified: usize,
    pub adapter_failures: Vec<(Source, String)>,
    pub winner: Option<ScoredCandidate>,
    pub outcome: CycleOutcome,
}

/// Notification that an alert went out, consumed by the response tracker
#[derive(Debug, Clone, PartialEq)]
pub struct AlertNotice {
    pub handle: DeliveryHandle,
    pub asset_id: String,
    pub symbol: String,
}

/// Owns the scan state and runs cycles against the configured collaborators
pub struct ScanOrchestrator {
    sources: Vec<Arc<dyn SourceAdapter>>,
    sink: Arc<dyn AlertSink>,
    pipeline: ScoringPipeline,
    ledger: DedupLedger,
    cooldown: CooldownGate,
    config: OrchestratorConfig,
    phase: ScanPhase,
    notices: Option<mpsc::Sender<AlertNotice>>,
}

impl ScanOrchestrator {
    pub fn new(sink: Arc<dyn AlertSink>, pipeline: ScoringPipeline, config: OrchestratorConfig) -> Self {
        Self {
            sources: Vec::new(),
            sink,
            pipeline,
            ledger: DedupLedger::new(config.ledger_capacity),
            cooldown: CooldownGate::new(config.cooldown),
            config,
            phase: ScanPhase::Idle,
            notices: None,
        }
    }

    /// Append a source. Sources are invoked, and ties broken, in the order added.
    pub fn with_source(mut self, source: Arc<dyn SourceAdapter>) -> Self {
        self.sources.push(source);
        self
    }

    /// Forward each successful dispatch to the response tracker.
    pub fn with_alert_notices(mut self, tx: mpsc::Sender<AlertNotice>) -> Self {
        self.notices = Some(tx);
        self
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn cooldown(&self) -> &CooldownGate {
        &self.cooldown
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Run one cycle evaluated at the current time.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle evaluated at `now`.
    ///
    /// Never fails: adapter and sink errors are logged, reflected in the
    /// report, and the machine returns to `Idle`.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let mut report = CycleReport {
            cycle_id,
            evaluated_at: now,
            fetched: 0,
            duplicates: 0,
            rejected: 0,
            below_threshold: 0,
            qualified: 0,
            adapter_failures: Vec::new(),
            winner: None,
            outcome: CycleOutcome::NoCandidate,
        };

        // Fetching
        self.phase = ScanPhase::Fetching;
        let ctx = FetchContext::new(cycle_id, self.ledger.snapshot());
        let batches = self.fetch_all(&ctx).await;

        // Scoring
        self.phase = ScanPhase::Scoring;
        let mut pool = Vec::new();
        for (source, batch) in batches {
            match batch {
                Ok(records) => {
                    report.fetched += records.len();
                    self.score_batch(cycle_id, source, records, &mut pool, &mut report);
                }
                Err(e) => {
                    warn!(cycle_id = %cycle_id, source = %source, error = %e, "Source failed, continuing without it");
                    report.adapter_failures.push((source, e.to_string()));
                }
            }
        }
        report.qualified = pool.len();

        // Selecting
        self.phase = ScanPhase::Selecting;
        let winner = match select_winner(&pool) {
            Some(w) => w.clone(),
            None => {
                info!(
                    cycle_id = %cycle_id,
                    fetched = report.fetched,
                    duplicates = report.duplicates,
                    rejected = report.rejected,
                    below_threshold = report.below_threshold,
                    "No candidate qualified this cycle"
                );
                self.phase = ScanPhase::Idle;
                return report;
            }
        };
        report.winner = Some(winner.clone());

        info!(
            cycle_id = %cycle_id,
            asset_id = %winner.record.asset_id,
            symbol = %winner.record.display_symbol,
            source = %winner.record.source,
            score = winner.score,
            buy_sell_ratio = %winner.buy_sell_ratio(),
            pool = pool.len(),
            "Best signal selected"
        );

        if !self.cooldown.allowed(now) {
            self.phase = ScanPhase::Gated;
            let remaining_secs = self.cooldown.remaining(now).num_seconds();
            info!(
                cycle_id = %cycle_id,
                asset_id = %winner.record.asset_id,
                remaining_secs,
                "Cooldown active, alert suppressed"
            );
            report.outcome = CycleOutcome::Gated {
                asset_id: winner.record.asset_id.clone(),
                remaining_secs,
            };
            self.phase = ScanPhase::Idle;
            return report;
        }

        // Dispatching
        self.phase = ScanPhase::Dispatching;
        report.outcome = match self.dispatch(&winner).await {
            Ok(handle) => {
                self.commit_alert(&winner.record.asset_id, now);
                info!(
                    cycle_id = %cycle_id,
                    asset_id = %winner.record.asset_id,
                    symbol = %winner.record.display_symbol,
                    handle = %handle,
                    ledger_len = self.ledger.len(),
                    "Alert dispatched"
                );
                self.notify(&handle, &winner).await;
                CycleOutcome::Dispatched {
                    asset_id: winner.record.asset_id.clone(),
                    handle,
                }
            }
            Err(e) => {
                error!(
                    cycle_id = %cycle_id,
                    asset_id = %winner.record.asset_id,
                    error = %e,
                    "Alert dispatch failed, state left unchanged"
                );
                CycleOutcome::DispatchFailed {
                    asset_id: winner.record.asset_id.clone(),
                    error: e.to_string(),
                }
            }
        };

        self.phase = ScanPhase::Idle;
        report
    }

    /// Invoke every source concurrently and join in configured order.
    async fn fetch_all(
        &self,
        ctx: &FetchContext,
    ) -> Vec<(Source, Result<Vec<CandidateRecord>, FetchError>)> {
        let call_timeout = self.config.call_timeout;
        let calls = self.sources.iter().map(|adapter| async move {
            let source = adapter.source();
            let timeout = call_timeout.saturating_mul(adapter.call_rounds().max(1));
            let result = match tokio::time::timeout(timeout, adapter.fetch(ctx)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(timeout.as_millis() as u64)),
            };
            (source, result)
        });
        join_all(calls).await
    }

    fn score_batch(
        &self,
        cycle_id: Uuid,
        source: Source,
        records: Vec<CandidateRecord>,
        pool: &mut Vec<ScoredCandidate>,
        report: &mut CycleReport,
    ) {
        let mut seen = HashSet::new();

        for record in records {
            if record.asset_id.trim().is_empty() {
                warn!(cycle_id = %cycle_id, source = %source, symbol = %record.display_symbol, "Dropping record without asset id");
                report.rejected += 1;
                continue;
            }
            if !seen.insert(record.asset_id.clone()) {
                debug!(cycle_id = %cycle_id, source = %source, asset_id = %record.asset_id, "Duplicate record in batch");
                continue;
            }
            if self.ledger.contains(&record.asset_id) {
                debug!(cycle_id = %cycle_id, asset_id = %record.asset_id, "Already alerted, skipping");
                report.duplicates += 1;
                continue;
            }

            let scored = self.pipeline.score(&record);
            debug!(
                cycle_id = %cycle_id,
                source = %source,
                asset_id = %record.asset_id,
                symbol = %record.display_symbol,
                passed = scored.passed,
                score = scored.score,
                signals = ?scored.signals,
                warnings = ?scored.warnings,
                "Scored candidate"
            );

            if !scored.passed {
                report.rejected += 1;
            } else if !scored.is_bullish(self.config.bullish_threshold) {
                report.below_threshold += 1;
            } else {
                pool.push(scored);
            }
        }
    }

    async fn dispatch(&self, winner: &ScoredCandidate) -> Result<DeliveryHandle, DispatchError> {
        let timeout = self.config.call_timeout;
        match tokio::time::timeout(timeout, self.sink.dispatch(winner)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Single writer for ledger and cooldown: both change or neither does.
    fn commit_alert(&mut self, asset_id: &str, at: DateTime<Utc>) {
        self.ledger.record(asset_id);
        self.cooldown.mark_alerted(at);
    }

    async fn notify(&self, handle: &DeliveryHandle, winner: &ScoredCandidate) {
        if let Some(tx) = &self.notices {
            let notice = AlertNotice {
                handle: handle.clone(),
                asset_id: winner.record.asset_id.clone(),
                symbol: winner.record.display_symbol.clone(),
            };
            if tx.send(notice).await.is_err() {
                debug!("Response tracker gone, alert notice dropped");
            }
        }
    }
}
