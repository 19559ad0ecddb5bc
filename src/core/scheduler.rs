//! Periodic scan task
//!
//! Ticks the orchestrator on a fixed period. A tick that arrives while a
//! cycle is still in flight is skipped, never queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::orchestrator::{CycleOutcome, CycleReport, ScanOrchestrator};

/// Orchestrator shared between the scan task and anything that inspects it
pub type SharedOrchestrator = Arc<Mutex<ScanOrchestrator>>;

/// Point-in-time view served by the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub started_at: DateTime<Utc>,
    pub cycles: u64,
    pub skipped_ticks: u64,
    pub alerts_sent: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<String>,
}

/// Shared, cheaply clonable health counters
#[derive(Debug, Clone)]
pub struct HealthState {
    inner: Arc<RwLock<HealthSnapshot>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HealthSnapshot {
                started_at: Utc::now(),
                cycles: 0,
                skipped_ticks: 0,
                alerts_sent: 0,
                last_cycle_at: None,
                last_outcome: None,
            })),
        }
    }

    pub async fn record_cycle(&self, report: &CycleReport) {
        let mut snap = self.inner.write().await;
        snap.cycles += 1;
        snap.last_cycle_at = Some(report.evaluated_at);
        snap.last_outcome = Some(report.outcome.label().to_string());
        if matches!(report.outcome, CycleOutcome::Dispatched { .. }) {
            snap.alerts_sent += 1;
        }
    }

    pub async fn record_skip(&self) {
        self.inner.write().await.skipped_ticks += 1;
    }

    pub async fn snapshot(&self) -> HealthSnapshot {
        self.inner.read().await.clone()
    }
}

/// Try to start a cycle. Returns `None` when the previous one still holds
/// the orchestrator.
pub fn try_start_cycle(orchestrator: &SharedOrchestrator, health: &HealthState) -> Option<JoinHandle<()>> {
    let guard = match Arc::clone(orchestrator).try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => return None,
    };
    let health = health.clone();

    Some(tokio::spawn(async move {
        let mut orchestrator = guard;
        let report = orchestrator.run_cycle().await;
        drop(orchestrator);

        info!(
            cycle_id = %report.cycle_id,
            outcome = report.outcome.label(),
            fetched = report.fetched,
            qualified = report.qualified,
            failed_sources = report.adapter_failures.len(),
            "Scan cycle complete"
        );
        health.record_cycle(&report).await;
    }))
}

/// Run the scan loop until shutdown. The first cycle starts immediately.
pub async fn run_scan_loop(
    orchestrator: SharedOrchestrator,
    period: Duration,
    health: HealthState,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<JoinHandle<()>> = None;

    info!(period_secs = period.as_secs(), "Scan loop started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Scan loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                match try_start_cycle(&orchestrator, &health) {
                    Some(handle) => in_flight = Some(handle),
                    None => {
                        warn!("Previous scan cycle still running, skipping tick");
                        health.record_skip().await;
                    }
                }
            }
        }
    }

    // External calls are timeout-bounded, so the last cycle finishes quickly
    if let Some(handle) = in_flight {
        if let Err(e) = handle.await {
            debug!(error = %e, "In-flight cycle ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_utils::{ScriptedSink, ScriptedSource};
    use crate::core::orchestrator::OrchestratorConfig;
    use crate::core::scoring::ScoringPipeline;
    use crate::core::types::Source;

    fn orchestrator_with(source: Arc<ScriptedSource>) -> SharedOrchestrator {
        let orch = ScanOrchestrator::new(
            Arc::new(ScriptedSink::new()),
            ScoringPipeline::new(),
            OrchestratorConfig {
                call_timeout: Duration::from_secs(2),
                ..OrchestratorConfig::default()
            },
        )
        .with_source(source);
        Arc::new(Mutex::new(orch))
    }

    #[tokio::test]
    async fn test_busy_orchestrator_skips_tick() {
        let source = Arc::new(ScriptedSource::hanging(Source::Birdeye, Duration::from_millis(300)));
        let orch = orchestrator_with(source.clone());
        let health = HealthState::new();

        let first = try_start_cycle(&orch, &health).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(try_start_cycle(&orch, &health).is_none());

        first.await.unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(health.snapshot().await.cycles, 1);
        assert_eq!(health.snapshot().await.last_outcome.as_deref(), Some("no_candidate"));
    }

    #[tokio::test]
    async fn test_scan_loop_runs_immediately_and_stops() {
        let source = Arc::new(ScriptedSource::new(Source::Birdeye, Vec::new()));
        let orch = orchestrator_with(source.clone());
        let health = HealthState::new();
        let (tx, rx) = broadcast::channel(1);

        let task = tokio::spawn(run_scan_loop(orch, Duration::from_secs(60), health.clone(), rx));
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(health.snapshot().await.cycles, 1);
    }
}
