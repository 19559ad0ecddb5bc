//! End-to-End Integration Tests
//!
//! Runs complete scan cycles through the public API:
//! 1. Two sources feeding one orchestrator
//! 2. Scoring, dedup, selection and cooldown gating
//! 3. Dispatch success and failure, and the resulting ledger/cooldown state
//! 4. Config-driven pipeline construction
//!
//! # Running the tests
//! ```bash
//! cargo test --test full_cycle
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc;

use token_scanner::adapters::errors::{DispatchError, DispatchResult, FetchError, FetchResult};
use token_scanner::adapters::{AlertSink, DeliveryHandle, FetchContext, SourceAdapter};
use token_scanner::config::load_config_from_str;
use token_scanner::core::{
    CandidateRecord, CycleOutcome, OrchestratorConfig, ScanOrchestrator, ScanPhase, ScoredCandidate,
    ScoringPipeline, ScoringProfile, Source, SourceMode,
};

// =============================================================================
// Mock source
// =============================================================================

/// Source whose next batch can be swapped between cycles
struct MockSource {
    source: Source,
    batch: Mutex<Result<Vec<CandidateRecord>, String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    fn new(source: Source, batch: Vec<CandidateRecord>) -> Arc<Self> {
        Arc::new(Self {
            source,
            batch: Mutex::new(Ok(batch)),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(source: Source, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            source,
            batch: Mutex::new(Ok(Vec::new())),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    fn set_batch(&self, batch: Vec<CandidateRecord>) {
        *self.batch.lock().unwrap() = Ok(batch);
    }

    fn set_error(&self, message: &str) {
        *self.batch.lock().unwrap() = Err(message.to_string());
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self, _ctx: &FetchContext) -> FetchResult<Vec<CandidateRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.batch.lock().unwrap().clone().map_err(FetchError::Http)
    }
}

// =============================================================================
// Mock sink
// =============================================================================

#[derive(Default)]
struct MockSink {
    fail: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl MockSink {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for MockSink {
    async fn dispatch(&self, winner: &ScoredCandidate) -> DispatchResult<DeliveryHandle> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::Http("connection reset".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(winner.record.asset_id.clone());
        Ok(DeliveryHandle(format!("msg-{}", sent.len())))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
}

/// Established record from the reference scenario: buy/sell ratio 2.5
fn established(id: &str) -> CandidateRecord {
    let mut r = CandidateRecord::new(id, Source::Birdeye, format!("{}-SYM", id));
    r.liquidity_usd = 60_000.0;
    r.volume_24h_usd = 25_000.0;
    r.market_cap_usd = 150_000.0;
    r.price_change_24h_pct = Some(4.0);
    r.holder_count = Some(1_050);
    r.holder_count_24h_ago = Some(1_000);
    r.buy_volume_24h_usd = 25_000.0;
    r.sell_volume_24h_usd = 10_000.0;
    r
}

fn illiquid(id: &str) -> CandidateRecord {
    let mut r = CandidateRecord::new(id, Source::DexScreener, "THIN");
    r.liquidity_usd = 1_000.0;
    r.volume_24h_usd = 90_000.0;
    r.market_cap_usd = 900_000.0;
    r.price_change_6h_pct = Some(40.0);
    r.price_change_24h_pct = Some(80.0);
    r
}

fn pipeline() -> ScoringPipeline {
    ScoringPipeline::new()
        .with_profile(Source::Birdeye, ScoringProfile::for_mode(SourceMode::Established))
        .with_profile(Source::DexScreener, ScoringProfile::for_mode(SourceMode::NewListing))
}

fn config(capacity: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        bullish_threshold: 5.0,
        ledger_capacity: capacity,
        cooldown: chrono::Duration::seconds(180),
        call_timeout: Duration::from_millis(250),
    }
}

fn orchestrator(
    sink: Arc<MockSink>,
    sources: &[Arc<MockSource>],
    capacity: usize,
) -> ScanOrchestrator {
    let mut orch = ScanOrchestrator::new(sink, pipeline(), config(capacity));
    for s in sources {
        orch = orch.with_source(s.clone());
    }
    orch
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_end_to_end_two_sources() {
    let sink = Arc::new(MockSink::default());
    let birdeye = MockSource::new(Source::Birdeye, vec![established("MintGood")]);
    let dex = MockSource::new(Source::DexScreener, vec![illiquid("MintThin")]);
    let mut orch = orchestrator(sink.clone(), &[birdeye.clone(), dex.clone()], 30);

    let report = orch.run_cycle_at(t0()).await;

    assert_eq!(report.fetched, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.qualified, 1);
    let winner = report.winner.expect("winner");
    assert_eq!(winner.record.asset_id, "MintGood");
    assert!(winner.score >= 5.0);
    assert_eq!(
        report.outcome,
        CycleOutcome::Dispatched {
            asset_id: "MintGood".to_string(),
            handle: DeliveryHandle("msg-1".to_string()),
        }
    );
    assert!(orch.ledger().contains("MintGood"));
    assert!(!orch.ledger().contains("MintThin"));
    assert_eq!(orch.cooldown().last_alert_at(), Some(t0()));
    assert_eq!(orch.phase(), ScanPhase::Idle);
    assert_eq!(birdeye.calls.load(Ordering::SeqCst), 1);
    assert_eq!(dex.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_pool_mutates_nothing() {
    let sink = Arc::new(MockSink::default());
    let a = MockSource::new(Source::Birdeye, Vec::new());
    let b = MockSource::new(Source::DexScreener, Vec::new());
    let mut orch = orchestrator(sink.clone(), &[a, b], 30);

    let report = orch.run_cycle_at(t0()).await;

    assert_eq!(report.outcome, CycleOutcome::NoCandidate);
    assert!(report.winner.is_none());
    assert!(sink.sent().is_empty());
    assert!(orch.ledger().is_empty());
    assert!(orch.cooldown().last_alert_at().is_none());
}

#[tokio::test]
async fn test_gated_winner_stays_eligible() {
    let sink = Arc::new(MockSink::default());
    let source = MockSource::new(Source::Birdeye, vec![established("MintOne")]);
    let mut orch = orchestrator(sink.clone(), &[source.clone()], 30);

    orch.run_cycle_at(t0()).await;
    source.set_batch(vec![established("MintTwo")]);

    let gated = orch.run_cycle_at(t0() + chrono::Duration::seconds(179)).await;
    assert!(matches!(gated.outcome, CycleOutcome::Gated { ref asset_id, .. } if asset_id == "MintTwo"));
    assert!(!orch.ledger().contains("MintTwo"));
    assert_eq!(orch.ledger().len(), 1);
    assert_eq!(orch.cooldown().last_alert_at(), Some(t0()));

    let later = orch.run_cycle_at(t0() + chrono::Duration::seconds(180)).await;
    assert_eq!(later.outcome.label(), "dispatched");
    assert_eq!(sink.sent(), vec!["MintOne".to_string(), "MintTwo".to_string()]);
}

#[tokio::test]
async fn test_dedup_blocks_repeat_winner() {
    let sink = Arc::new(MockSink::default());
    let source = MockSource::new(Source::Birdeye, vec![established("MintSame")]);
    let mut orch = orchestrator(sink.clone(), &[source.clone()], 30);

    orch.run_cycle_at(t0()).await;

    // Even a much stronger observation of the same asset cannot win again
    let mut stronger = established("MintSame");
    stronger.buy_volume_24h_usd = 90_000.0;
    source.set_batch(vec![stronger]);

    for hour in 1..4 {
        let report = orch.run_cycle_at(t0() + chrono::Duration::hours(hour)).await;
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.outcome, CycleOutcome::NoCandidate);
    }
    assert_eq!(sink.sent(), vec!["MintSame".to_string()]);
}

#[tokio::test]
async fn test_ledger_keeps_most_recent_dispatches() {
    let sink = Arc::new(MockSink::default());
    let source = MockSource::new(Source::Birdeye, Vec::new());
    let mut orch = orchestrator(sink.clone(), &[source.clone()], 3);

    for i in 0..5 {
        source.set_batch(vec![established(&format!("Mint{}", i))]);
        let at = t0() + chrono::Duration::minutes(5 * i as i64);
        let report = orch.run_cycle_at(at).await;
        assert_eq!(report.outcome.label(), "dispatched");
    }

    assert_eq!(orch.ledger().len(), 3);
    let kept: Vec<&str> = orch.ledger().iter().collect();
    assert_eq!(kept, vec!["Mint2", "Mint3", "Mint4"]);

    // Evicted assets become eligible again
    source.set_batch(vec![established("Mint0")]);
    let report = orch.run_cycle_at(t0() + chrono::Duration::hours(2)).await;
    assert_eq!(report.outcome.label(), "dispatched");
}

#[tokio::test]
async fn test_dispatch_failure_then_retry() {
    let sink = Arc::new(MockSink::default());
    sink.fail.store(true, Ordering::SeqCst);
    let source = MockSource::new(Source::Birdeye, vec![established("MintRetry")]);
    let mut orch = orchestrator(sink.clone(), &[source], 30);

    let failed = orch.run_cycle_at(t0()).await;
    assert!(matches!(failed.outcome, CycleOutcome::DispatchFailed { .. }));
    assert!(orch.ledger().is_empty());
    assert!(orch.cooldown().last_alert_at().is_none());

    sink.fail.store(false, Ordering::SeqCst);
    let retried = orch.run_cycle_at(t0() + chrono::Duration::seconds(30)).await;
    assert_eq!(retried.outcome.label(), "dispatched");
    assert_eq!(orch.cooldown().last_alert_at(), Some(t0() + chrono::Duration::seconds(30)));
}

#[tokio::test]
async fn test_failing_and_slow_sources_are_isolated() {
    let sink = Arc::new(MockSink::default());
    let broken = MockSource::new(Source::DexScreener, Vec::new());
    broken.set_error("503 service unavailable");
    let slow = MockSource::slow(Source::DexScreener, Duration::from_secs(10));
    let good = MockSource::new(Source::Birdeye, vec![established("MintOk")]);
    let mut orch = orchestrator(sink.clone(), &[broken, slow, good], 30);

    let started = std::time::Instant::now();
    let report = orch.run_cycle_at(t0()).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.adapter_failures.len(), 2);
    assert_eq!(sink.sent(), vec!["MintOk".to_string()]);
}

#[tokio::test]
async fn test_alert_notice_reaches_tracker_channel() {
    let sink = Arc::new(MockSink::default());
    let (tx, mut rx) = mpsc::channel(4);
    let source = MockSource::new(Source::Birdeye, vec![established("MintNote")]);
    let mut orch = orchestrator(sink, &[source], 30).with_alert_notices(tx);

    orch.run_cycle_at(t0()).await;

    let notice = rx.recv().await.unwrap();
    assert_eq!(notice.asset_id, "MintNote");
    assert_eq!(notice.symbol, "MintNote-SYM");
    assert_eq!(notice.handle, DeliveryHandle("msg-1".to_string()));
}

#[tokio::test]
async fn test_pipeline_from_yaml_config() {
    let yaml = r#"
scanner:
  bullish_threshold: 7.0
  ledger_capacity: 5
sources:
  - kind: birdeye
    mode: established
"#;
    let app = load_config_from_str(yaml).unwrap();
    let sink = Arc::new(MockSink::default());
    let source = MockSource::new(Source::Birdeye, vec![established("MintCfg")]);

    let mut orch = ScanOrchestrator::new(
        sink.clone(),
        app.scoring_pipeline().unwrap(),
        app.scanner.orchestrator_config(),
    )
    .with_source(source);

    // Scores 6.0: passes the hard filters but misses the raised threshold
    let report = orch.run_cycle_at(t0()).await;
    assert_eq!(report.below_threshold, 1);
    assert_eq!(report.outcome, CycleOutcome::NoCandidate);
    assert_eq!(orch.ledger().capacity(), 5);
    assert!(sink.sent().is_empty());
}
