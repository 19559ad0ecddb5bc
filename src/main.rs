//! Token scanner entry point
//!
//! 1. Loads configuration and secrets
//! 2. Builds the enabled source adapters and the Telegram sink
//! 3. Starts the scan loop, the reply poller and the health server
//! 4. Stops all tasks on Ctrl+C

use std::sync::Arc;

use tokio::signal;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{error, info, warn};

use token_scanner::adapters::{
    format_startup_notice, BirdeyeAdapter, BirdeyeConfig, DexScreenerAdapter, DexScreenerConfig,
    SourceAdapter, TelegramConfig, TelegramReplies, TelegramSink,
};
use token_scanner::config::{self, constants, AppConfig, Credentials};
use token_scanner::core::{run_response_loop, run_scan_loop, HealthState, ScanOrchestrator, Source};
use token_scanner::server;

fn build_source(
    source: &config::SourceConfig,
    app: &AppConfig,
    credentials: &Credentials,
) -> anyhow::Result<Arc<dyn SourceAdapter>> {
    let timeout = app.scanner.request_timeout();
    let adapter: Arc<dyn SourceAdapter> = match source.kind {
        Source::Birdeye => {
            let api_key = credentials
                .birdeye_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("BIRDEYE_API_KEY is required for the birdeye source"))?;
            let mut cfg = BirdeyeConfig::new(api_key);
            cfg.max_tokens = source.max_tokens;
            cfg.request_timeout = timeout;
            cfg.enrich_floor = Some(source.rules()?.filters);
            Arc::new(BirdeyeAdapter::new(cfg))
        }
        Source::DexScreener => Arc::new(DexScreenerAdapter::new(DexScreenerConfig {
            max_tokens: source.max_tokens,
            request_timeout: timeout,
            ..DexScreenerConfig::default()
        })),
    };
    Ok(adapter)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    config::init_logging();

    info!("Token scanner starting...");

    let config_path = constants::config_path();
    let app = match config::load_config_or_default(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, path = %config_path.display(), "Configuration failed");
            return Err(e.into());
        }
    };
    let credentials = Credentials::from_env(app.source_enabled(Source::Birdeye))?;

    for source in app.enabled_sources() {
        info!(
            source = %source.kind,
            mode = %source.mode,
            max_tokens = source.max_tokens,
            "Source enabled"
        );
    }
    info!(
        scan_interval_secs = app.scanner.scan_interval_secs,
        cooldown_secs = app.scanner.cooldown_secs,
        bullish_threshold = app.scanner.bullish_threshold,
        ledger_capacity = app.scanner.ledger_capacity,
        "Scanner configured"
    );

    // Telegram
    let mut telegram = TelegramConfig::new(
        credentials.telegram_bot_token.clone(),
        credentials.telegram_chat_id.clone(),
    );
    telegram.api_base = app.telegram.api_base.clone();
    telegram.disable_preview = app.telegram.disable_preview;
    telegram.request_timeout = app.scanner.request_timeout();
    let sink = Arc::new(TelegramSink::new(telegram.clone()));
    let replies = TelegramReplies::new(telegram);

    // Orchestrator
    let (notice_tx, notice_rx) = mpsc::channel(constants::ALERT_NOTICE_CAPACITY);
    let mut orchestrator = ScanOrchestrator::new(
        sink.clone(),
        app.scoring_pipeline()?,
        app.scanner.orchestrator_config(),
    )
    .with_alert_notices(notice_tx);
    for source in app.enabled_sources() {
        orchestrator = orchestrator.with_source(build_source(source, &app, &credentials)?);
    }
    let orchestrator = Arc::new(Mutex::new(orchestrator));

    // Shutdown
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let shutdown_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Graceful shutdown initiated");
                let _ = shutdown_signal.send(());
            }
            Err(err) => error!(error = %err, "Failed to listen for Ctrl+C signal"),
        }
    });

    let health = HealthState::new();
    let port = constants::health_port();
    let server_task = tokio::spawn(server::start_server(health.clone(), port, shutdown_tx.subscribe()));

    if constants::startup_notice_enabled() {
        let sources: Vec<_> = app.enabled_sources().map(|s| (s.kind, s.mode)).collect();
        let notice = format_startup_notice(&sources, app.scanner.bullish_threshold, app.scanner.cooldown_secs);
        if let Err(e) = sink.send_text(&notice).await {
            warn!(error = %e, "Startup notice not delivered");
        }
    }

    let scan_task = tokio::spawn(run_scan_loop(
        orchestrator,
        app.scanner.scan_interval(),
        health,
        shutdown_tx.subscribe(),
    ));
    let response_task = tokio::spawn(run_response_loop(
        replies,
        notice_rx,
        app.scanner.response_poll_interval(),
        shutdown_tx.subscribe(),
    ));

    info!(port, "Scanner running");

    let (scan, responses) = tokio::join!(scan_task, response_task);
    if let Err(e) = scan {
        error!(error = %e, "Scan task failed");
    }
    match responses {
        Ok(tracker) => info!(
            open_alerts = tracker.open_count(),
            decisions = tracker.recent_decisions().count(),
            "Response tracker stopped"
        ),
        Err(e) => error!(error = %e, "Response task failed"),
    }
    match server_task.await {
        Ok(Err(e)) => error!(error = %e, "Health server failed"),
        Err(e) => error!(error = %e, "Health server task failed"),
        Ok(Ok(())) => {}
    }

    info!("Clean exit");
    Ok(())
}
