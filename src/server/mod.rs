//! Liveness endpoint for the hosting platform.
//!
//! Uses `axum` for routing. `/health` reports scan loop counters.

use axum::{extract::State, response::Json, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::core::scheduler::HealthState;

pub fn router(health: HealthState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .with_state(health)
}

/// Bind `0.0.0.0:{port}` and serve until shutdown.
pub async fn start_server(health: HealthState, port: u16, shutdown: broadcast::Receiver<()>) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!(address = %addr, "Starting health server");
    serve(listener, health, shutdown).await
}

/// Serve on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    health: HealthState,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    axum::serve(listener, router(health))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}

/// GET /: plain liveness text
async fn root_handler() -> &'static str {
    "Token scanner running"
}

/// GET /health: status and scan counters
async fn health_handler(State(health): State<HealthState>) -> Json<serde_json::Value> {
    let snap = health.snapshot().await;
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "started_at": snap.started_at.to_rfc3339(),
        "cycles": snap.cycles,
        "skipped_ticks": snap.skipped_ticks,
        "alerts_sent": snap.alerts_sent,
        "last_cycle_at": snap.last_cycle_at.map(|t| t.to_rfc3339()),
        "last_outcome": snap.last_outcome,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn spawn_server(health: HealthState) -> (String, broadcast::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = broadcast::channel(1);
        tokio::spawn(serve(listener, health, rx));
        (format!("http://{}", addr), tx)
    }

    #[tokio::test]
    async fn test_root_route() {
        let (base, _tx) = spawn_server(HealthState::new()).await;
        let body = reqwest::get(format!("{}/", base)).await.unwrap().text().await.unwrap();
        assert_eq!(body, "Token scanner running");
    }

    #[tokio::test]
    async fn test_health_route_before_first_cycle() {
        let (base, _tx) = spawn_server(HealthState::new()).await;
        let json: Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["cycles"], 0);
        assert!(json["last_cycle_at"].is_null());
        assert!(json["last_outcome"].is_null());
    }
}
