//! The admin HTTP surface: health, connection state, and metrics.
//!
//! Three read-only endpoints over the shared [`HealthState`]:
//!
//! - `GET /health`      – liveness: `{"status":"ok","uptime":"1m30s"}`.
//! - `GET /connections` – the full health snapshot as JSON.
//! - `GET /metrics`     – plain-text gauge/counter lines for scrapers.
//!
//! Handlers only ever take snapshots; nothing here can block or slow the
//! supervisor's writers.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::Json, routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::health::{HealthSnapshot, HealthState};

/// Builds the admin router.
pub fn router(health: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health_endpoint))
        .route("/connections", get(connections_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(health)
}

/// Serves the admin surface on an already-bound listener until
/// `shutdown` fires.  Binding happens in `main` so that an unusable
/// listen address is a fatal startup error, not a background log line.
///
/// # Errors
///
/// Returns the underlying I/O error if the server loop fails.
pub async fn serve(
    listener: TcpListener,
    health: Arc<HealthState>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("admin listening on {addr}");
    }
    axum::serve(listener, router(health))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn health_endpoint(State(health): State<Arc<HealthState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "uptime": format_uptime(health.uptime()),
    }))
}

async fn connections_endpoint(State(health): State<Arc<HealthState>>) -> Json<HealthSnapshot> {
    Json(health.snapshot())
}

async fn metrics_endpoint(State(health): State<Arc<HealthState>>) -> String {
    let snap = health.snapshot();
    let mut out = String::new();
    out.push_str(&format!(
        "gateway_uptime_seconds {}\n",
        health.uptime().as_secs()
    ));
    out.push_str(&format!("gateway_tx_messages_total {}\n", snap.tx_msgs));
    out.push_str(&format!("gateway_rx_messages_total {}\n", snap.rx_msgs));
    out.push_str(&format!("gateway_errors_total {}\n", snap.errs));
    out.push_str(&format!("gateway_up {}\n", u8::from(snap.up)));
    out
}

/// Renders an uptime as `XhYmZs`, omitting leading zero units.
fn format_uptime(d: Duration) -> String {
    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime_variants() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0s");
        assert_eq!(format_uptime(Duration::from_secs(42)), "42s");
        assert_eq!(format_uptime(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_uptime(Duration::from_secs(3700)), "1h1m40s");
        assert_eq!(format_uptime(Duration::from_secs(86_400)), "24h0m0s");
    }

    #[tokio::test]
    async fn test_health_endpoint_payload() {
        let health = Arc::new(HealthState::new("x:1"));
        let Json(body) = health_endpoint(State(health)).await;
        assert_eq!(body["status"], "ok");
        assert!(body["uptime"].is_string());
    }

    #[tokio::test]
    async fn test_connections_endpoint_returns_snapshot() {
        let health = Arc::new(HealthState::new("acq.example:5001"));
        health.mark_up();
        health.incr_tx();
        let Json(snap) = connections_endpoint(State(health)).await;
        assert_eq!(snap.endpoint, "acq.example:5001");
        assert!(snap.up);
        assert_eq!(snap.tx_msgs, 1);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_lines() {
        let health = Arc::new(HealthState::new("x:1"));
        health.mark_up();
        health.incr_rx();
        health.incr_tx();
        health.incr_err();
        let body = metrics_endpoint(State(health)).await;

        assert!(body.contains("gateway_uptime_seconds "));
        assert!(body.contains("gateway_tx_messages_total 1\n"));
        assert!(body.contains("gateway_rx_messages_total 1\n"));
        assert!(body.contains("gateway_errors_total 1\n"));
        assert!(body.contains("gateway_up 1\n"));
    }

    #[tokio::test]
    async fn test_metrics_gateway_up_zero_when_down() {
        let health = Arc::new(HealthState::new("x:1"));
        let body = metrics_endpoint(State(health)).await;
        assert!(body.contains("gateway_up 0\n"));
    }
}
