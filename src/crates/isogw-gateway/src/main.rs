//! ISO 8583 payment gateway — entry point.
//!
//! Wires together the connector, the link supervisor, and the admin HTTP
//! surface, then runs until a termination signal arrives.
//!
//! ```text
//! main()
//!  └─ GatewayConfig        -- CLI flags + env overrides, validated
//!  └─ HealthState          -- shared operational state
//!  └─ admin::serve()       -- /health /connections /metrics
//!  └─ Connector::start()   -- dial/reconnect loop
//!  └─ Supervisor::run()    -- echo cadence + inbound dispatch
//! ```
//!
//! # Usage
//!
//! ```text
//! isogw-gateway --endpoint 10.0.0.5:5001 --echo-interval 15
//! ```
//!
//! Exit status is 0 after a graceful shutdown and non-zero when startup
//! fails (invalid configuration, admin bind error).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use isogw_gateway::transport::DialConfig;
use isogw_gateway::{admin, Connector, GatewayConfig, HealthState, Supervisor};

/// How long the admin surface gets to drain in-flight requests after the
/// supervisor has stopped.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// ISO 8583 payment gateway.
///
/// Maintains one persistent framed connection to an upstream acquirer,
/// keeps it alive with periodic 0800 echo tests, and exposes link health
/// over HTTP.
#[derive(Debug, Parser)]
#[command(name = "isogw-gateway", version)]
struct Cli {
    /// Upstream acquirer endpoint, host:port.
    #[arg(long, default_value = "127.0.0.1:5001", env = "ISOGW_ENDPOINT")]
    endpoint: String,

    /// Tunnel the upstream connection through TLS.
    #[arg(long, env = "ISOGW_TLS")]
    tls: bool,

    /// Skip TLS certificate verification.
    ///
    /// Only sound when the wire runs inside an operator-controlled
    /// network; the upstream is then confidential but unauthenticated.
    #[arg(long, env = "ISOGW_TLS_INSECURE")]
    tls_insecure: bool,

    /// Admin HTTP listen address; pass "none" to disable the surface.
    #[arg(long, default_value = "127.0.0.1:8080", env = "ISOGW_ADMIN")]
    admin: String,

    /// Seconds between 0800 echo tests (minimum 1).
    #[arg(long, default_value_t = 15, env = "ISOGW_ECHO_INTERVAL")]
    echo_interval: u64,

    /// Dial timeout in seconds.
    #[arg(long, default_value_t = 5, env = "ISOGW_DIAL_TIMEOUT")]
    dial_timeout: u64,

    /// TCP keepalive in seconds; 0 disables the probe.
    #[arg(long, default_value_t = 30, env = "ISOGW_KEEPALIVE")]
    keepalive: u64,

    /// Per-frame read deadline in seconds.
    #[arg(long, default_value_t = 60, env = "ISOGW_READ_IDLE")]
    read_idle: u64,

    /// Base reconnect backoff in seconds (doubles per failure, 30 s cap).
    #[arg(long, default_value_t = 2, env = "ISOGW_RETRY_BACKOFF")]
    retry_backoff: u64,
}

impl Cli {
    fn into_config(self) -> GatewayConfig {
        GatewayConfig {
            endpoint: self.endpoint,
            tls: self.tls,
            tls_insecure: self.tls_insecure,
            admin_listen: (self.admin != "none").then_some(self.admin),
            echo_interval: Duration::from_secs(self.echo_interval),
            dial_timeout: Duration::from_secs(self.dial_timeout),
            keepalive: Duration::from_secs(self.keepalive),
            read_idle: Duration::from_secs(self.read_idle),
            retry_backoff_base: Duration::from_secs(self.retry_backoff),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config();
    config.validate().context("invalid configuration")?;

    info!(
        "gateway starting, upstream {} (tls={})",
        config.endpoint, config.tls
    );

    let health = Arc::new(HealthState::new(config.endpoint.clone()));
    let shutdown = CancellationToken::new();

    // Bind the admin listener before anything dials out: a bad listen
    // address must fail startup with a non-zero exit.
    let admin_task = match &config.admin_listen {
        Some(addr) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind admin listener on {addr}"))?;
            let health = Arc::clone(&health);
            let token = shutdown.clone();
            Some(tokio::spawn(admin::serve(listener, health, token)))
        }
        None => None,
    };

    let (connector, events) =
        Connector::new(DialConfig::from(&config)).context("failed to set up connector")?;
    let connector = Arc::new(connector);
    connector.start();

    // Ctrl-C / SIGTERM ends the supervisor loop.
    {
        let token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                token.cancel();
            }
        });
    }

    let supervisor = Supervisor::new(Arc::clone(&health), Arc::clone(&connector), config.echo_interval);
    supervisor.run(events, shutdown.clone()).await;

    // The supervisor has closed the connector; give the admin surface a
    // bounded window to drain before the process exits.
    if let Some(task) = admin_task {
        if let Ok(joined) = tokio::time::timeout(SHUTDOWN_GRACE, task).await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("admin server error: {e}"),
                Err(e) => warn!("admin task panicked: {e}"),
            }
        } else {
            warn!("admin surface did not drain within {SHUTDOWN_GRACE:?}");
        }
    }

    info!("gateway stopped");
    Ok(())
}
