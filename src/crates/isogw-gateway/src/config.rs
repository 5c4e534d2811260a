//! Gateway runtime configuration.
//!
//! [`GatewayConfig`] is the single source of truth for all runtime
//! settings.  The binary populates it from CLI arguments and environment
//! variables; tests and embedders construct it directly.  Keeping it a
//! plain struct (no environment reads in here) is what makes the
//! supervisor and transport trivially testable.

use std::time::Duration;

use thiserror::Error;

/// Hard cap on the reconnect backoff, regardless of the configured base.
pub const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Configuration problems that abort startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint must not be empty")]
    EmptyEndpoint,

    #[error("echo interval must be at least 1s, got {0:?}")]
    EchoIntervalTooShort(Duration),

    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
}

/// All runtime configuration for the gateway.
///
/// Build this once at startup and hand clones to the components that
/// need it.  Defaults match a local simulator setup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream acquirer endpoint, `host:port`.
    pub endpoint: String,

    /// Tunnel the connection through TLS.
    pub tls: bool,

    /// Skip TLS certificate verification.  Only sound on an
    /// operator-controlled network; off by default.
    pub tls_insecure: bool,

    /// Listen address for the admin HTTP surface; `None` disables it.
    pub admin_listen: Option<String>,

    /// Period between echo test requests while the link is up.
    pub echo_interval: Duration,

    /// Limit on a single dial attempt.
    pub dial_timeout: Duration,

    /// TCP keepalive for the upstream socket.  Zero disables the probe.
    pub keepalive: Duration,

    /// Read deadline per inbound frame; a silent link is torn down and
    /// redialed after this long.
    pub read_idle: Duration,

    /// Base reconnect backoff; doubles per failed dial up to
    /// [`BACKOFF_CAP`].
    pub retry_backoff_base: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:5001".to_string(),
            tls: false,
            tls_insecure: false,
            admin_listen: Some("127.0.0.1:8080".to_string()),
            echo_interval: Duration::from_secs(15),
            dial_timeout: Duration::from_secs(5),
            keepalive: Duration::from_secs(30),
            read_idle: Duration::from_secs(60),
            retry_backoff_base: Duration::from_secs(2),
        }
    }
}

impl GatewayConfig {
    /// Checks the invariants the rest of the gateway relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint; the caller treats any error
    /// as fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if self.echo_interval < Duration::from_secs(1) {
            return Err(ConfigError::EchoIntervalTooShort(self.echo_interval));
        }
        if self.dial_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration { name: "dial timeout" });
        }
        if self.read_idle.is_zero() {
            return Err(ConfigError::ZeroDuration { name: "read idle" });
        }
        if self.retry_backoff_base.is_zero() {
            return Err(ConfigError::ZeroDuration { name: "retry backoff base" });
        }
        Ok(())
    }
}
