//! # isogw-gateway
//!
//! The gateway process: one persistent framed connection to an upstream
//! acquirer, a network-management echo cadence keeping the link warm, and
//! a small HTTP surface exposing the link's health.
//!
//! ```text
//! upstream bytes ──▶ transport::Connector ──frames──▶ Supervisor ──▶ HealthState
//!                                                        │
//!                       echo tick ──▶ pack ──▶ Connector.send ──▶ upstream
//!
//!                    admin HTTP  ◀──snapshots── HealthState
//! ```
//!
//! The [`transport::Connector`] owns the socket and its reconnect loop,
//! the [`supervisor::Supervisor`] owns all protocol interpretation, and
//! [`health::HealthState`] is the one piece of shared mutable state.

pub mod admin;
pub mod config;
pub mod health;
pub mod supervisor;
pub mod transport;

pub use config::{ConfigError, GatewayConfig};
pub use health::{HealthSnapshot, HealthState};
pub use supervisor::Supervisor;
pub use transport::{Connector, ConnectorError, DialConfig, LinkEvent};
