//! Framed transport to the upstream acquirer.
//!
//! - **`connector`** – owns the one long-lived connection: dial with
//!   timeout, reconnect with capped exponential backoff, frame inbound
//!   bytes by the 2-byte MLI, and deliver link events on a channel.
//! - **`tls`**       – rustls client configuration, with an explicit
//!   knob to skip certificate verification on operator-controlled
//!   networks.

pub mod connector;
pub mod tls;

pub use connector::{Connector, ConnectorError, DialConfig, LinkEvent};
