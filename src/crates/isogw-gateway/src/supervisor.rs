//! Link supervision: the echo cadence and inbound frame interpretation.
//!
//! The supervisor is the only component that understands ISO 8583.  It
//! consumes [`LinkEvent`]s from the connector, drives the periodic echo
//! test while the link is up, and publishes every state change to the
//! shared [`HealthState`].
//!
//! Correlation model: echo is a liveness probe, not a request/response
//! protocol.  Responses are recognized by the echo-response predicate
//! (MTI `0810`, DE70 `301`, DE11 present) and logged with their STAN; no
//! pending-request table is kept, and a lost echo simply counts as an
//! error on the next failed send.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use isogw_core::{is_echo_response, new_echo_request, pack, stan_of, unpack, StanCounter};

use crate::health::HealthState;
use crate::transport::{Connector, LinkEvent};

/// Drives the echo cadence and interprets inbound frames.
pub struct Supervisor {
    health: Arc<HealthState>,
    connector: Arc<Connector>,
    stan: StanCounter,
    echo_interval: Duration,
}

impl Supervisor {
    /// Creates a supervisor whose STAN sequence is seeded from the wall
    /// clock, so restarts do not replay the previous run's STANs.
    pub fn new(
        health: Arc<HealthState>,
        connector: Arc<Connector>,
        echo_interval: Duration,
    ) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
            % 1_000_000;
        Self::with_stan_seed(health, connector, echo_interval, seed)
    }

    /// Like [`Supervisor::new`] with an explicit STAN seed, for tests.
    pub fn with_stan_seed(
        health: Arc<HealthState>,
        connector: Arc<Connector>,
        echo_interval: Duration,
        seed: u64,
    ) -> Self {
        Self {
            health,
            connector,
            stan: StanCounter::seeded(seed),
            echo_interval,
        }
    }

    /// Runs until `shutdown` is cancelled or the event stream ends.
    /// Closes the connector on the way out.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<LinkEvent>,
        shutdown: CancellationToken,
    ) {
        let mut ticker = interval(self.echo_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.on_tick().await,
                event = events.recv() => match event {
                    Some(event) => self.on_event(event),
                    None => break,
                },
            }
        }
        self.connector.close();
    }

    /// One echo tick: skipped while the link is down; otherwise build,
    /// pack, and send an echo request, then publish the send to health.
    async fn on_tick(&self) {
        if !self.health.is_up() {
            return;
        }
        let stan = self.stan.next();
        let request = new_echo_request(stan);
        let frame = match pack(&request) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("echo pack error: {e}");
                self.health.incr_err();
                return;
            }
        };
        if let Err(e) = self.connector.send(&frame).await {
            warn!("TX error: {e}");
            self.health.incr_err();
            return;
        }
        let wire_stan = stan % 1_000_000;
        self.health.record_echo(wire_stan);
        self.health.incr_tx();
        info!("TX 0800 echo request, STAN={wire_stan:06}");
    }

    fn on_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::Up => {
                self.health.mark_up();
                info!("link up");
            }
            LinkEvent::Down { reason } => {
                self.health.mark_down();
                warn!("link down: {reason}");
            }
            LinkEvent::Frame(frame) => self.on_frame(&frame),
        }
    }

    /// One inbound frame: count it, decode it, recognize echo responses.
    /// A decode failure drops the frame but keeps the connection — the
    /// MLI framing already succeeded, so the stream is still in sync.
    fn on_frame(&self, frame: &[u8]) {
        self.health.incr_rx();
        let message = match unpack(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("RX unpack error: {e}");
                self.health.incr_err();
                return;
            }
        };
        if is_echo_response(&message) {
            info!("RX 0810 echo response, STAN={:06}", stan_of(&message));
        } else {
            info!("RX {} (dropped, no handler)", message.mti);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
