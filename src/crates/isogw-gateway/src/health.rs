//! The process-wide health record.
//!
//! One [`HealthState`] exists per gateway process.  The supervisor is the
//! only writer; the admin surface reads it through [`HealthState::snapshot`],
//! never through live references.
//!
//! Counters are plain atomics (monotonic, relaxed ordering is enough).
//! The fields that must change together — link direction and its
//! timestamp, the last-echo pair — sit behind one `RwLock` so a snapshot
//! can never observe `up = true` with the previous transition's
//! timestamp.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Composite link fields that change together.
#[derive(Debug, Default, Clone)]
struct LinkStamps {
    last_change_ts: Option<DateTime<Utc>>,
    last_echo_stan: u64,
    last_echo_at: Option<DateTime<Utc>>,
}

/// Mutable, concurrency-safe operational state of the gateway.
pub struct HealthState {
    endpoint: String,
    started: Instant,
    started_at: DateTime<Utc>,
    up: AtomicBool,
    rx_msgs: AtomicU64,
    tx_msgs: AtomicU64,
    errs: AtomicU64,
    link: RwLock<LinkStamps>,
}

/// A self-consistent copy of [`HealthState`], serialized by the admin
/// surface as the `/connections` payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub endpoint: String,
    pub up: bool,
    pub last_change_ts: Option<DateTime<Utc>>,
    pub last_echo_stan: u64,
    pub last_echo_at: Option<DateTime<Utc>>,
    pub rx_msgs: u64,
    pub tx_msgs: u64,
    pub errs: u64,
}

impl HealthState {
    /// Creates the record at process start.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            started: Instant::now(),
            started_at: Utc::now(),
            up: AtomicBool::new(false),
            rx_msgs: AtomicU64::new(0),
            tx_msgs: AtomicU64::new(0),
            errs: AtomicU64::new(0),
            link: RwLock::new(LinkStamps::default()),
        }
    }

    /// Current link direction.  Relaxed read: the echo ticker tolerates a
    /// stale value (a spurious send fails with "not connected" and is
    /// counted as an error).
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Relaxed)
    }

    /// Marks the link up and stamps the transition time.
    pub fn mark_up(&self) {
        let mut link = self.link.write().expect("health lock poisoned");
        self.up.store(true, Ordering::Relaxed);
        link.last_change_ts = Some(Utc::now());
    }

    /// Marks the link down and stamps the transition time.
    pub fn mark_down(&self) {
        let mut link = self.link.write().expect("health lock poisoned");
        self.up.store(false, Ordering::Relaxed);
        link.last_change_ts = Some(Utc::now());
    }

    /// Records a successfully sent echo: its six-digit wire STAN and the
    /// send time.
    pub fn record_echo(&self, wire_stan: u64) {
        let mut link = self.link.write().expect("health lock poisoned");
        link.last_echo_stan = wire_stan;
        link.last_echo_at = Some(Utc::now());
    }

    pub fn incr_rx(&self) {
        self.rx_msgs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_tx(&self) {
        self.tx_msgs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_err(&self) {
        self.errs.fetch_add(1, Ordering::Relaxed);
    }

    /// Seconds since process start.
    pub fn uptime(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    /// Wall-clock process start time.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Takes a self-consistent copy for the observation surface.
    pub fn snapshot(&self) -> HealthSnapshot {
        let link = self.link.read().expect("health lock poisoned").clone();
        HealthSnapshot {
            endpoint: self.endpoint.clone(),
            up: self.up.load(Ordering::Relaxed),
            last_change_ts: link.last_change_ts,
            last_echo_stan: link.last_echo_stan,
            last_echo_at: link.last_echo_at,
            rx_msgs: self.rx_msgs.load(Ordering::Relaxed),
            tx_msgs: self.tx_msgs.load(Ordering::Relaxed),
            errs: self.errs.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_is_down_with_zero_counters() {
        let h = HealthState::new("127.0.0.1:5001");
        assert!(!h.is_up());
        let snap = h.snapshot();
        assert_eq!(snap.endpoint, "127.0.0.1:5001");
        assert_eq!((snap.rx_msgs, snap.tx_msgs, snap.errs), (0, 0, 0));
        assert!(snap.last_change_ts.is_none());
        assert!(snap.last_echo_at.is_none());
        assert_eq!(snap.last_echo_stan, 0);
    }

    #[test]
    fn test_mark_up_sets_flag_and_stamp_together() {
        let h = HealthState::new("x:1");
        h.mark_up();
        let snap = h.snapshot();
        assert!(snap.up);
        assert!(snap.last_change_ts.is_some());

        h.mark_down();
        let snap = h.snapshot();
        assert!(!snap.up);
    }

    #[test]
    fn test_counters_accumulate() {
        let h = HealthState::new("x:1");
        h.incr_rx();
        h.incr_rx();
        h.incr_tx();
        h.incr_err();
        let snap = h.snapshot();
        assert_eq!((snap.rx_msgs, snap.tx_msgs, snap.errs), (2, 1, 1));
    }

    #[test]
    fn test_record_echo_updates_stan_and_stamp() {
        let h = HealthState::new("x:1");
        h.record_echo(123_456);
        let snap = h.snapshot();
        assert_eq!(snap.last_echo_stan, 123_456);
        assert!(snap.last_echo_at.is_some());
    }

    #[test]
    fn test_snapshot_serializes_with_contract_field_names() {
        let h = HealthState::new("x:1");
        h.mark_up();
        let json = serde_json::to_value(h.snapshot()).expect("serialize");
        for key in [
            "endpoint",
            "up",
            "last_change_ts",
            "last_echo_stan",
            "last_echo_at",
            "rx_msgs",
            "tx_msgs",
            "errs",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }
}
