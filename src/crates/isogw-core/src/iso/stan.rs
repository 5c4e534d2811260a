//! Atomic System Trace Audit Number source.

use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, monotonically increasing STAN counter.
///
/// The counter itself is a plain 64-bit integer; the six-digit wire form
/// (DE11) is the value modulo 10^6, so the STAN observed on the wire is
/// strictly monotonic modulo one million.  Seed it with something that
/// differs across process restarts (the gateway uses the Unix time) so
/// that an acquirer does not see the same STAN sequence twice in a row.
///
/// `Ordering::Relaxed` is sufficient: the counter only orders STANs, it
/// never synchronises other memory between tasks.
///
/// # Examples
///
/// ```rust
/// use isogw_core::StanCounter;
///
/// let stan = StanCounter::seeded(41);
/// assert_eq!(stan.next(), 42);
/// assert_eq!(stan.next(), 43);
/// ```
pub struct StanCounter {
    inner: AtomicU64,
}

impl StanCounter {
    /// Creates a counter whose first `next()` returns `seed + 1`.
    pub fn seeded(seed: u64) -> Self {
        Self { inner: AtomicU64::new(seed) }
    }

    /// Atomically increments the counter and returns the new value.
    ///
    /// Wraps around at `u64::MAX` without panicking.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Returns the current value without incrementing.  By the time the
    /// caller looks at it another task may already have advanced the
    /// counter; use it for diagnostics only.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for StanCounter {
    fn default() -> Self {
        Self::seeded(0)
    }
}
