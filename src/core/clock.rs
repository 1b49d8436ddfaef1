//=========================================================================
// Clock
//=========================================================================
//
// Monotonic time source shared by the manager and its states.
//
// Time is reported as a `Duration` since the clock was created, so
// governors and physics accumulators never touch `Instant` directly and
// tests can drive time by hand.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

//=== Clock Trait =========================================================

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

//=== SystemClock =========================================================

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

//=== ManualClock =========================================================

/// Hand-driven clock for deterministic tests and headless replays.
///
/// Stored as microseconds in an atomic so a shared `Arc<ManualClock>` can
/// be advanced while the manager holds another handle to it.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward.
    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    /// Moves time forward by whole milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Jumps to an absolute time.
    pub fn set(&self, at: Duration) {
        self.micros.store(at.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_starts_at_zero() {
        assert_eq!(ManualClock::new().now(), Duration::ZERO);
    }

    #[test]
    fn manual_clock_advances_and_sets() {
        let clock = ManualClock::new();
        clock.advance_ms(20);
        clock.advance(Duration::from_micros(500));
        assert_eq!(clock.now(), Duration::from_micros(20_500));

        clock.set(Duration::from_secs(3));
        assert_eq!(clock.now(), Duration::from_secs(3));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
