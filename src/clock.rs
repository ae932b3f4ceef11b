//! Monotonic time sources for the scheduler.
//!
//! Every timing decision in this crate (deadlines, periods, the processing
//! horizon) is expressed in absolute monotonic milliseconds, never wall-clock
//! time. Production tasks read [`MonotonicClock`]; tests substitute
//! [`TestClock`] so deadline and period behavior can be driven deterministically
//! instead of racing a real timer.

use embassy_time::Instant;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonic millisecond time source.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since some fixed, arbitrary origin.
    /// Only differences between two calls are meaningful.
    fn now_ms(&self) -> u64;
}

/// Real time source backed by the Embassy time driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

/// A manually-advanced clock for tests.
///
/// Cloning shares the same underlying counter, so a `TestClock` handed to a
/// task and one kept by the test driving it observe the same time.
#[derive(Debug, Clone, Default)]
pub struct TestClock {
    millis: Arc<AtomicU64>,
}

impl TestClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Advance the clock by `delta_ms` and return the new time.
    pub fn advance(&self, delta_ms: u64) -> u64 {
        self.millis.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }

    /// Jump to an absolute time. Must not move the clock backwards.
    pub fn set(&self, ms: u64) {
        self.millis.store(ms, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_explicitly() {
        let clock = TestClock::new(1000);
        assert_eq!(clock.now_ms(), 1000);
        assert_eq!(clock.advance(250), 1250);
        assert_eq!(clock.now_ms(), 1250);
    }

    #[test]
    fn test_clock_clones_share_state() {
        let clock = TestClock::new(0);
        let other = clock.clone();
        clock.advance(500);
        assert_eq!(other.now_ms(), 500);
    }
}
