use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of monotonic high-resolution timestamps. The only timing truth the
/// trial machinery sees; wall-clock adjustments never reach it.
pub trait Clock {
    /// Nanoseconds since the clock's origin. Strictly non-decreasing.
    fn now_ns(&self) -> u64;

    fn elapsed(&self, since_ns: u64) -> Duration {
        Duration::from_nanos(self.now_ns().saturating_sub(since_ns))
    }
}

/// Real clock backed by `Instant`, with the origin fixed at construction so
/// timestamps stay small and comparable within a run.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Maps a clock timestamp back to an `Instant`, for handing deadlines to
    /// the windowing layer.
    pub fn instant_at(&self, ts_ns: u64) -> Instant {
        self.origin + Duration::from_nanos(ts_ns)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Hand-driven clock for tests and replay harnesses. Clones share the same
/// underlying time so a harness and the unit under test observe identical
/// timestamps.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ns: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.set(self.now_ns.get() + d.as_nanos() as u64);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set_ns(&self, ts_ns: u64) {
        debug_assert!(ts_ns >= self.now_ns.get(), "manual clock moved backwards");
        self.now_ns.set(ts_ns);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.get()
    }
}
