use std::cell::Cell;
use std::time::{Duration, Instant};

/// Process-wide monotonic time in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// Blocks until `deadline_ms`; returns immediately if it has passed.
    fn sleep_until(&self, deadline_ms: u64);
}

/// Wall time since construction, backed by `Instant`.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep_until(&self, deadline_ms: u64) {
        let now = self.now_ms();
        if deadline_ms > now {
            std::thread::sleep(Duration::from_millis(deadline_ms - now));
        }
    }
}

/// Clock that jumps straight to each deadline, for replaying recordings
/// faster than real time.
#[derive(Debug, Default)]
pub struct SimulatedClock {
    now: Cell<u64>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for SimulatedClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn sleep_until(&self, deadline_ms: u64) {
        if deadline_ms > self.now.get() {
            self.now.set(deadline_ms);
        }
    }
}
