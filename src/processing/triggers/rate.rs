/// Fires at `start + k * 1000 / rate_hz` for k = 0, 1, 2, ..., so any rate
/// is honoured exactly over time even when it does not divide a second.
#[derive(Debug, Clone)]
pub struct RateTrigger {
    start_ms: u64,
    rate_hz: u64,
    index: u64,
}

impl RateTrigger {
    /// First firing is at `start_ms` itself.
    pub fn new(rate_hz: u32, start_ms: u64) -> Self {
        Self {
            start_ms,
            rate_hz: rate_hz.max(1) as u64,
            index: 0,
        }
    }

    fn due_ms(&self, index: u64) -> u64 {
        self.start_ms + index * 1000 / self.rate_hz
    }

    /// Returns true at most once per slot. Slots missed while the caller was
    /// busy are skipped rather than fired in a burst.
    pub fn evaluate(&mut self, now_ms: u64) -> bool {
        if now_ms < self.due_ms(self.index) {
            return false;
        }
        // Smallest k whose slot lies strictly after `now_ms`.
        let elapsed = now_ms - self.start_ms;
        let after_now = ((elapsed + 1) * self.rate_hz + 999) / 1000;
        self.index = after_now.max(self.index + 1);
        true
    }

    pub fn next_due_ms(&self) -> u64 {
        self.due_ms(self.index)
    }
}
