use std::cmp::min;

/// Exponential backoff gate for reconnect attempts. Retries are unbounded;
/// only the delay between them grows, up to `max_ms`.
#[derive(Debug, Clone)]
pub struct BackoffTrigger {
    min_ms: u64,
    max_ms: u64,
    delay_ms: u64,
    next_attempt_ms: Option<u64>,
    failures: u32,
}

impl BackoffTrigger {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        let min_ms = min_ms.max(1);
        let max_ms = max_ms.max(min_ms);
        Self {
            min_ms,
            max_ms,
            delay_ms: min_ms,
            next_attempt_ms: None,
            failures: 0,
        }
    }

    /// True when an attempt is allowed at `now_ms`.
    pub fn evaluate(&self, now_ms: u64) -> bool {
        self.next_attempt_ms.map_or(true, |at| now_ms >= at)
    }

    pub fn record_failure(&mut self, now_ms: u64) {
        self.failures = self.failures.saturating_add(1);
        self.next_attempt_ms = Some(now_ms + self.delay_ms);
        self.delay_ms = min(self.delay_ms.saturating_mul(2), self.max_ms);
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.delay_ms = self.min_ms;
        self.next_attempt_ms = None;
    }

    /// Delay that the next failure will impose.
    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn next_attempt_ms(&self) -> Option<u64> {
        self.next_attempt_ms
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
