/// Fires on a fixed grid of `start + k * period` on the monotonic clock.
#[derive(Debug, Clone)]
pub struct IntervalTrigger {
    period_ms: u64,
    next_due_ms: u64,
}

impl IntervalTrigger {
    /// First firing is one full period after `start_ms`.
    pub fn new(period_ms: u64, start_ms: u64) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_due_ms: start_ms + period_ms,
        }
    }

    /// Returns true at most once per grid slot. Slots missed while the caller
    /// was busy are skipped rather than fired in a burst.
    pub fn evaluate(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        let behind = (now_ms - self.next_due_ms) / self.period_ms;
        self.next_due_ms += (behind + 1) * self.period_ms;
        true
    }

    pub fn next_due_ms(&self) -> u64 {
        self.next_due_ms
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_exact_period_grid() {
        let mut trigger = IntervalTrigger::new(1000, 0);
        let fired: Vec<u64> = (0..=5000u64)
            .step_by(10)
            .filter(|&t| trigger.evaluate(t))
            .collect();
        assert_eq!(fired, vec![1000, 2000, 3000, 4000, 5000]);
    }

    #[test]
    fn late_poll_fires_once_and_stays_on_grid() {
        let mut trigger = IntervalTrigger::new(1000, 0);
        assert!(trigger.evaluate(3500));
        assert!(!trigger.evaluate(3600));
        assert_eq!(trigger.next_due_ms(), 4000);
        assert!(trigger.evaluate(4000));
    }

    #[test]
    fn grid_is_relative_to_start() {
        let mut trigger = IntervalTrigger::new(250, 40);
        assert!(!trigger.evaluate(289));
        assert!(trigger.evaluate(290));
        assert_eq!(trigger.next_due_ms(), 540);
        assert_eq!(trigger.period_ms(), 250);
    }
}
