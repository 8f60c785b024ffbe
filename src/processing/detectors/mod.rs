pub mod threshold;

use serde::Serialize;

// SAMPLE ----------------------------------------------------------------------

/// One ADC reading and the monotonic time it was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub timestamp_ms: u64,
    pub value: u16,
}

impl Sample {
    pub fn new(timestamp_ms: u64, value: u16) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

// DETECTOR COMPONENT ----------------------------------------------------------

/// A detected pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeakEvent {
    pub timestamp_ms: u64,
    pub value: u16,
    /// Time since the previous accepted peak, absent for the first one.
    pub interval_ms: Option<u64>,
}

pub trait DetectorInstance: Send {
    fn process_sample(&mut self, sample: Sample) -> Option<PeakEvent>;

    fn name(&self) -> &str;

    fn reset(&mut self);
}
