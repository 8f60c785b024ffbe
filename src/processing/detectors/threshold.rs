use super::{DetectorInstance, PeakEvent, Sample};
use crate::config::{DetectorConfig, RearmPolicy};
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Below threshold, waiting for a crossing.
    Idle,
    /// Threshold reached, the next step registers the peak.
    Armed,
    /// Peak registered, further crossings are suppressed.
    Refractory,
}

/// Threshold-and-refractory peak detector for a pulse waveform.
pub struct ThresholdDetector {
    config: DetectorConfig,
    state: DetectorState,
    last_peak_ms: Option<u64>,
}

impl ThresholdDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            state: DetectorState::Idle,
            last_peak_ms: None,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn last_peak_ms(&self) -> Option<u64> {
        self.last_peak_ms
    }

    fn refractory_elapsed(&self, now_ms: u64) -> bool {
        self.last_peak_ms.map_or(true, |last| {
            now_ms.saturating_sub(last) >= self.config.refractory_period_ms
        })
    }

    fn register_peak(&mut self, sample: Sample) -> PeakEvent {
        let interval_ms = self
            .last_peak_ms
            .map(|last| sample.timestamp_ms.saturating_sub(last));
        self.last_peak_ms = Some(sample.timestamp_ms);
        self.state = DetectorState::Refractory;

        PeakEvent {
            timestamp_ms: sample.timestamp_ms,
            value: sample.value,
            interval_ms,
        }
    }
}

impl DetectorInstance for ThresholdDetector {
    fn process_sample(&mut self, sample: Sample) -> Option<PeakEvent> {
        let above = sample.value >= self.config.peak_threshold;

        if self.state == DetectorState::Refractory && self.refractory_elapsed(sample.timestamp_ms) {
            let rearm = match self.config.rearm {
                RearmPolicy::Refractory => true,
                RearmPolicy::FallingEdge => !above,
            };
            if rearm {
                trace!("detector re-armed at {} ms", sample.timestamp_ms);
                self.state = DetectorState::Idle;
            }
        }

        if self.state == DetectorState::Idle && above {
            self.state = DetectorState::Armed;
        }

        if self.state == DetectorState::Armed {
            return Some(self.register_peak(sample));
        }

        None
    }

    fn name(&self) -> &str {
        "threshold"
    }

    fn reset(&mut self) {
        self.state = DetectorState::Idle;
        self.last_peak_ms = None;
    }
}
