use super::statistics::Statistics;
use crate::config::{CalibrationConfig, ADC_MAX};
use serde::Serialize;

/// Outcome of observing the raw signal for one calibration window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub samples: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: u16,
    pub max: u16,
    /// How far the largest reading sits above the mean, in standard deviations.
    pub peak_z_score: f64,
    pub suggested_threshold: u16,
}

/// Observes raw samples and suggests a peak threshold between the signal mean and its maximum.
pub struct Calibrator {
    config: CalibrationConfig,
    statistics: Statistics,
    started_at_ms: Option<u64>,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            statistics: Statistics::new(),
            started_at_ms: None,
        }
    }

    pub fn add_sample(&mut self, timestamp_ms: u64, value: u16) {
        self.started_at_ms.get_or_insert(timestamp_ms);
        self.statistics.update_statistics(value as f64);
    }

    /// True once the window has been observed.
    pub fn is_complete(&self, now_ms: u64) -> bool {
        self.started_at_ms
            .map_or(false, |start| now_ms.saturating_sub(start) >= self.config.window_ms)
    }

    /// `None` until at least one sample has been seen.
    pub fn report(&self) -> Option<CalibrationReport> {
        let stats = &self.statistics;
        let (min, max) = (stats.min?, stats.max?);

        let raw = stats.mean + (max - stats.mean) * self.config.threshold_fraction;
        let suggested_threshold = raw.round().clamp(1.0, ADC_MAX as f64) as u16;

        Some(CalibrationReport {
            samples: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: min as u16,
            max: max as u16,
            peak_z_score: stats.z_score(max),
            suggested_threshold,
        })
    }
}
