use super::aggregate::{summarize, HeartRateSummary};
use super::detectors::threshold::ThresholdDetector;
use super::detectors::{DetectorInstance, PeakEvent, Sample};
use super::ring_buffer::RingBuffer;
use crate::config::{AggregationConfig, Config};
use log::debug;

// PULSE SAMPLER COMPONENT -----------------------------------------------------

/// Runs the peak detector over incoming samples and owns the interval buffer.
pub struct PulseSampler {
    pub index: usize,
    detector: Box<dyn DetectorInstance>,
    intervals: RingBuffer<u32>,
    aggregation: AggregationConfig,
    peak_count: usize,
}

impl PulseSampler {
    pub fn new(config: &Config) -> Self {
        let detector = ThresholdDetector::new(config.detector.clone());
        Self::with_detector(
            Box::new(detector),
            config.sampling.buffer_size,
            config.aggregation.clone(),
        )
    }

    pub fn with_detector(
        detector: Box<dyn DetectorInstance>,
        buffer_size: usize,
        aggregation: AggregationConfig,
    ) -> Self {
        Self {
            index: 0,
            detector,
            intervals: RingBuffer::new(buffer_size),
            aggregation,
            peak_count: 0,
        }
    }

    pub fn process_sample(&mut self, sample: Sample) -> Option<PeakEvent> {
        self.index += 1;

        let peak = self.detector.process_sample(sample)?;
        self.peak_count += 1;

        if let Some(interval_ms) = peak.interval_ms {
            let interval = u32::try_from(interval_ms).unwrap_or(u32::MAX);
            self.intervals.add(interval);
            debug!(
                "{} peak at {} ms (value {}, interval {} ms)",
                self.detector.name(),
                peak.timestamp_ms,
                peak.value,
                interval
            );
        } else {
            debug!(
                "{} first peak at {} ms (value {})",
                self.detector.name(),
                peak.timestamp_ms,
                peak.value
            );
        }

        Some(peak)
    }

    /// Aggregates the current buffer contents. The buffer itself is left untouched.
    pub fn summary(&self) -> Option<HeartRateSummary> {
        summarize(self.intervals.iter(), &self.aggregation)
    }

    pub fn intervals(&self) -> &RingBuffer<u32> {
        &self.intervals
    }

    pub fn peak_count(&self) -> usize {
        self.peak_count
    }

    /// Forgets the previous peak so no interval is measured across a gap in the signal.
    pub fn reset_detector(&mut self) {
        self.detector.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_train(period_ms: u64, duration_ms: u64) -> Vec<Sample> {
        // 100 Hz sampling, 30 ms wide pulses.
        (0..duration_ms / 10)
            .map(|i| {
                let t = i * 10;
                let value = if t % period_ms < 30 { 3000 } else { 1500 };
                Sample::new(t, value)
            })
            .collect()
    }

    #[test]
    fn steady_pulse_yields_expected_rate() {
        let mut sampler = PulseSampler::new(&Config::default());
        for sample in pulse_train(800, 10_000) {
            sampler.process_sample(sample);
        }
        assert_eq!(sampler.index, 1000);
        assert_eq!(sampler.peak_count(), 13);
        assert_eq!(sampler.intervals().len(), 12);
        assert!(sampler.intervals().iter().all(|ibi| ibi == 800));

        let summary = sampler.summary().unwrap();
        assert!((summary.bpm - 75.0).abs() < 1e-9);
    }

    #[test]
    fn interval_buffer_is_bounded_by_buffer_size() {
        let mut config = Config::default();
        config.sampling.buffer_size = 3;
        let mut sampler = PulseSampler::new(&config);
        for sample in pulse_train(500, 20_000) {
            sampler.process_sample(sample);
            assert!(sampler.intervals().len() <= 3);
        }
        assert!(sampler.peak_count() > 3);
        assert_eq!(sampler.intervals().len(), 3);
    }

    #[test]
    fn no_summary_before_second_peak() {
        let mut sampler = PulseSampler::new(&Config::default());
        sampler.process_sample(Sample::new(0, 3000));
        assert_eq!(sampler.peak_count(), 1);
        assert!(sampler.intervals().is_empty());
        assert!(sampler.summary().is_none());
    }

    #[test]
    fn detector_reset_keeps_buffered_intervals() {
        let mut sampler = PulseSampler::new(&Config::default());
        for sample in pulse_train(800, 3_000) {
            sampler.process_sample(sample);
        }
        let buffered = sampler.intervals().len();
        sampler.reset_detector();
        let peak = sampler.process_sample(Sample::new(60_000, 3000)).unwrap();
        assert_eq!(peak.interval_ms, None);
        assert_eq!(sampler.intervals().len(), buffered);
    }
}
