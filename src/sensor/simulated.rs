use super::{PulseSensor, SensorError};
use crate::config::ADC_MAX;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BASELINE: f64 = 1800.0;
const SYSTOLIC_AMPLITUDE: f64 = 1200.0;
const DICROTIC_AMPLITUDE: f64 = 140.0;
const NOISE: i32 = 40;

/// Synthetic photoplethysmogram: a sharp systolic peak and a small dicrotic
/// bump per beat on a flat baseline, plus uniform noise.
pub struct SimulatedSensor {
    rng: StdRng,
    bpm: f64,
    sample_period_s: f64,
    time_s: f64,
}

impl SimulatedSensor {
    pub fn new(bpm: f64, sample_rate_hz: u32) -> Self {
        Self::with_rng(bpm, sample_rate_hz, StdRng::from_entropy())
    }

    /// Deterministic waveform for reproducible runs.
    pub fn with_seed(bpm: f64, sample_rate_hz: u32, seed: u64) -> Self {
        Self::with_rng(bpm, sample_rate_hz, StdRng::seed_from_u64(seed))
    }

    fn with_rng(bpm: f64, sample_rate_hz: u32, rng: StdRng) -> Self {
        Self {
            rng,
            bpm,
            sample_period_s: 1.0 / sample_rate_hz.max(1) as f64,
            time_s: 0.0,
        }
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    /// Noise-free waveform value at the given time.
    pub fn waveform(&self, time_s: f64) -> f64 {
        let beat_period_s = 60.0 / self.bpm;
        let phase = (time_s % beat_period_s) / beat_period_s;

        let systolic = (-((phase - 0.1) / 0.04).powi(2)).exp();
        let dicrotic = (-((phase - 0.35) / 0.06).powi(2)).exp();

        BASELINE + SYSTOLIC_AMPLITUDE * systolic + DICROTIC_AMPLITUDE * dicrotic
    }
}

impl PulseSensor for SimulatedSensor {
    fn read(&mut self) -> Result<u16, SensorError> {
        let noise = self.rng.gen_range(-NOISE..=NOISE) as f64;
        let value = (self.waveform(self.time_s) + noise).round();
        self.time_s += self.sample_period_s;

        Ok(value.clamp(0.0, ADC_MAX as f64) as u16)
    }

    fn describe(&self) -> String {
        format!("simulated pulse at {:.0} bpm", self.bpm)
    }
}
