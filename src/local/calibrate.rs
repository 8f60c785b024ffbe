use crate::clock::Clock;
use crate::config::Config;
use crate::processing::calibration::{CalibrationReport, Calibrator};
use crate::processing::triggers::RateTrigger;
use crate::sensor::{PulseSensor, SensorError};
use crate::utils::log::log_to_file;
use anyhow::{anyhow, Result};
use log::{debug, info, warn};

const CALIBRATION_LOG: &str = "calibration.log";

/// Watches the raw signal for one calibration window at the configured
/// sample rate and suggests a peak threshold for this sensor placement.
pub fn run<S: PulseSensor, C: Clock>(
    config: &Config,
    sensor: &mut S,
    clock: &C,
) -> Result<CalibrationReport> {
    let mut calibrator = Calibrator::new(config.calibration.clone());

    info!(
        "calibrating {} for {} ms, keep the sensor still",
        sensor.describe(),
        config.calibration.window_ms
    );

    let mut trigger = RateTrigger::new(config.sampling.sample_rate_hz, clock.now_ms());
    let mut errors = 0usize;
    loop {
        clock.sleep_until(trigger.next_due_ms());
        let now = clock.now_ms();
        if calibrator.is_complete(now) {
            break;
        }
        if !trigger.evaluate(now) {
            continue;
        }

        match sensor.read() {
            Ok(value) => calibrator.add_sample(now, value),
            Err(SensorError::Exhausted) => {
                warn!("sample source ended before the calibration window");
                break;
            }
            Err(e) => {
                errors += 1;
                debug!("calibration sample skipped: {}", e);
            }
        }
    }

    let report = calibrator
        .report()
        .ok_or_else(|| anyhow!("no samples collected from {}", sensor.describe()))?;

    info!(
        "suggested peak threshold {} (current {})",
        report.suggested_threshold, config.detector.peak_threshold
    );

    let message = format!(
        "source: {}\nsamples: {} ({} skipped)\nmean: {:.1}\nstd_dev: {:.1}\nmin: {}\nmax: {}\npeak_z_score: {:.2}\nsuggested_threshold: {}\nprevious_threshold: {}",
        sensor.describe(),
        report.samples,
        errors,
        report.mean,
        report.std_dev,
        report.min,
        report.max,
        report.peak_z_score,
        report.suggested_threshold,
        config.detector.peak_threshold
    );
    if config.debug.debug_mode {
        if let Err(e) = log_to_file(&config.debug.log_dir, CALIBRATION_LOG, &message) {
            warn!("cannot write calibration log: {}", e);
        }
    }

    Ok(report)
}
