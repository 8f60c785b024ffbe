use crate::clock::{Clock, SimulatedClock};
use crate::config::Config;
use crate::network::{CsvSink, OfflineLink};
use crate::processing::aggregate::HeartRateSummary;
use crate::reporter::{Reporter, ReporterStats};
use crate::sensor::CsvSensor;
use crate::status::NullIndicator;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Result of replaying one recording.
#[derive(Debug, Clone)]
pub struct ProcessSummary {
    pub output: PathBuf,
    pub stats: ReporterStats,
    pub records: usize,
    /// Figures over the interval buffer at the end of the recording.
    pub last: Option<HeartRateSummary>,
}

/// `recording.csv` -> `recording.records.csv`
pub fn output_path(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("records.csv")
}

/// Replays a recorded waveform through the full sampling and reporting loop,
/// one row per sampling tick, as fast as the disk allows. Records that would
/// have been posted are written next to the input instead.
pub fn run(config: &Config, csv_path: &str) -> Result<ProcessSummary> {
    let input = Path::new(csv_path);
    if !input.exists() {
        bail!("data file not found at path: {}", csv_path);
    }

    let sensor = CsvSensor::open(input).with_context(|| format!("cannot read {}", csv_path))?;
    let total_samples = sensor.len();
    let output = output_path(input);
    let sink = CsvSink::create(&output)?;

    let mut reporter = Reporter::new(config, sensor, sink, OfflineLink, NullIndicator);
    let clock = SimulatedClock::new();

    let start_time = Instant::now();
    let stats = reporter.run(&clock).clone();
    let duration = start_time.elapsed();

    let summary = ProcessSummary {
        output,
        records: reporter.transmitter().written(),
        last: reporter.sampler().summary(),
        stats,
    };

    println!(
        "Processed {} samples ({:.1} s of signal) in {:?}",
        total_samples,
        clock.now_ms() as f64 / 1000.0,
        duration
    );
    println!(
        "{} peaks, {} records written to {}",
        summary.stats.peaks.to_string().green(),
        summary.records.to_string().green(),
        summary.output.display()
    );
    if summary.stats.sensor_errors > 0 {
        println!(
            "{} samples skipped",
            summary.stats.sensor_errors.to_string().yellow()
        );
    }
    match &summary.last {
        Some(last) => println!(
            "Final: {} bpm, RMSSD {:.1} ms over {} beats",
            format!("{:.1}", last.bpm).red().bold(),
            last.rmssd_ms,
            last.beats
        ),
        None => println!("{}", "No valid heartbeat intervals found".yellow()),
    }

    Ok(summary)
}
