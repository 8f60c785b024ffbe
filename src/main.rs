use anyhow::{Context, Result};
use log::{info, warn};
use pulse_node::clock::MonotonicClock;
use pulse_node::config::{load_config, save_config, Config};
use pulse_node::local::{calibrate, process_file, server};
use pulse_node::network::{HttpTransmitter, TcpReachLink};
use pulse_node::reporter::Reporter;
use pulse_node::sensor;
use pulse_node::status::{ConsoleLed, NullIndicator, StatusIndicator};
use pulse_node::utils::log::init_logging;
use std::path::Path;

const DEFAULT_CONFIG: &str = "config.yaml";
const USAGE: &str = "usage: pulse-node <run|serve|calibrate> [config.yaml]
       pulse-node process <recording.csv> [config.yaml]
       pulse-node init-config <path>";

/// Loads the config at `path`. A missing default config falls back to the
/// built-in values; a missing explicit path is an error.
fn config_from(path: Option<&String>) -> Result<(Config, String)> {
    match path {
        Some(path) => {
            let config = load_config(path).with_context(|| format!("loading {}", path))?;
            Ok((config, path.clone()))
        }
        None if !Path::new(DEFAULT_CONFIG).exists() => {
            Ok((Config::default(), DEFAULT_CONFIG.to_string()))
        }
        None => {
            let config =
                load_config(DEFAULT_CONFIG).with_context(|| format!("loading {}", DEFAULT_CONFIG))?;
            Ok((config, DEFAULT_CONFIG.to_string()))
        }
    }
}

fn run_node(config: &Config) -> Result<()> {
    let sensor = sensor::from_config(config).context("opening pulse sensor")?;
    let transmitter = HttpTransmitter::new(&config.network)?;
    let link = TcpReachLink::new(&config.network)?;
    let indicator: Box<dyn StatusIndicator> = if config.debug.led_status {
        Box::new(ConsoleLed::stdout(config.hardware.led_pin, config.debug.debug_mode))
    } else {
        Box::new(NullIndicator)
    };

    let mut reporter = Reporter::new(config, sensor, transmitter, link, indicator);
    let stats = reporter.run(&MonotonicClock::new());
    info!(
        "{} samples, {} peaks, {} records sent, {} failed",
        stats.samples, stats.peaks, stats.transmissions_sent, stats.transmissions_failed
    );
    Ok(())
}

fn run_calibration(config: &mut Config, path: &str) -> Result<()> {
    let mut sensor = sensor::from_config(config).context("opening pulse sensor")?;
    let report = calibrate::run(config, &mut sensor, &MonotonicClock::new())?;

    println!(
        "mean {:.1}, std {:.1}, range {}..{}, suggested threshold {}",
        report.mean, report.std_dev, report.min, report.max, report.suggested_threshold
    );

    config.detector.peak_threshold = report.suggested_threshold;
    config.validate()?;
    save_config(config, path).with_context(|| format!("writing {}", path))?;
    info!("peak threshold {} saved to {}", report.suggested_threshold, path);
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        println!("{}", USAGE);
        return Ok(());
    };

    if command == "init-config" {
        init_logging(false);
        let path = args.get(2).context("init-config needs a target path")?;
        save_config(&Config::default(), path).with_context(|| format!("writing {}", path))?;
        info!("default configuration written to {}", path);
        return Ok(());
    }

    let config_arg = if command == "process" {
        args.get(3)
    } else {
        args.get(2)
    };
    let (mut config, config_path) = config_from(config_arg)?;
    init_logging(config.debug.debug_mode);
    if config_arg.is_none() && !Path::new(DEFAULT_CONFIG).exists() {
        warn!("{} not found, using built-in defaults", DEFAULT_CONFIG);
    }

    match command.as_str() {
        "run" => run_node(&config)?,
        "serve" => server::run(&config)?,
        "process" => {
            let csv_path = args.get(2).context("process needs a recording path")?;
            process_file::run(&config, csv_path)?;
        }
        "calibrate" => run_calibration(&mut config, &config_path)?,
        _ => println!("Invalid argument\n{}", USAGE),
    }

    Ok(())
}
