//! Sample sources for the pulse sampler.
//!
//! The node reads one ADC value per sampling tick through [`PulseSensor`]. On
//! the bench the ADC is replaced by a synthetic waveform, a recorded CSV file,
//! or a TCP stream served by `pulse-node serve`.

pub mod csv_file;
pub mod simulated;
pub mod tcp;

use crate::config::{Config, SensorSource, ADC_MAX};
use std::time::Duration;
use thiserror::Error;

pub use csv_file::CsvSensor;
pub use simulated::SimulatedSensor;
pub use tcp::TcpSensor;

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("Sensor read failed: {0}")]
    Read(String),

    #[error("Reading {0} is outside the ADC range 0..=4095")]
    OutOfRange(i64),

    #[error("Sensor source exhausted")]
    Exhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub trait PulseSensor: Send {
    /// Reads one sample. Errors other than `Exhausted` only cost the current tick.
    fn read(&mut self) -> Result<u16, SensorError>;

    fn describe(&self) -> String;
}

impl<S: PulseSensor + ?Sized> PulseSensor for Box<S> {
    fn read(&mut self) -> Result<u16, SensorError> {
        (**self).read()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Checks a raw reading against the ADC range.
pub fn to_adc(raw: i64) -> Result<u16, SensorError> {
    if (0..=ADC_MAX as i64).contains(&raw) {
        Ok(raw as u16)
    } else {
        Err(SensorError::OutOfRange(raw))
    }
}

pub fn from_config(config: &Config) -> Result<Box<dyn PulseSensor>, SensorError> {
    let sensor_config = &config.sensor;
    let sensor: Box<dyn PulseSensor> = match sensor_config.source {
        SensorSource::Simulated => Box::new(SimulatedSensor::new(
            sensor_config.simulated_bpm,
            config.sampling.sample_rate_hz,
        )),
        SensorSource::Csv => {
            let path = sensor_config
                .csv_path
                .as_deref()
                .ok_or_else(|| SensorError::Read("sensor.csv_path is not set".to_string()))?;
            Box::new(CsvSensor::open(path)?)
        }
        SensorSource::Tcp => Box::new(TcpSensor::connect(
            &sensor_config.tcp_address,
            config.sampling.sample_period() * 10,
        )?),
    };
    Ok(sensor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adc_range_is_inclusive() {
        assert_eq!(to_adc(0).unwrap(), 0);
        assert_eq!(to_adc(4095).unwrap(), 4095);
        assert!(matches!(to_adc(4096), Err(SensorError::OutOfRange(4096))));
        assert!(matches!(to_adc(-1), Err(SensorError::OutOfRange(-1))));
    }

    #[test]
    fn default_config_builds_simulated_sensor() {
        let mut sensor = from_config(&Config::default()).unwrap();
        assert!(sensor.describe().contains("simulated"));
        assert!(sensor.read().is_ok());
    }
}
