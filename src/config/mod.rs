// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Largest reading a 12-bit ADC can produce.
pub const ADC_MAX: u16 = 4095;

/// Highest GPIO number on the ESP32.
pub const MAX_GPIO: u8 = 39;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub hardware: HardwareConfig,
    pub detector: DetectorConfig,
    pub sampling: SamplingConfig,
    pub aggregation: AggregationConfig,
    pub schedule: ScheduleConfig,
    pub calibration: CalibrationConfig,
    pub sensor: SensorConfig,
    pub debug: DebugConfig,
}

#[derive(Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub ssid: String,
    pub password: String,
    pub server_url: String,
    pub device_id: String,
    pub request_timeout_ms: u64,
}

// Keeps the network password out of debug output.
impl std::fmt::Debug for NetworkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkConfig")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .field("server_url", &self.server_url)
            .field("device_id", &self.device_id)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ssid: "YOUR_WIFI_NETWORK_NAME".to_string(),
            password: "YOUR_WIFI_PASSWORD".to_string(),
            server_url: "http://192.168.1.100:3000/api/ingest/hr".to_string(),
            device_id: "pulse-node-01".to_string(),
            request_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HardwareConfig {
    pub pulse_pin: u8,
    pub led_pin: u8,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            pulse_pin: 34,
            led_pin: 2,
        }
    }
}

/// When the detector may leave the refractory state.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RearmPolicy {
    /// The refractory timer alone re-arms the detector.
    #[default]
    Refractory,
    /// After the refractory timer, one sample below threshold is also required.
    FallingEdge,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    pub peak_threshold: u16,
    pub refractory_period_ms: u64,
    pub rearm: RearmPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            peak_threshold: 2000,
            refractory_period_ms: 250,
            rearm: RearmPolicy::Refractory,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    pub sample_rate_hz: u32,
    pub buffer_size: usize,
}

impl SamplingConfig {
    /// Nominal spacing of samples. The sampling loop itself runs on an exact
    /// `k * 1000 / rate` millisecond grid.
    pub fn sample_period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.sample_rate_hz.max(1) as u64)
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 100,
            buffer_size: 200,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AggregationConfig {
    pub ibi_valid_min_ms: u32,
    pub ibi_valid_max_ms: u32,
    /// Largest change from the last accepted interval before a beat counts as an artifact.
    pub ibi_delta_max_ms: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            ibi_valid_min_ms: 300,
            ibi_valid_max_ms: 2000,
            ibi_delta_max_ms: 500,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    pub wifi_check_interval_ms: u64,
    pub transmission_interval_ms: u64,
    pub reconnect_backoff_min_ms: u64,
    pub reconnect_backoff_max_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            wifi_check_interval_ms: 30000,
            transmission_interval_ms: 1000,
            reconnect_backoff_min_ms: 1000,
            reconnect_backoff_max_ms: 30000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    pub window_ms: u64,
    /// Position of the suggested threshold between the signal mean (0.0) and its maximum (1.0).
    pub threshold_fraction: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window_ms: 15000,
            threshold_fraction: 0.5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SensorSource {
    #[default]
    Simulated,
    Csv,
    Tcp,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    pub source: SensorSource,
    pub csv_path: Option<String>,
    pub tcp_address: String,
    pub simulated_bpm: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            source: SensorSource::Simulated,
            csv_path: None,
            tcp_address: "127.0.0.1:8080".to_string(),
            simulated_bpm: 72.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    pub debug_mode: bool,
    pub led_status: bool,
    pub log_dir: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            debug_mode: true,
            led_status: true,
            log_dir: "logs".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(self.network.server_url.starts_with("http://")
            || self.network.server_url.starts_with("https://"))
        {
            return invalid(format!(
                "network.server_url must be an http(s) URL, got '{}'",
                self.network.server_url
            ));
        }
        if self.network.request_timeout_ms == 0 {
            return invalid("network.request_timeout_ms must be positive".to_string());
        }

        for (name, pin) in [
            ("hardware.pulse_pin", self.hardware.pulse_pin),
            ("hardware.led_pin", self.hardware.led_pin),
        ] {
            if pin > MAX_GPIO {
                return invalid(format!("{} must be a GPIO in 0..={}, got {}", name, MAX_GPIO, pin));
            }
        }
        if self.hardware.pulse_pin == self.hardware.led_pin {
            return invalid("hardware.pulse_pin and hardware.led_pin must differ".to_string());
        }

        if self.detector.peak_threshold == 0 || self.detector.peak_threshold > ADC_MAX {
            return invalid(format!(
                "detector.peak_threshold must be in 1..={}, got {}",
                ADC_MAX, self.detector.peak_threshold
            ));
        }

        if self.sampling.sample_rate_hz == 0 || self.sampling.sample_rate_hz > 1000 {
            return invalid(format!(
                "sampling.sample_rate_hz must be in 1..=1000, got {}",
                self.sampling.sample_rate_hz
            ));
        }
        if self.sampling.buffer_size == 0 {
            return invalid("sampling.buffer_size must be positive".to_string());
        }

        if self.aggregation.ibi_valid_min_ms >= self.aggregation.ibi_valid_max_ms {
            return invalid("aggregation.ibi_valid_min_ms must be below ibi_valid_max_ms".to_string());
        }
        if self.aggregation.ibi_delta_max_ms == 0 {
            return invalid("aggregation.ibi_delta_max_ms must be positive".to_string());
        }

        let schedule = &self.schedule;
        if schedule.transmission_interval_ms == 0 || schedule.wifi_check_interval_ms == 0 {
            return invalid("schedule intervals must be positive".to_string());
        }
        if schedule.reconnect_backoff_min_ms == 0
            || schedule.reconnect_backoff_min_ms > schedule.reconnect_backoff_max_ms
        {
            return invalid(
                "schedule.reconnect_backoff_min_ms must be positive and not above reconnect_backoff_max_ms"
                    .to_string(),
            );
        }

        if !(0.0..=1.0).contains(&self.calibration.threshold_fraction) {
            return invalid("calibration.threshold_fraction must be between 0 and 1".to_string());
        }
        if self.calibration.window_ms == 0 {
            return invalid("calibration.window_ms must be positive".to_string());
        }

        if self.sensor.source == SensorSource::Csv && self.sensor.csv_path.is_none() {
            return invalid("sensor.csv_path is required when sensor.source is csv".to_string());
        }
        if !(self.sensor.simulated_bpm.is_finite() && self.sensor.simulated_bpm > 0.0) {
            return invalid("sensor.simulated_bpm must be positive".to_string());
        }

        Ok(())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let config_str = fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&config_str)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), ConfigError> {
    let yaml = serde_yaml::to_string(config)?;
    fs::write(path, yaml)?;
    Ok(())
}
