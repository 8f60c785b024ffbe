use super::{ReportError, TransmissionRecord, Transmitter};
use crate::config::NetworkConfig;
use log::debug;
use reqwest::blocking::Client;
use std::time::Duration;

/// Posts records as JSON. Every request is bounded by the configured timeout.
pub struct HttpTransmitter {
    client: Client,
    url: String,
}

impl HttpTransmitter {
    pub fn new(config: &NetworkConfig) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ReportError::TransmissionFailure(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.server_url.clone(),
        })
    }
}

impl Transmitter for HttpTransmitter {
    fn send(&mut self, record: &TransmissionRecord) -> Result<(), ReportError> {
        let response = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ReportError::NetworkUnavailable(e.to_string())
                } else if e.is_timeout() {
                    ReportError::TransmissionFailure(format!("timed out: {}", e))
                } else {
                    ReportError::TransmissionFailure(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::TransmissionFailure(format!(
                "server responded {}",
                status
            )));
        }

        debug!("posted {:.1} bpm to {} ({})", record.bpm, self.url, status);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("http post to {}", self.url)
    }
}
