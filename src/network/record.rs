use crate::processing::aggregate::HeartRateSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload posted to the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionRecord {
    pub device_id: String,
    /// Monotonic milliseconds since the node started.
    pub ts: u64,
    pub recorded_at: DateTime<Utc>,
    pub bpm: f64,
    pub ibi_ms: f64,
    pub rmssd_ms: f64,
    pub beats: usize,
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl TransmissionRecord {
    pub fn new(device_id: &str, ts: u64, summary: &HeartRateSummary) -> Self {
        Self::at(device_id, ts, Utc::now(), summary)
    }

    pub fn at(
        device_id: &str,
        ts: u64,
        recorded_at: DateTime<Utc>,
        summary: &HeartRateSummary,
    ) -> Self {
        Self {
            device_id: device_id.to_string(),
            ts,
            recorded_at,
            bpm: round_tenth(summary.bpm),
            ibi_ms: round_tenth(summary.mean_ibi_ms),
            rmssd_ms: round_tenth(summary.rmssd_ms),
            beats: summary.beats,
        }
    }
}
