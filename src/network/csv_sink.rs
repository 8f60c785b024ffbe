use super::{ReportError, TransmissionRecord, Transmitter};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Writes records to a CSV file instead of the network, for offline runs.
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
    written: usize,
}

impl CsvSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref().to_path_buf();
        let writer = csv::Writer::from_path(&path).map_err(|e| {
            ReportError::TransmissionFailure(format!("cannot create {}: {}", path.display(), e))
        })?;
        Ok(Self {
            path,
            writer,
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl Transmitter for CsvSink {
    fn send(&mut self, record: &TransmissionRecord) -> Result<(), ReportError> {
        self.writer
            .serialize(record)
            .and_then(|_| self.writer.flush().map_err(csv::Error::from))
            .map_err(|e| ReportError::TransmissionFailure(e.to_string()))?;
        self.written += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("csv file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::aggregate::HeartRateSummary;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        let mut sink = CsvSink::create(&path).unwrap();

        let summary = HeartRateSummary {
            bpm: 60.0,
            mean_ibi_ms: 1000.0,
            rmssd_ms: 0.0,
            beats: 3,
        };
        sink.send(&TransmissionRecord::new("offline", 1000, &summary)).unwrap();
        sink.send(&TransmissionRecord::new("offline", 2000, &summary)).unwrap();
        assert_eq!(sink.written(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("device_id,ts,recorded_at,bpm"));
        assert!(lines[2].starts_with("offline,2000,"));
    }
}
