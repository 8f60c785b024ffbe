use super::{to_adc, PulseSensor, SensorError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Replays a recording, one reading per row taken from the first column.
/// A non-numeric first row is treated as a header.
pub struct CsvSensor {
    name: String,
    readings: Vec<i64>,
    position: usize,
}

impl CsvSensor {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SensorError> {
        let name = path.as_ref().display().to_string();
        let file = File::open(path)?;
        Self::from_reader(name, file)
    }

    pub fn from_reader<R: Read>(name: String, reader: R) -> Result<Self, SensorError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut readings = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            let field = match record.get(0) {
                Some(field) if !field.is_empty() => field,
                _ => continue,
            };
            match field.parse::<f64>() {
                Ok(value) if value.is_finite() => readings.push(value.round() as i64),
                Ok(_) => {
                    return Err(SensorError::Read(format!(
                        "{}: row {} is not a finite reading: '{}'",
                        name,
                        row + 1,
                        field
                    )))
                }
                Err(_) if row == 0 => continue,
                Err(_) => {
                    return Err(SensorError::Read(format!(
                        "{}: row {} is not a number: '{}'",
                        name,
                        row + 1,
                        field
                    )))
                }
            }
        }

        Ok(Self {
            name,
            readings,
            position: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.readings.len() - self.position
    }
}

impl PulseSensor for CsvSensor {
    fn read(&mut self) -> Result<u16, SensorError> {
        let raw = *self
            .readings
            .get(self.position)
            .ok_or(SensorError::Exhausted)?;
        self.position += 1;
        to_adc(raw)
    }

    fn describe(&self) -> String {
        format!("csv recording {} ({} samples)", self.name, self.readings.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sensor(contents: &str) -> Result<CsvSensor, SensorError> {
        CsvSensor::from_reader("test.csv".to_string(), contents.as_bytes())
    }

    #[test]
    fn skips_header_and_replays_first_column() {
        let mut sensor = sensor("adc,lead\n1800,1\n2600.4,0\n1900,1\n").unwrap();
        assert_eq!(sensor.len(), 3);
        assert_eq!(sensor.read().unwrap(), 1800);
        assert_eq!(sensor.read().unwrap(), 2600);
        assert_eq!(sensor.remaining(), 1);
        assert_eq!(sensor.read().unwrap(), 1900);
        assert!(matches!(sensor.read(), Err(SensorError::Exhausted)));
    }

    #[test]
    fn out_of_range_reading_costs_one_tick() {
        let mut sensor = sensor("1800\n5000\n1900\n").unwrap();
        assert_eq!(sensor.read().unwrap(), 1800);
        assert!(matches!(sensor.read(), Err(SensorError::OutOfRange(5000))));
        assert_eq!(sensor.read().unwrap(), 1900);
    }

    #[test]
    fn garbage_after_first_row_is_rejected() {
        assert!(matches!(sensor("1800\nabc\n"), Err(SensorError::Read(_))));
    }

    #[test]
    fn non_finite_readings_are_rejected() {
        for cell in ["nan", "NaN", "inf", "-inf"] {
            let contents = format!("1800\n{}\n1900\n", cell);
            match sensor(&contents) {
                Err(SensorError::Read(message)) => assert!(message.contains("row 2")),
                other => panic!("'{}' accepted: {:?}", cell, other.map(|s| s.len())),
            }
        }
    }

    #[test]
    fn opens_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1750").unwrap();
        writeln!(file, "2750").unwrap();
        let mut sensor = CsvSensor::open(file.path()).unwrap();
        assert!(sensor.describe().contains("2 samples"));
        assert_eq!(sensor.read().unwrap(), 1750);
        assert!(!sensor.is_empty());
    }
}
