//! Delivery of heart-rate records and network link supervision.

pub mod csv_sink;
pub mod http;
pub mod link;
pub mod record;

use thiserror::Error;

pub use csv_sink::CsvSink;
pub use http::HttpTransmitter;
pub use link::{OfflineLink, TcpReachLink};
pub use record::TransmissionRecord;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Transmission failed: {0}")]
    TransmissionFailure(String),
}

/// Delivers one record. A failed delivery is not retried by the caller.
pub trait Transmitter {
    fn send(&mut self, record: &TransmissionRecord) -> Result<(), ReportError>;

    fn describe(&self) -> String;
}

impl<T: Transmitter + ?Sized> Transmitter for Box<T> {
    fn send(&mut self, record: &TransmissionRecord) -> Result<(), ReportError> {
        (**self).send(record)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Connectivity of the path between the node and the ingestion server.
pub trait Link {
    /// Performs a connectivity check.
    fn check(&mut self) -> bool;

    /// Last known state, without probing.
    fn is_connected(&self) -> bool;

    fn reconnect(&mut self) -> Result<(), ReportError>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn check(&mut self) -> bool {
        (**self).check()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn reconnect(&mut self) -> Result<(), ReportError> {
        (**self).reconnect()
    }
}
