pub mod aggregate;
pub mod calibration;
pub mod detectors;
pub mod ring_buffer;
pub mod sampler;
pub mod statistics;
pub mod triggers;
