//! Bench tools: sample server, offline replay and threshold calibration.

pub mod calibrate;
pub mod process_file;
pub mod server;
