pub mod clock;
pub mod config;
pub mod local;
pub mod network;
pub mod processing;
pub mod reporter;
pub mod sensor;
pub mod status;
pub mod utils;
