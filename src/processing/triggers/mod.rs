pub mod backoff;
pub mod interval;
pub mod rate;

pub use backoff::BackoffTrigger;
pub use interval::IntervalTrigger;
pub use rate::RateTrigger;
