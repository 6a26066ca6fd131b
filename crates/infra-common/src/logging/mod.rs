//! Logging setup and helpers

mod setup;
mod throttle;

pub use setup::{log_welcome, parse_log_level, setup_logging, LoggingConfig};
pub use throttle::LogThrottle;
