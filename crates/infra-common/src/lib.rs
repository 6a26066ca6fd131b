//! Shared infrastructure for the callbridge crates: logging setup, a
//! rate limiter for hot-path warnings, and TOML configuration loading.

pub mod config;
pub mod errors;
pub mod logging;

pub use errors::{Error, Result};
pub use logging::{parse_log_level, setup_logging, LogThrottle, LoggingConfig};
