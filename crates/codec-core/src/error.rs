//! Error handling for the codec library

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised by block codec and rate conversion operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input and output lengths do not satisfy the operation's ratio
    #[error("Invalid frame size: expected {expected}, got {actual}")]
    InvalidFrameSize {
        /// Length the operation required
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Destination buffer cannot hold the result
    #[error("Buffer too small: need {needed} samples, got {actual}")]
    BufferTooSmall {
        /// Required capacity
        needed: usize,
        /// Supplied capacity
        actual: usize,
    },

    /// Sample rate outside the supported set
    #[error("Invalid sample rate: {rate}Hz")]
    InvalidSampleRate {
        /// Offending rate
        rate: u32,
    },

    /// Inconsistent audio geometry
    #[error("Invalid codec configuration: {details}")]
    InvalidConfig {
        /// Human readable description
        details: String,
    },
}

impl CodecError {
    /// Create a new invalid frame size error
    pub fn invalid_frame_size(expected: usize, actual: usize) -> Self {
        Self::InvalidFrameSize { expected, actual }
    }

    /// Create a new invalid configuration error
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }
}
