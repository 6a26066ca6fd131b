use codec_core::CodecError;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for media operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for media operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The RTP socket could not be bound
    #[error("Failed to bind media socket {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// A playback frame did not have the fixed payload size
    #[error("Invalid frame: expected {expected} bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Codec error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Bridge failed to start
    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Media session already started")]
    AlreadyStarted,

    #[error("Media session disposed")]
    Disposed,
}
