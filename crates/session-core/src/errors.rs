use thiserror::Error;

/// Result type for call control
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised while handling a call
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("SIP error: {0}")]
    Sip(#[from] sip_core::Error),

    #[error("Media error: {0}")]
    Media(#[from] media_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
