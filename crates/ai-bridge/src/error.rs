use codec_core::CodecError;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors raised by the AI streaming bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection closed")]
    Closed,

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("API key not configured")]
    MissingApiKey,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl BridgeError {
    /// Errors after which the current link cannot be trusted
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            Self::Connect(_) | Self::Send(_) | Self::Transport(_) | Self::Closed | Self::Timeout(_)
        )
    }
}
