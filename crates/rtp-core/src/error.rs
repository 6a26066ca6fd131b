use thiserror::Error;

/// Result type for RTP operations
pub type Result<T> = std::result::Result<T, RtpError>;

/// Errors raised while framing or parsing RTP packets
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RtpError {
    /// Fewer bytes than a fixed header
    #[error("RTP packet too short: {0} bytes")]
    PacketTooShort(usize),

    /// Version bits other than 2
    #[error("Invalid RTP version: {0}")]
    InvalidVersion(u8),

    /// CSRC list, extension or padding runs past the end of the datagram
    #[error("Truncated RTP header: need {needed} bytes, got {actual}")]
    TruncatedHeader { needed: usize, actual: usize },

    /// Output buffer cannot hold the encoded packet
    #[error("Buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },
}
