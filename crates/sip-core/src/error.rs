use crate::types::HeaderName;
use thiserror::Error;

/// A type alias for handling `Result`s with `Error` values
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading or writing SIP messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The message could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A header every request must carry is absent
    #[error("Missing required header: {0}")]
    MissingHeader(HeaderName),

    /// A header is present but its value is malformed
    #[error("Invalid {name} header: {value:?}")]
    InvalidHeader { name: HeaderName, value: String },

    /// The body is shorter than Content-Length announced
    #[error("Body truncated: Content-Length {expected}, got {actual} bytes")]
    TruncatedBody { expected: usize, actual: usize },

    /// The session description is unusable
    #[error("SDP error: {0}")]
    Sdp(String),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::ParseError(message.into())
    }

    pub(crate) fn invalid_header(name: HeaderName, value: &str) -> Self {
        Self::InvalidHeader {
            name,
            value: value.to_string(),
        }
    }
}
