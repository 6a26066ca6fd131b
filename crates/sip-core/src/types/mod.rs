//! Typed pieces of SIP messages

mod header_name;
mod method;
mod status;

pub use header_name::HeaderName;
pub use method::Method;
pub use status::StatusCode;

use std::fmt;

/// One header line: name and raw (unfolded, trimmed) value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: HeaderName,
    pub value: String,
}

impl Header {
    pub fn new(name: HeaderName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}
