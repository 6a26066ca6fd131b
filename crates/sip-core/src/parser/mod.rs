//! nom parsers for the start line and header block

mod message;
mod utils;

pub use message::{Head, StartLine, parse_head, split_head_body};
pub use utils::unfold_lws;
