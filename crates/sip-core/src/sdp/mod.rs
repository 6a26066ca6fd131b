//! Session descriptions for the single audio stream
//!
//! Only what the gateway needs is read from an offer: the IPv4 connection
//! address, the audio port and the offered payload types. The answer is a
//! fixed template offering PCMU and telephone-event.

mod answer;
mod line_parser;
mod offer;

pub use answer::{SDP_CONTENT_TYPE, SESSION_NAME, build_answer};
pub use line_parser::{parse_connection_value, parse_media_value, parse_sdp_line};
pub use offer::{SdpOffer, parse_offer};
