//! RTP framing for the call media path.
//!
//! Only the fixed 12-byte header is ever written. Parsing accepts what real
//! endpoints send (CSRC lists, header extensions, padding) and hands back a
//! borrowed view of the payload.

pub mod error;
pub mod packet;
pub mod stream;

pub use error::{Result, RtpError};
pub use packet::{encode_into, RtpHeader, RtpPacket, RtpPacketView, RTP_HEADER_SIZE, RTP_VERSION};
pub use stream::{generate_ssrc, random_initial_sequence, random_initial_timestamp, RtpStream};
