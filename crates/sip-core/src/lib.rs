//! # SIP-Core: the signaling subset callbridge speaks
//!
//! callbridge answers exactly one kind of dialog: an inbound INVITE carrying
//! an SDP offer, confirmed by ACK and ended by BYE. This crate provides the
//! pieces for that exchange:
//!
//! - [`SipMessage::parse`] turns a datagram into a [`SipRequest`] or a
//!   [`SipResponse`] (nom-based, compact header names expanded)
//! - [`SipResponse::for_request`] builds a response that copies the
//!   dialog-identifying headers from its request
//! - [`sdp`] reads the remote audio endpoint out of an offer and renders the
//!   fixed PCMU + telephone-event answer
//!
//! ```rust
//! use sip_core::{SipMessage, SipResponse, StatusCode};
//!
//! let data = b"OPTIONS sip:ai@192.0.2.1 SIP/2.0\r\n\
//!     Via: SIP/2.0/UDP 192.0.2.9:5060;branch=z9hG4bK1\r\n\
//!     From: <sip:alice@192.0.2.9>;tag=a1\r\n\
//!     To: <sip:ai@192.0.2.1>\r\n\
//!     Call-ID: c1\r\n\
//!     CSeq: 1 OPTIONS\r\n\r\n";
//!
//! let request = match SipMessage::parse(data)? {
//!     SipMessage::Request(request) => request,
//!     SipMessage::Response(_) => unreachable!(),
//! };
//! let response = SipResponse::for_request(&request, StatusCode::MethodNotAllowed);
//! assert!(response.to_bytes().starts_with(b"SIP/2.0 405 Method Not Allowed\r\n"));
//! # Ok::<(), sip_core::Error>(())
//! ```

pub mod error;
pub mod message;
pub mod parser;
pub mod sdp;
pub mod types;

pub use error::{Error, Result};
pub use message::{SipMessage, SipRequest, SipResponse};
pub use types::{Header, HeaderName, Method, StatusCode};
