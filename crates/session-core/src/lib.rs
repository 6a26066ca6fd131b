//! # Session-Core: call control for callbridge
//!
//! The gateway answers one call at a time. [`CallController`] turns each
//! inbound SIP request into its responses and owns the [`Call`] in
//! progress: the media session bound to the caller's RTP endpoint and, in
//! AI mode, the Gemini Live bridge attached to it. [`SipGateway`] is the
//! UDP transport loop in front of the controller.
//!
//! ```text
//! INVITE ──► 100 Trying, 200 OK (SDP answer)   call Answered, media bound
//! ACK    ──► (no response)                     media started, call Active
//! BYE    ──► 200 OK                            media disposed, call dropped
//! other  ──► 405 Method Not Allowed
//! ```
//!
//! A new INVITE while a call exists replaces it. Nothing a peer sends can
//! take the controller down: errors and panics while handling a request
//! become `500 Server Internal Error`.

pub mod call;
pub mod config;
pub mod controller;
pub mod errors;
pub mod gateway;

pub use call::{Call, CallSnapshot, CallState, new_tag};
pub use config::GatewayConfig;
pub use controller::CallController;
pub use errors::{Result, SessionError};
pub use gateway::SipGateway;
