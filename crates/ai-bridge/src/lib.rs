//! # AI-Bridge: streaming call audio to Gemini Live
//!
//! [`LiveBridge`] implements [`media_core::MediaBridge`]. Once a call's media
//! starts it keeps one WebSocket session to the Gemini Live API open for the
//! life of the call:
//!
//! - caller audio is pulled from the capture buffer 20 ms at a time,
//!   upsampled 8 kHz → 16 kHz and sent as realtime input
//! - model audio (24 kHz) is reassembled into 20 ms frames, downsampled to
//!   8 kHz, PCMU-encoded and pushed to the caller
//! - transport faults, idle links and configuration changes force a reset
//!   and a reconnect with exponential backoff; the call itself is never
//!   torn down by the bridge
//!
//! The network side sits behind [`LiveConnector`] so the bridge can be
//! exercised without a real service.

pub mod audio;
pub mod bridge;
pub mod config;
pub mod error;
pub mod protocol;
pub mod state;
pub mod transport;

pub use bridge::{BridgeStats, LiveBridge};
pub use config::AiConfig;
pub use error::{BridgeError, Result};
pub use protocol::{ClientMessage, ServerEvent};
pub use state::{ConnectionState, LinkEvent, LinkPhase, ReconnectBackoff};
pub use transport::{LiveConnection, LiveConnector, LiveLink, LiveStream, WebSocketConnector};
