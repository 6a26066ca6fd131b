//! # Media-Core: call media for callbridge
//!
//! One [`MediaSession`] per call owns the RTP socket and two OS threads:
//!
//! - `rtp-tx` sends exactly one PCMU packet every 20 ms, taking frames from
//!   a drop-oldest outbound queue and filling gaps with silence
//! - `rtp-rx` learns the peer's real address from incoming traffic, decodes
//!   PCMU into a lossy capture ring buffer and, in loopback mode, echoes
//!   the caller back after a fixed delay
//!
//! An optional [`MediaBridge`] (the AI streaming bridge) is attached before
//! start and receives [`MediaPorts`]: a pull-style capture reader and a
//! push-style playback sink.

pub mod bridge;
pub mod buffer;
pub mod config;
pub mod error;
pub mod session;

pub use bridge::{CaptureReader, MediaBridge, MediaPorts, PlaybackSink};
pub use buffer::{AudioRingBuffer, DropOldestQueue};
pub use config::MediaConfig;
pub use error::{Error, Result};
pub use session::{MediaSession, MediaStats};

// Re-export the cancellation token so bridge implementations share one type.
pub use tokio_util::sync::CancellationToken;
