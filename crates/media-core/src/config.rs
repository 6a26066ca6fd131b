//! Media session configuration

use crate::error::{Error, Result};
use codec_core::{FRAME_MS, NARROWBAND_SAMPLE_RATE};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Per-call media settings, fixed when the session is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Address the RTP socket binds to
    pub bind_ip: IpAddr,
    /// Local RTP port; 0 picks an ephemeral port
    pub rtp_port: u16,
    /// Echo received audio back to the caller instead of bridging to AI
    pub loopback: bool,
    /// Delay of the loopback echo, in 20 ms frames
    pub echo_delay_frames: usize,
    /// Capacity of the capture ring buffer in milliseconds
    pub capture_buffer_ms: u32,
    /// Depth of the outbound frame queue; oldest frames are dropped beyond it
    pub outbound_queue_frames: usize,
    /// Play a short tone when the media starts
    pub connected_tone: bool,
    /// Upper bound on the bridge shutdown, and again on the media threads,
    /// during disposal
    pub dispose_timeout_ms: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            rtp_port: 40_000,
            loopback: false,
            echo_delay_frames: 50,
            capture_buffer_ms: 2_000,
            outbound_queue_frames: 3_000,
            connected_tone: true,
            dispose_timeout_ms: 1_000,
        }
    }
}

impl MediaConfig {
    /// Capture buffer capacity in narrowband samples
    pub fn capture_buffer_samples(&self) -> usize {
        (NARROWBAND_SAMPLE_RATE as usize / 1000) * self.capture_buffer_ms as usize
    }

    pub fn dispose_timeout(&self) -> Duration {
        Duration::from_millis(self.dispose_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture_buffer_ms < FRAME_MS {
            return Err(Error::InvalidConfig(format!(
                "capture buffer of {} ms is shorter than one frame",
                self.capture_buffer_ms
            )));
        }
        if self.outbound_queue_frames == 0 {
            return Err(Error::InvalidConfig("outbound queue depth must be non-zero".into()));
        }
        if self.loopback && self.echo_delay_frames == 0 {
            return Err(Error::InvalidConfig("echo delay must be at least one frame".into()));
        }
        Ok(())
    }
}
