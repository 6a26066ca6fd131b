//! Seam between a media session and an external audio bridge
//!
//! The session hands the bridge a [`MediaPorts`] bundle when it starts:
//! captured caller audio is pulled through a [`CaptureReader`], and frames
//! for the caller are pushed through a [`PlaybackSink`]. The bridge never
//! touches the socket or the media threads.

use crate::buffer::{AudioRingBuffer, DropOldestQueue};
use crate::error::{Error, Result};
use async_trait::async_trait;
use codec_core::PCMU_PAYLOAD_BYTES;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Pull-side handle on the capture ring buffer (8 kHz linear PCM)
#[derive(Debug, Clone)]
pub struct CaptureReader {
    ring: Arc<AudioRingBuffer>,
}

impl CaptureReader {
    pub fn new(ring: Arc<AudioRingBuffer>) -> Self {
        Self { ring }
    }

    /// Read up to `out.len()` samples; returns the number read.
    pub fn read(&self, out: &mut [i16]) -> usize {
        self.ring.read(out)
    }

    /// Samples waiting to be read
    pub fn available(&self) -> usize {
        self.ring.len()
    }

    /// Samples lost because nobody read them in time
    pub fn dropped(&self) -> u64 {
        self.ring.dropped_count()
    }
}

/// Push-side handle on the outbound frame queue (PCMU payloads)
#[derive(Debug, Clone)]
pub struct PlaybackSink {
    queue: Arc<DropOldestQueue<Vec<u8>>>,
}

impl PlaybackSink {
    pub fn new(queue: Arc<DropOldestQueue<Vec<u8>>>) -> Self {
        Self { queue }
    }

    /// Queue one 160-byte PCMU frame for transmission.
    pub fn push(&self, frame: Vec<u8>) -> Result<()> {
        if frame.len() != PCMU_PAYLOAD_BYTES {
            return Err(Error::InvalidFrame {
                expected: PCMU_PAYLOAD_BYTES,
                actual: frame.len(),
            });
        }
        self.queue.push(frame);
        Ok(())
    }

    /// Discard frames not yet transmitted
    pub fn flush(&self) -> usize {
        self.queue.clear()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Frames evicted because the queue was full
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }
}

/// Everything a bridge gets from the session it is attached to
#[derive(Debug, Clone)]
pub struct MediaPorts {
    pub capture: CaptureReader,
    pub playback: PlaybackSink,
    /// Cancelled when the session is disposed
    pub cancel: CancellationToken,
}

/// An audio bridge driven by a media session
#[async_trait]
pub trait MediaBridge: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Begin bridging. Called once, after the media threads are running.
    fn start(&self, ports: MediaPorts) -> Result<()>;

    /// Stop all bridge activity and release its resources.
    async fn shutdown(&self);
}
