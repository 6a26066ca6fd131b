//! Audio conversion between the call and the AI service

use crate::error::Result;
use codec_core::{AI_INPUT_SAMPLES_PER_FRAME, AI_OUTPUT_SAMPLES_PER_FRAME, SAMPLES_PER_FRAME, g711, resample};

/// One silent uplink frame (320 zero samples, little-endian)
pub const SILENT_UPLINK_FRAME: [u8; AI_INPUT_SAMPLES_PER_FRAME * 2] =
    [0; AI_INPUT_SAMPLES_PER_FRAME * 2];

/// Turn one 8 kHz frame into 16 kHz little-endian PCM bytes.
pub fn uplink_frame(narrowband: &[i16]) -> Result<Vec<u8>> {
    let mut wide = [0i16; AI_INPUT_SAMPLES_PER_FRAME];
    resample::upsample_2x(narrowband, &mut wide)?;
    let mut bytes = Vec::with_capacity(wide.len() * 2);
    for sample in wide {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    Ok(bytes)
}

/// Turn one 24 kHz frame into a 160-byte PCMU payload.
pub fn downlink_frame(samples: &[i16]) -> Result<Vec<u8>> {
    let mut narrow = [0i16; SAMPLES_PER_FRAME];
    resample::downsample_3x(samples, &mut narrow)?;
    Ok(g711::encode_frame(&narrow))
}

/// Reassembles arbitrarily sized little-endian PCM chunks into fixed frames.
///
/// Chunks may split a sample; the odd byte is carried into the next chunk.
#[derive(Debug)]
pub struct FrameAssembler {
    frame_len: usize,
    pending: Vec<i16>,
    carry: Option<u8>,
}

impl FrameAssembler {
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame_len,
            pending: Vec::with_capacity(frame_len * 2),
            carry: None,
        }
    }

    /// Frames for 24 kHz downlink audio
    pub fn downlink() -> Self {
        Self::new(AI_OUTPUT_SAMPLES_PER_FRAME)
    }

    /// Append a chunk and return every frame it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<i16>> {
        let mut rest = bytes;
        if let Some(low) = self.carry.take() {
            match rest.split_first() {
                Some((&high, tail)) => {
                    self.pending.push(i16::from_le_bytes([low, high]));
                    rest = tail;
                }
                None => {
                    self.carry = Some(low);
                    return Vec::new();
                }
            }
        }

        let mut pairs = rest.chunks_exact(2);
        self.pending
            .extend(pairs.by_ref().map(|pair| i16::from_le_bytes([pair[0], pair[1]])));
        if let [odd] = pairs.remainder() {
            self.carry = Some(*odd);
        }

        let complete = self.pending.len() / self.frame_len;
        let mut frames = Vec::with_capacity(complete);
        for _ in 0..complete {
            frames.push(self.pending.drain(..self.frame_len).collect());
        }
        frames
    }

    /// Samples waiting for the rest of their frame
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    /// Drop any partial frame
    pub fn clear(&mut self) {
        self.pending.clear();
        self.carry = None;
    }
}
