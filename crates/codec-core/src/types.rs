//! Audio geometry shared by the media and bridge crates
//!
//! Every frame on the call path covers the same 20 ms of audio; only the
//! sample rate differs between the telephony leg and the AI service.

use crate::error::{CodecError, Result};
use std::fmt;

/// Telephony sample rate in Hz
pub const NARROWBAND_SAMPLE_RATE: u32 = 8_000;

/// Rate the AI service expects for uplink audio
pub const AI_INPUT_SAMPLE_RATE: u32 = 16_000;

/// Rate the AI service produces on the downlink
pub const AI_OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Packetization interval in milliseconds
pub const FRAME_MS: u32 = 20;

/// Samples in one 20 ms narrowband frame
pub const SAMPLES_PER_FRAME: usize = 160;

/// Bytes in one PCMU payload (one byte per sample)
pub const PCMU_PAYLOAD_BYTES: usize = SAMPLES_PER_FRAME;

/// Samples in one 20 ms uplink frame for the AI service
pub const AI_INPUT_SAMPLES_PER_FRAME: usize = 320;

/// Samples in one 20 ms downlink frame from the AI service
pub const AI_OUTPUT_SAMPLES_PER_FRAME: usize = 480;

/// Static RTP payload type for PCMU
pub const PAYLOAD_TYPE_PCMU: u8 = 0;

/// Dynamic payload type advertised for RFC 4733 telephone events
pub const PAYLOAD_TYPE_TELEPHONE_EVENT: u8 = 101;

/// The sample rates that appear on the call path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleRate {
    /// 8 kHz telephony audio
    Narrowband8k,
    /// 16 kHz AI uplink audio
    Wideband16k,
    /// 24 kHz AI downlink audio
    Ai24k,
}

impl SampleRate {
    /// Rate in Hz
    pub fn hz(self) -> u32 {
        match self {
            Self::Narrowband8k => NARROWBAND_SAMPLE_RATE,
            Self::Wideband16k => AI_INPUT_SAMPLE_RATE,
            Self::Ai24k => AI_OUTPUT_SAMPLE_RATE,
        }
    }

    /// Look up a rate by its value in Hz
    pub fn from_hz(hz: u32) -> Result<Self> {
        match hz {
            NARROWBAND_SAMPLE_RATE => Ok(Self::Narrowband8k),
            AI_INPUT_SAMPLE_RATE => Ok(Self::Wideband16k),
            AI_OUTPUT_SAMPLE_RATE => Ok(Self::Ai24k),
            rate => Err(CodecError::InvalidSampleRate { rate }),
        }
    }

    /// Samples in one frame of `frame_ms` milliseconds
    pub fn samples_per_frame(self, frame_ms: u32) -> usize {
        (self.hz() as usize * frame_ms as usize) / 1000
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.hz())
    }
}

/// Frame geometry of the three audio legs.
///
/// The bridge checks this once at start-up; a mismatch disables AI bridging
/// for the session instead of failing on the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioGeometry {
    /// Telephony leg
    pub narrowband: SampleRate,
    /// AI uplink leg
    pub ai_input: SampleRate,
    /// AI downlink leg
    pub ai_output: SampleRate,
    /// Frame duration shared by all legs
    pub frame_ms: u32,
}

impl Default for AudioGeometry {
    fn default() -> Self {
        Self {
            narrowband: SampleRate::Narrowband8k,
            ai_input: SampleRate::Wideband16k,
            ai_output: SampleRate::Ai24k,
            frame_ms: FRAME_MS,
        }
    }
}

impl AudioGeometry {
    /// Narrowband samples per frame
    pub fn narrowband_frame(&self) -> usize {
        self.narrowband.samples_per_frame(self.frame_ms)
    }

    /// Uplink samples per frame
    pub fn ai_input_frame(&self) -> usize {
        self.ai_input.samples_per_frame(self.frame_ms)
    }

    /// Downlink samples per frame
    pub fn ai_output_frame(&self) -> usize {
        self.ai_output.samples_per_frame(self.frame_ms)
    }

    /// Verify the frame sizes match the fixed 2x / 3x converters.
    pub fn validate(&self) -> Result<()> {
        let narrow = self.narrowband_frame();
        if narrow != SAMPLES_PER_FRAME {
            return Err(CodecError::invalid_config(format!(
                "narrowband frame is {narrow} samples, codec expects {SAMPLES_PER_FRAME}"
            )));
        }
        if self.ai_input_frame() != narrow * 2 {
            return Err(CodecError::invalid_config(format!(
                "uplink frame of {} samples is not 2x {narrow}",
                self.ai_input_frame()
            )));
        }
        if self.ai_output_frame() != narrow * 3 {
            return Err(CodecError::invalid_config(format!(
                "downlink frame of {} samples is not 3x {narrow}",
                self.ai_output_frame()
            )));
        }
        Ok(())
    }
}
