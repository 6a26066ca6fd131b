//! # Codec-Core: narrowband codec and rate conversion
//!
//! This crate holds the pure, allocation-light audio primitives used on the
//! call media path:
//!
//! - **G.711 μ-law (PCMU)**: scalar and block encode/decode with a decode
//!   lookup table built once on first use
//! - **Rate conversion**: fixed integer ratios between the telephony rate
//!   (8 kHz) and the AI service rates (16 kHz up, 24 kHz down)
//! - **Audio geometry**: frame sizes and payload constants shared by the
//!   transport and bridge crates
//!
//! ## Usage
//!
//! ```rust
//! use codec_core::{g711, resample, SAMPLES_PER_FRAME};
//!
//! let samples = vec![0i16; SAMPLES_PER_FRAME];
//! let encoded = g711::encode_frame(&samples);
//! assert_eq!(encoded.len(), 160);
//!
//! let mut wide = vec![0i16; SAMPLES_PER_FRAME * 2];
//! resample::upsample_2x(&samples, &mut wide)?;
//! # Ok::<(), codec_core::CodecError>(())
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod g711;
pub mod resample;
pub mod types;

pub use error::{CodecError, Result};
pub use types::{
    AudioGeometry, SampleRate, AI_INPUT_SAMPLES_PER_FRAME, AI_INPUT_SAMPLE_RATE,
    AI_OUTPUT_SAMPLES_PER_FRAME, AI_OUTPUT_SAMPLE_RATE, FRAME_MS, NARROWBAND_SAMPLE_RATE,
    PAYLOAD_TYPE_PCMU, PAYLOAD_TYPE_TELEPHONE_EVENT, PCMU_PAYLOAD_BYTES, SAMPLES_PER_FRAME,
};

/// Version information for the codec library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
