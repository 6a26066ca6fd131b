//! G.711 μ-law (PCMU) codec
//!
//! Scalar operations never fail. Block operations require the input and
//! output slices to have the same length and report a mismatch instead of
//! panicking, so the media path can drop a bad frame and move on.

pub mod reference;
pub mod tables;

use crate::error::{CodecError, Result};

pub use reference::{ulaw_compress, ulaw_expand};

/// μ-law code word for a zero sample
pub const ULAW_SILENCE: u8 = 0xFF;

/// Encode one linear sample
#[inline]
pub fn encode(sample: i16) -> u8 {
    ulaw_compress(sample)
}

/// Decode one code word through the lookup table
#[inline]
pub fn decode(code: u8) -> i16 {
    tables::decode_ulaw(code)
}

/// Encode a block of linear samples
///
/// # Arguments
///
/// * `samples` - Linear PCM samples
/// * `output` - Destination for the code words, the same length as `samples`
///
/// # Returns
///
/// `Ok(())`, or [`CodecError::InvalidFrameSize`](crate::CodecError::InvalidFrameSize)
/// if the lengths differ
pub fn encode_block(samples: &[i16], output: &mut [u8]) -> Result<()> {
    if samples.len() != output.len() {
        return Err(CodecError::invalid_frame_size(samples.len(), output.len()));
    }
    for (out, &sample) in output.iter_mut().zip(samples) {
        *out = encode(sample);
    }
    Ok(())
}

/// Decode a block of code words
///
/// # Arguments
///
/// * `encoded` - μ-law code words
/// * `output` - Destination for linear samples, the same length as `encoded`
///
/// # Returns
///
/// `Ok(())`, or [`CodecError::InvalidFrameSize`](crate::CodecError::InvalidFrameSize)
/// if the lengths differ
pub fn decode_block(encoded: &[u8], output: &mut [i16]) -> Result<()> {
    if encoded.len() != output.len() {
        return Err(CodecError::invalid_frame_size(encoded.len(), output.len()));
    }
    for (out, &code) in output.iter_mut().zip(encoded) {
        *out = decode(code);
    }
    Ok(())
}

/// Encode a frame into a freshly allocated payload
pub fn encode_frame(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| encode(s)).collect()
}

/// Decode a payload into freshly allocated samples
pub fn decode_frame(encoded: &[u8]) -> Vec<i16> {
    encoded.iter().map(|&c| decode(c)).collect()
}
