//! Scalar μ-law compression and expansion
//!
//! The classic biased-exponent form: clip the magnitude to 32635, add a bias
//! of 0x84, locate the highest set bit among seven exponent levels above the
//! first, take the four bits below it as the mantissa and invert the result.

/// Bias added to the magnitude before segment search
pub const BIAS: i32 = 0x84;

/// Largest magnitude that survives the bias without overflowing 15 bits
pub const CLIP: i32 = 32_635;

/// μ-law compression of one 16-bit linear sample
///
/// # Arguments
///
/// * `sample` - Input linear PCM sample (16-bit signed)
///
/// # Returns
///
/// μ-law code word (8-bit). Magnitudes above [`CLIP`] saturate to the
/// outermost segment.
pub fn ulaw_compress(sample: i16) -> u8 {
    let mut pcm = sample as i32;
    let sign = if pcm < 0 {
        pcm = -pcm;
        0x80
    } else {
        0x00
    };

    if pcm > CLIP {
        pcm = CLIP;
    }
    pcm += BIAS;

    let mut exponent = 7;
    let mut mask = 0x4000;
    while exponent > 0 && (pcm & mask) == 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = (pcm >> (exponent + 3)) & 0x0F;
    !((sign | (exponent << 4) | mantissa) as u8)
}

/// μ-law expansion of one 8-bit code word
///
/// # Arguments
///
/// * `compressed` - μ-law code word (8-bit)
///
/// # Returns
///
/// Linear PCM sample (16-bit signed), within ±32124
pub fn ulaw_expand(compressed: u8) -> i16 {
    let inverted = !compressed;
    let sign = inverted & 0x80;
    let exponent = ((inverted >> 4) & 0x07) as i32;
    let mantissa = (inverted & 0x0F) as i32;

    let magnitude = (((mantissa << 3) + BIAS) << exponent) - BIAS;
    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}
