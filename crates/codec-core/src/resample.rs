//! Fixed-ratio sample-rate conversion
//!
//! Linear interpolation up and box-filter averaging down. Neither direction
//! is band-limited, which is acceptable for speech going to and coming from
//! the AI service. All functions write into a caller-provided destination
//! so the 20 ms hot path never allocates.

use crate::error::{CodecError, Result};

/// Double the sample rate (8 kHz → 16 kHz).
///
/// Each input sample is followed by the truncated average of itself and its
/// successor. The last input has no successor, so it is repeated.
///
/// # Arguments
///
/// * `src` - Input samples at the lower rate
/// * `dst` - Output buffer, exactly twice as long as `src`
///
/// # Returns
///
/// `Ok(())` once `dst` is filled, or [`CodecError::InvalidFrameSize`] if
/// the lengths disagree, in which case `dst` is left untouched.
///
/// # Example
///
/// ```
/// use codec_core::resample::upsample_2x;
///
/// let mut wide = [0i16; 6];
/// upsample_2x(&[0, 100, 200], &mut wide).unwrap();
/// assert_eq!(wide, [0, 50, 100, 150, 200, 200]);
///
/// let mut short = [7i16; 5];
/// assert!(upsample_2x(&[0, 100, 200], &mut short).is_err());
/// assert_eq!(short, [7; 5]);
/// ```
pub fn upsample_2x(src: &[i16], dst: &mut [i16]) -> Result<()> {
    if dst.len() != src.len() * 2 {
        return Err(CodecError::invalid_frame_size(src.len() * 2, dst.len()));
    }

    for (i, &sample) in src.iter().enumerate() {
        let next = src.get(i + 1).copied().unwrap_or(sample);
        dst[2 * i] = sample;
        dst[2 * i + 1] = ((sample as i32 + next as i32) / 2) as i16;
    }
    Ok(())
}

/// Halve the sample rate by averaging adjacent pairs.
///
/// # Arguments
///
/// * `src` - Input samples, exactly twice as long as `dst`
/// * `dst` - Output buffer at the lower rate
///
/// # Returns
///
/// `Ok(())`, or [`CodecError::InvalidFrameSize`] on a length mismatch
pub fn downsample_2x(src: &[i16], dst: &mut [i16]) -> Result<()> {
    downsample_by(src, dst, 2)
}

/// Divide the sample rate by three (24 kHz → 8 kHz) by averaging triples.
///
/// Each output is the truncated mean of three consecutive inputs.
///
/// # Arguments
///
/// * `src` - Input samples, exactly three times as long as `dst`
/// * `dst` - Output buffer at the lower rate
///
/// # Returns
///
/// `Ok(())`, or [`CodecError::InvalidFrameSize`] on a length mismatch
pub fn downsample_3x(src: &[i16], dst: &mut [i16]) -> Result<()> {
    downsample_by(src, dst, 3)
}

fn downsample_by(src: &[i16], dst: &mut [i16], factor: usize) -> Result<()> {
    if src.len() != dst.len() * factor {
        return Err(CodecError::invalid_frame_size(dst.len() * factor, src.len()));
    }

    for (out, chunk) in dst.iter_mut().zip(src.chunks_exact(factor)) {
        let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
        *out = (sum / factor as i32) as i16;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsample_ramp() {
        let src = [0i16, 10, 20, 30];
        let mut dst = [0i16; 8];
        upsample_2x(&src, &mut dst).unwrap();
        assert_eq!(dst, [0, 5, 10, 15, 20, 25, 30, 30]);
    }

    #[test]
    fn test_upsample_truncates_toward_zero() {
        let src = [-3i16, 0];
        let mut dst = [0i16; 4];
        upsample_2x(&src, &mut dst).unwrap();
        assert_eq!(dst, [-3, -1, 0, 0]);
    }

    #[test]
    fn test_downsample_3x_ramp() {
        let src: Vec<i16> = (0..9).collect();
        let mut dst = [0i16; 3];
        downsample_3x(&src, &mut dst).unwrap();
        assert_eq!(dst, [1, 4, 7]);
    }

    #[test]
    fn test_downsample_2x_ramp() {
        let src = [1i16, 2, 3, 4, -5, -6];
        let mut dst = [0i16; 3];
        downsample_2x(&src, &mut dst).unwrap();
        assert_eq!(dst, [1, 3, -5]);
    }

    #[test]
    fn test_extremes_do_not_overflow() {
        let src = [i16::MAX; 3];
        let mut dst = [0i16; 1];
        downsample_3x(&src, &mut dst).unwrap();
        assert_eq!(dst[0], i16::MAX);

        let mut up = [0i16; 6];
        upsample_2x(&[i16::MIN, i16::MIN, i16::MAX], &mut up).unwrap();
        assert_eq!(up, [i16::MIN, i16::MIN, i16::MIN, 0, i16::MAX, i16::MAX]);
    }

    #[test]
    fn test_ratio_mismatch_leaves_destination_untouched() {
        let mut dst = [7i16; 5];
        assert_eq!(
            downsample_3x(&[0i16; 16], &mut dst),
            Err(CodecError::InvalidFrameSize { expected: 15, actual: 16 })
        );
        assert_eq!(dst, [7; 5]);

        let mut wide = [7i16; 7];
        assert!(upsample_2x(&[0i16; 4], &mut wide).is_err());
        assert_eq!(wide, [7; 7]);

        let mut half = [0i16; 2];
        assert!(downsample_2x(&[0i16; 5], &mut half).is_err());
    }

    #[test]
    fn test_empty_input() {
        let mut dst: [i16; 0] = [];
        assert!(upsample_2x(&[], &mut dst).is_ok());
        assert!(downsample_3x(&[], &mut dst).is_ok());
    }
}
