//! Tone played to the caller as soon as media starts

use codec_core::{g711, NARROWBAND_SAMPLE_RATE, SAMPLES_PER_FRAME};
use std::f64::consts::PI;

const TONE_FREQUENCY_HZ: f64 = 440.0;
const TONE_AMPLITUDE: f64 = 4500.0;
const TONE_DURATION_MS: usize = 500;

/// Half a second of a 440 Hz sine as PCMU frames (25 frames).
pub fn connected_tone() -> Vec<Vec<u8>> {
    let rate = NARROWBAND_SAMPLE_RATE as usize;
    let total = rate * TONE_DURATION_MS / 1000;

    (0..total / SAMPLES_PER_FRAME)
        .map(|frame| {
            (0..SAMPLES_PER_FRAME)
                .map(|i| {
                    let t = (frame * SAMPLES_PER_FRAME + i) as f64 / rate as f64;
                    let sample = ((2.0 * PI * TONE_FREQUENCY_HZ * t).sin() * TONE_AMPLITUDE) as i16;
                    g711::encode(sample)
                })
                .collect()
        })
        .collect()
}
