//! G.711 μ-law lookup table
//!
//! Decoding goes through a 256-entry table (512 bytes) built on first use.
//! Encoding stays algorithmic; it is a handful of integer operations and
//! avoids a 64KB table on the transmit path.

use super::reference::ulaw_expand;
use std::sync::LazyLock;

/// Pre-computed μ-law decoding table (8-bit μ-law → 16-bit linear)
static MULAW_DECODE_TABLE: LazyLock<[i16; 256]> = LazyLock::new(|| {
    let mut table = [0i16; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = ulaw_expand(code as u8);
    }
    table
});

/// Table-driven μ-law expansion
#[inline]
pub fn decode_ulaw(code: u8) -> i16 {
    MULAW_DECODE_TABLE[code as usize]
}
