/*++

Licensed under the Apache-2.0 license.

File Name:

    lanes.rs

Abstract:

    File contains the byte-enable strobe helper used to translate between
    strobed word writes and sized accesses.

--*/

use crate::{RvAddr, RvData, RvSize};

/// Byte-enable strobe of a 32-bit bus word. Bit `n` enables byte lane `n`
/// (bits `8n..8n+8` of the data word).
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct ByteLanes(u8);

impl ByteLanes {
    /// All four lanes enabled
    pub const WORD: ByteLanes = ByteLanes(0b1111);

    /// Create a strobe from a raw mask. Bits above lane 3 are dropped.
    pub const fn from_mask(mask: u8) -> Self {
        Self(mask & 0b1111)
    }

    /// Raw strobe mask
    pub const fn mask(self) -> u8 {
        self.0
    }

    /// Split a strobed word write at `word_addr` into the single sized access
    /// that performs it.
    ///
    /// `val` is the full bus word with each byte in its own lane. Returns
    /// `(size, addr, data)` with `data` shifted down to bit 0, or `None` if
    /// the strobe is not one contiguous naturally aligned group.
    pub fn to_access(self, word_addr: RvAddr, val: RvData) -> Option<(RvSize, RvAddr, RvData)> {
        let word_addr = word_addr & !0x3;
        match self.0 {
            0b1111 => Some((RvSize::Word, word_addr, val)),
            0b0011 => Some((RvSize::HalfWord, word_addr, val & 0xffff)),
            0b1100 => Some((RvSize::HalfWord, word_addr + 2, val >> 16)),
            0b0001 | 0b0010 | 0b0100 | 0b1000 => {
                let lane = self.0.trailing_zeros();
                Some((RvSize::Byte, word_addr + lane, (val >> (lane * 8)) & 0xff))
            }
            _ => None,
        }
    }
}
