/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256.rs

Abstract:

    File contains the cycle-stepped SHA-256 compression engine. One call to
    `step` performs one round; the feed-forward into the accumulator takes
    one extra step.

--*/

/// SHA-256 compression engine state
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Sha256State {
    /// Ready to accept a block
    Idle,

    /// Running round `round` (0..64) on the latched block
    Processing { round: u8 },

    /// Adding the working variables back into the accumulator
    Finalizing,
}

/// SHA-256 compression engine
pub struct Sha256Engine {
    /// Hash accumulator
    hash: [u32; 8],

    /// Working variables a..h
    work: [u32; 8],

    /// Message schedule of the latched block
    schedule: [u32; 64],

    state: Sha256State,
}

impl Default for Sha256Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha256Engine {
    /// SHA-256 Block Size
    pub const BLOCK_SIZE: usize = 64;

    /// SHA-256 Hash Size
    pub const HASH_SIZE: usize = 32;

    /// Steps needed to compress one block
    pub const STEPS_PER_BLOCK: u32 = 65;

    /// SHA-256 Initial Hash Vectors
    #[rustfmt::skip]
    const HASH_IV: [u32; 8] = [
        0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
        0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
    ];

    #[rustfmt::skip]
    const K: [u32; 64] = [
        0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
        0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
        0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
        0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
        0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
        0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
        0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
        0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
    ];

    /// Create a new engine with the accumulator at the initial hash value
    pub fn new() -> Self {
        Self {
            hash: Self::HASH_IV,
            work: [0; 8],
            schedule: [0; 64],
            state: Sha256State::Idle,
        }
    }

    /// Reset the accumulator to the initial hash value and abandon any
    /// block in flight.
    pub fn init(&mut self) {
        self.hash = Self::HASH_IV;
        self.state = Sha256State::Idle;
    }

    pub fn state(&self) -> Sha256State {
        self.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == Sha256State::Idle
    }

    /// Latch `block` and begin compressing it.
    ///
    /// Returns `false` and ignores the block if the engine is not ready.
    pub fn start_block(&mut self, block: &[u8; Self::BLOCK_SIZE]) -> bool {
        if !self.is_ready() {
            return false;
        }
        for (w, chunk) in self.schedule.iter_mut().zip(block.chunks_exact(4)) {
            *w = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        for i in 16..64 {
            self.schedule[i] = small_sigma1(self.schedule[i - 2])
                .wrapping_add(self.schedule[i - 7])
                .wrapping_add(small_sigma0(self.schedule[i - 15]))
                .wrapping_add(self.schedule[i - 16]);
        }
        self.work = self.hash;
        self.state = Sha256State::Processing { round: 0 };
        true
    }

    /// Advance the engine by one clock.
    pub fn step(&mut self) {
        match self.state {
            Sha256State::Idle => {}
            Sha256State::Processing { round } => {
                self.round(usize::from(round));
                self.state = if round == 63 {
                    Sha256State::Finalizing
                } else {
                    Sha256State::Processing { round: round + 1 }
                };
            }
            Sha256State::Finalizing => {
                for (h, w) in self.hash.iter_mut().zip(self.work) {
                    *h = h.wrapping_add(w);
                }
                self.state = Sha256State::Idle;
            }
        }
    }

    /// Compress one block, running the engine until it is ready again.
    pub fn process_block(&mut self, block: &[u8; Self::BLOCK_SIZE]) {
        while !self.is_ready() {
            self.step();
        }
        self.start_block(block);
        while !self.is_ready() {
            self.step();
        }
    }

    /// Accumulator as big-endian bytes
    pub fn digest(&self) -> [u8; Self::HASH_SIZE] {
        let mut out = [0u8; Self::HASH_SIZE];
        for (dest, word) in out.chunks_exact_mut(4).zip(self.hash) {
            dest.copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    fn round(&mut self, i: usize) {
        let [a, b, c, d, e, f, g, h] = self.work;
        let t1 = h
            .wrapping_add(big_sigma1(e))
            .wrapping_add(ch(e, f, g))
            .wrapping_add(Self::K[i])
            .wrapping_add(self.schedule[i]);
        let t2 = big_sigma0(a).wrapping_add(maj(a, b, c));
        self.work = [t1.wrapping_add(t2), a, b, c, d.wrapping_add(t1), e, f, g];
    }
}

#[inline]
fn ch(x: u32, y: u32, z: u32) -> u32 {
    (x & y) ^ (!x & z)
}

#[inline]
fn maj(x: u32, y: u32, z: u32) -> u32 {
    (x & y) ^ (x & z) ^ (y & z)
}

#[inline]
fn big_sigma0(x: u32) -> u32 {
    x.rotate_right(2) ^ x.rotate_right(13) ^ x.rotate_right(22)
}

#[inline]
fn big_sigma1(x: u32) -> u32 {
    x.rotate_right(6) ^ x.rotate_right(11) ^ x.rotate_right(25)
}

#[inline]
fn small_sigma0(x: u32) -> u32 {
    x.rotate_right(7) ^ x.rotate_right(18) ^ (x >> 3)
}

#[inline]
fn small_sigma1(x: u32) -> u32 {
    x.rotate_right(17) ^ x.rotate_right(19) ^ (x >> 10)
}
