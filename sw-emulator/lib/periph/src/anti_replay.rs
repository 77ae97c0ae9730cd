/*++

Licensed under the Apache-2.0 license.

File Name:

    anti_replay.rs

Abstract:

    File contains the anti-replay decision logic: the bounded nonce cache and
    the counter/nonce validator.

--*/

use tock_registers::register_bitfields;
use tock_registers::LocalRegisterCopy;

register_bitfields! [
    u32,

    /// Replay Status Register Fields
    pub ReplayStatus [
        VALID OFFSET(0) NUMBITS(1) [],
        REPLAY OFFSET(1) NUMBITS(1) [],
        BAD_COUNTER OFFSET(2) NUMBITS(1) [],
        BAD_NONCE OFFSET(3) NUMBITS(1) [],
        READY OFFSET(4) NUMBITS(1) [],
    ],
];

/// Number of nonces remembered by the cache
pub const NONCE_CACHE_CAPACITY: usize = 16;

/// Mask of the decision bits within the status register
pub const VERDICT_MASK: u32 = 0b1111;

/// Fixed-capacity ring of recently accepted nonces. When full, the oldest
/// entry is overwritten.
pub struct NonceCache {
    entries: [u32; NONCE_CACHE_CAPACITY],
    head: usize,
    len: usize,
}

impl Default for NonceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceCache {
    pub fn new() -> Self {
        Self {
            entries: [0; NONCE_CACHE_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, nonce: u32) -> bool {
        self.iter().any(|n| n == nonce)
    }

    pub fn push(&mut self, nonce: u32) {
        let slot = (self.head + self.len) % NONCE_CACHE_CAPACITY;
        self.entries[slot] = nonce;
        if self.len == NONCE_CACHE_CAPACITY {
            self.head = (self.head + 1) % NONCE_CACHE_CAPACITY;
        } else {
            self.len += 1;
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len).map(move |i| self.entries[(self.head + i) % NONCE_CACHE_CAPACITY])
    }
}

/// Counter/nonce validator
pub struct AntiReplayEngine {
    last_counter: u32,
    cache: NonceCache,
    verdict: LocalRegisterCopy<u32, ReplayStatus::Register>,
}

impl Default for AntiReplayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AntiReplayEngine {
    pub fn new() -> Self {
        Self {
            last_counter: 0,
            cache: NonceCache::new(),
            verdict: LocalRegisterCopy::new(0),
        }
    }

    pub fn last_counter(&self) -> u32 {
        self.last_counter
    }

    pub fn cache(&self) -> &NonceCache {
        &self.cache
    }

    /// Decision bits of the most recent validation
    pub fn verdict(&self) -> LocalRegisterCopy<u32, ReplayStatus::Register> {
        self.verdict
    }

    /// Judge a (counter, nonce) pair. An accepted pair advances
    /// `last_counter` and enters the cache in the same step; a rejected pair
    /// changes nothing but the verdict.
    pub fn validate(
        &mut self,
        counter: u32,
        nonce: u32,
    ) -> LocalRegisterCopy<u32, ReplayStatus::Register> {
        let counter_ok = counter > self.last_counter;
        let nonce_ok = !self.cache.contains(nonce);

        let mut verdict = LocalRegisterCopy::new(0);
        if counter_ok && nonce_ok {
            self.last_counter = counter;
            self.cache.push(nonce);
            verdict.modify(ReplayStatus::VALID::SET);
        } else {
            verdict.modify(ReplayStatus::REPLAY::SET);
            if !counter_ok {
                verdict.modify(ReplayStatus::BAD_COUNTER::SET);
            }
            if !nonce_ok {
                verdict.modify(ReplayStatus::BAD_NONCE::SET);
            }
            log::warn!(
                "replay: rejected counter={:#x} nonce={:#010x} verdict={:#x}",
                counter,
                nonce,
                verdict.get()
            );
        }
        self.verdict = verdict;
        verdict
    }

    pub fn reset_cache(&mut self) {
        self.cache.clear();
    }

    /// Clear `last_counter` and the verdict
    pub fn reset_state(&mut self) {
        self.last_counter = 0;
        self.verdict.set(0);
    }
}
