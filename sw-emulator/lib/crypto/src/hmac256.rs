/*++

Licensed under the Apache-2.0 license.

File Name:

    hmac256.rs

Abstract:

    File contains the streaming HMAC-SHA256 engine. The engine pulls message
    words from a bus port one at a time and feeds the SHA-256 compression
    engine as blocks fill up.

--*/

use crate::sha256::Sha256Engine;

/// Answer of a message port to a fetch request
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Fetch {
    /// Word read from the requested address
    Data(u32),

    /// Port is busy this cycle; retry on a later cycle
    Stall,

    /// Nothing the engine may read lives at the address
    Fault,
}

/// Read side of the bus as seen by the engine
pub trait MessagePort {
    /// Fetch the word at the word-aligned address `addr`.
    fn fetch(&mut self, addr: u32) -> Fetch;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HashMode {
    /// Plain SHA-256 of the message
    Sha256,

    /// HMAC-SHA256 keyed with the request key
    HmacSha256,
}

/// Parameters of one job, latched when it starts
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HmacRequest {
    pub mode: HashMode,
    pub key: [u8; 32],
    pub msg_addr: u32,
    pub msg_len: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HmacPhase {
    Idle,
    PrepInner,
    HashInner,
    ReadMsg,
    WaitMsg,
    FinishInner,
    PrepOuter,
    HashOuter,
    FinishOuter,
    Complete,
}

/// What happened during one engine step
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HmacEvent {
    /// No job
    Idle,

    /// Job in flight
    Busy,

    /// Job finished with the digest
    Done([u8; 32]),

    /// Message fetch faulted and the job was dropped
    Faulted,
}

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;
const BLOCK_SIZE: usize = Sha256Engine::BLOCK_SIZE;

/// Streaming HMAC-SHA256 engine
pub struct HmacEngine {
    sha: Sha256Engine,
    phase: HmacPhase,
    req: Option<HmacRequest>,
    bytes_consumed: u32,
    block: [u8; BLOCK_SIZE],
    block_len: usize,
    padding: Option<Padding>,
    inner_digest: [u8; 32],
}

impl Default for HmacEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HmacEngine {
    pub fn new() -> Self {
        Self {
            sha: Sha256Engine::new(),
            phase: HmacPhase::Idle,
            req: None,
            bytes_consumed: 0,
            block: [0; BLOCK_SIZE],
            block_len: 0,
            padding: None,
            inner_digest: [0; 32],
        }
    }

    pub fn phase(&self) -> HmacPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != HmacPhase::Idle
    }

    /// Begin a job. Returns `false` and leaves the running job untouched if
    /// the engine is busy.
    pub fn start(&mut self, req: HmacRequest) -> bool {
        if self.is_busy() {
            return false;
        }
        self.reset();
        log::debug!(
            "hmac: start {:?} addr={:#010x} len={:#x}",
            req.mode,
            req.msg_addr,
            req.msg_len
        );
        self.req = Some(req);
        self.set_phase(HmacPhase::PrepInner);
        true
    }

    /// Drop any job in flight along with all partial state.
    pub fn reset(&mut self) {
        self.sha.init();
        self.phase = HmacPhase::Idle;
        self.req = None;
        self.bytes_consumed = 0;
        self.block = [0; BLOCK_SIZE];
        self.block_len = 0;
        self.padding = None;
        self.inner_digest = [0; 32];
    }

    /// Advance the engine by one clock.
    pub fn step(&mut self, port: &mut impl MessagePort) -> HmacEvent {
        self.sha.step();

        let Some(req) = self.req else {
            return HmacEvent::Idle;
        };

        match self.phase {
            HmacPhase::Idle => return HmacEvent::Idle,
            HmacPhase::PrepInner => {
                self.sha.init();
                match req.mode {
                    HashMode::HmacSha256 => {
                        self.sha.start_block(&key_block(&req.key, IPAD));
                        self.set_phase(HmacPhase::HashInner);
                    }
                    HashMode::Sha256 => self.set_phase(HmacPhase::ReadMsg),
                }
            }
            HmacPhase::HashInner => {
                if self.sha.is_ready() {
                    self.set_phase(HmacPhase::ReadMsg);
                }
            }
            HmacPhase::ReadMsg | HmacPhase::WaitMsg => {
                if self.bytes_consumed >= req.msg_len {
                    self.set_phase(HmacPhase::FinishInner);
                } else if self.sha.is_ready() {
                    let addr = req.msg_addr.wrapping_add(self.bytes_consumed);
                    match port.fetch(addr) {
                        Fetch::Data(word) => {
                            self.absorb(word, req.msg_len);
                            self.phase = HmacPhase::ReadMsg;
                        }
                        Fetch::Stall => self.phase = HmacPhase::WaitMsg,
                        Fetch::Fault => {
                            log::warn!("hmac: message fetch fault at {:#010x}", addr);
                            self.reset();
                            return HmacEvent::Faulted;
                        }
                    }
                }
            }
            HmacPhase::FinishInner => {
                if self.sha.is_ready() {
                    if self.padding.is_none() {
                        let prefix = match req.mode {
                            HashMode::HmacSha256 => BLOCK_SIZE as u64,
                            HashMode::Sha256 => 0,
                        };
                        self.padding = Some(Padding::new(
                            &self.block[..self.block_len],
                            prefix + u64::from(req.msg_len),
                        ));
                    }
                    match self.padding.as_mut().and_then(Padding::next_block) {
                        Some(block) => {
                            self.sha.start_block(&block);
                        }
                        None => {
                            self.inner_digest = self.sha.digest();
                            match req.mode {
                                HashMode::HmacSha256 => self.set_phase(HmacPhase::PrepOuter),
                                HashMode::Sha256 => self.set_phase(HmacPhase::Complete),
                            }
                        }
                    }
                }
            }
            HmacPhase::PrepOuter => {
                self.sha.init();
                self.sha.start_block(&key_block(&req.key, OPAD));
                self.set_phase(HmacPhase::HashOuter);
            }
            HmacPhase::HashOuter => {
                if self.sha.is_ready() {
                    let mut tail = Padding::new(&self.inner_digest, (BLOCK_SIZE + 32) as u64);
                    if let Some(block) = tail.next_block() {
                        self.sha.start_block(&block);
                    }
                    self.set_phase(HmacPhase::FinishOuter);
                }
            }
            HmacPhase::FinishOuter => {
                if self.sha.is_ready() {
                    self.set_phase(HmacPhase::Complete);
                }
            }
            HmacPhase::Complete => {
                let digest = match req.mode {
                    HashMode::HmacSha256 => self.sha.digest(),
                    HashMode::Sha256 => self.inner_digest,
                };
                self.reset();
                return HmacEvent::Done(digest);
            }
        }
        HmacEvent::Busy
    }

    /// Append the bytes of a fetched word (memory order) up to the end of
    /// the message, handing full blocks to the compression engine.
    fn absorb(&mut self, word: u32, msg_len: u32) {
        let remaining = (msg_len - self.bytes_consumed) as usize;
        let take = remaining.min(4);
        for b in &word.to_le_bytes()[..take] {
            self.block[self.block_len] = *b;
            self.block_len += 1;
        }
        self.bytes_consumed += take as u32;
        if self.block_len == BLOCK_SIZE {
            self.sha.start_block(&self.block);
            self.block_len = 0;
        }
    }

    fn set_phase(&mut self, phase: HmacPhase) {
        log::debug!("hmac: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

fn key_block(key: &[u8; 32], pad: u8) -> [u8; BLOCK_SIZE] {
    let mut block = [pad; BLOCK_SIZE];
    for (b, k) in block.iter_mut().zip(key) {
        *b ^= k;
    }
    block
}

/// Terminate the partial block `tail` of a message that is `total_len`
/// bytes long, returning one or two final blocks.
/// Final one or two blocks of a message: the partial tail, the `0x80`
/// marker, zero fill and the big-endian bit length.
struct Padding {
    blocks: [[u8; BLOCK_SIZE]; 2],
    count: usize,
    next: usize,
}

impl Padding {
    /// `tail` is the unprocessed remainder and must be shorter than a block.
    fn new(tail: &[u8], total_len: u64) -> Self {
        let mut blocks = [[0u8; BLOCK_SIZE]; 2];
        blocks[0][..tail.len()].copy_from_slice(tail);
        blocks[0][tail.len()] = 0x80;
        let count = if tail.len() + 9 <= BLOCK_SIZE { 1 } else { 2 };
        blocks[count - 1][BLOCK_SIZE - 8..].copy_from_slice(&(total_len * 8).to_be_bytes());
        Self {
            blocks,
            count,
            next: 0,
        }
    }

    fn next_block(&mut self) -> Option<[u8; BLOCK_SIZE]> {
        if self.next == self.count {
            return None;
        }
        self.next += 1;
        Some(self.blocks[self.next - 1])
    }
}

/// Port over a byte slice, addressed from 0
struct SlicePort<'a>(&'a [u8]);

impl MessagePort for SlicePort<'_> {
    fn fetch(&mut self, addr: u32) -> Fetch {
        let mut word = [0u8; 4];
        let start = addr as usize;
        for (i, b) in word.iter_mut().enumerate() {
            if let Some(v) = self.0.get(start + i) {
                *b = *v;
            }
        }
        Fetch::Data(u32::from_le_bytes(word))
    }
}

fn run(mode: HashMode, key: [u8; 32], msg: &[u8]) -> [u8; 32] {
    let mut engine = HmacEngine::new();
    let mut port = SlicePort(msg);
    engine.start(HmacRequest {
        mode,
        key,
        msg_addr: 0,
        msg_len: msg.len() as u32,
    });
    loop {
        if let HmacEvent::Done(digest) = engine.step(&mut port) {
            return digest;
        }
    }
}

/// SHA-256 of `msg` computed by the streaming engine
pub fn sha256(msg: &[u8]) -> [u8; 32] {
    run(HashMode::Sha256, [0; 32], msg)
}

/// HMAC-SHA256 of `msg` under the 256-bit `key`, computed by the streaming
/// engine
pub fn hmac_sha256(key: &[u8; 32], msg: &[u8]) -> [u8; 32] {
    run(HashMode::HmacSha256, *key, msg)
}
