/*++

Licensed under the Apache-2.0 license.

File Name:

    crypto_accel.rs

Abstract:

    File contains the register front end of the SHA-256/HMAC-SHA256
    accelerator.

--*/

use crate::arbiter::BusArbiter;
use secsoc_emu_bus::{
    Bus, BusError, ReadOnlyRegister, ReadWriteRegister, Register, WriteOnlyRegister,
};
use secsoc_emu_crypto::{HashMode, HmacEngine, HmacEvent, HmacRequest};
use secsoc_emu_types::{RvAddr, RvData, RvSize};
use std::cell::RefCell;
use std::rc::Rc;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;
use tock_registers::LocalRegisterCopy;

register_bitfields! [
    u32,

    /// Control Register Fields
    pub CryptoCtrl [
        START OFFSET(0) NUMBITS(1) [],
        RESET OFFSET(1) NUMBITS(1) [],
    ],

    /// Status Register Fields
    pub CryptoStatus [
        BUSY OFFSET(0) NUMBITS(1) [],
        DONE OFFSET(1) NUMBITS(1) [],
        ERROR OFFSET(2) NUMBITS(1) [],
    ],
];

/// `MODE` register value selecting plain SHA-256
pub const MODE_SHA256: u32 = 0;

/// `MODE` register value selecting HMAC-SHA256
pub const MODE_HMAC_SHA256: u32 = 1;

const KEY_WORDS: usize = 8;
const HASH_WORDS: usize = 8;

/// SHA-256 / HMAC-SHA256 accelerator
pub struct CryptoAccelerator {
    /// Status register
    status: ReadOnlyRegister<CryptoStatus::Register>,

    /// Hash mode register
    mode: ReadWriteRegister,

    /// Message base address register
    msg_addr: ReadWriteRegister,

    /// Message length register
    msg_len: ReadWriteRegister,

    /// Key registers
    key: [WriteOnlyRegister; KEY_WORDS],

    /// Digest registers
    hash: [ReadOnlyRegister; HASH_WORDS],

    engine: HmacEngine,

    arbiter: Rc<RefCell<BusArbiter>>,
}

impl CryptoAccelerator {
    /// Control register
    const ADDR_CTRL: RvAddr = 0x00;

    /// Status register
    const ADDR_STATUS: RvAddr = 0x04;

    /// Mode register
    const ADDR_MODE: RvAddr = 0x08;

    /// Message address register
    const ADDR_MSG_ADDR: RvAddr = 0x0C;

    /// Message length register
    const ADDR_MSG_LEN: RvAddr = 0x10;

    /// Key register range
    const ADDR_KEY_START: RvAddr = 0x14;
    const ADDR_KEY_END: RvAddr = 0x30;

    /// Hash register range
    const ADDR_HASH_START: RvAddr = 0x40;
    const ADDR_HASH_END: RvAddr = 0x5C;

    /// Create the accelerator. Message words are read through `arbiter`.
    pub fn new(arbiter: Rc<RefCell<BusArbiter>>) -> Self {
        Self {
            status: ReadOnlyRegister::new(0),
            mode: ReadWriteRegister::new(MODE_SHA256),
            msg_addr: ReadWriteRegister::new(0),
            msg_len: ReadWriteRegister::new(0),
            key: std::array::from_fn(|_| WriteOnlyRegister::new(0)),
            hash: std::array::from_fn(|_| ReadOnlyRegister::new(0)),
            engine: HmacEngine::new(),
            arbiter,
        }
    }

    /// Memory map size.
    pub fn mmap_size(&self) -> RvAddr {
        0x100
    }

    pub fn is_busy(&self) -> bool {
        self.status.reg.is_set(CryptoStatus::BUSY)
    }

    pub fn engine(&self) -> &HmacEngine {
        &self.engine
    }

    /// Digest as it appears in `HASH[]`, in big-endian byte order
    pub fn digest(&self) -> [u8; 32] {
        let mut digest = [0u8; 32];
        for (chunk, reg) in digest.chunks_exact_mut(4).zip(self.hash.iter()) {
            chunk.copy_from_slice(&reg.reg.get().to_be_bytes());
        }
        digest
    }

    /// On Write callback for the `control` register
    ///
    /// Reset takes priority over start when both bits are written.
    fn on_write_control(&mut self, val: RvData) {
        let ctrl = LocalRegisterCopy::<u32, CryptoCtrl::Register>::new(val);
        if ctrl.is_set(CryptoCtrl::RESET) {
            self.reset();
        } else if ctrl.is_set(CryptoCtrl::START) {
            self.start();
        }
    }

    fn reset(&mut self) {
        if self.is_busy() {
            log::debug!("crypto: job aborted by reset");
        }
        self.engine.reset();
        self.status.reg.set(0);
        self.clear_hash();
    }

    fn start(&mut self) {
        if self.is_busy() {
            log::warn!("crypto: start while busy ignored");
            return;
        }

        self.status.reg.set(0);
        self.clear_hash();

        let mode = match self.mode.reg.get() {
            MODE_SHA256 => HashMode::Sha256,
            MODE_HMAC_SHA256 => HashMode::HmacSha256,
            other => {
                log::warn!("crypto: unsupported mode {:#x}", other);
                self.status.reg.modify(CryptoStatus::ERROR::SET);
                return;
            }
        };

        let msg_addr = self.msg_addr.reg.get();
        if msg_addr % 4 != 0 {
            log::warn!("crypto: message address {:#010x} not word aligned", msg_addr);
            self.status.reg.modify(CryptoStatus::ERROR::SET);
            return;
        }

        let req = HmacRequest {
            mode,
            key: self.key_bytes(),
            msg_addr,
            msg_len: self.msg_len.reg.get(),
        };
        log::debug!(
            "crypto: start {:?} addr={:#010x} len={:#x}",
            req.mode,
            req.msg_addr,
            req.msg_len
        );
        if self.engine.start(req) {
            self.status.reg.modify(CryptoStatus::BUSY::SET);
        }
    }

    fn key_bytes(&self) -> [u8; 32] {
        let mut key = [0u8; 32];
        for (chunk, reg) in key.chunks_exact_mut(4).zip(self.key.iter()) {
            chunk.copy_from_slice(&reg.reg.get().to_be_bytes());
        }
        key
    }

    fn clear_hash(&mut self) {
        for reg in self.hash.iter() {
            reg.reg.set(0);
        }
    }

    fn complete(&mut self, digest: &[u8; 32]) {
        for (reg, chunk) in self.hash.iter().zip(digest.chunks_exact(4)) {
            reg.reg
                .set(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        self.status.reg.set(CryptoStatus::DONE::SET.value);
    }
}

impl Bus for CryptoAccelerator {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        if size != RvSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        match addr {
            Self::ADDR_CTRL => Ok(0),
            Self::ADDR_STATUS => self.status.read(size),
            Self::ADDR_MODE => self.mode.read(size),
            Self::ADDR_MSG_ADDR => self.msg_addr.read(size),
            Self::ADDR_MSG_LEN => self.msg_len.read(size),
            Self::ADDR_KEY_START..=Self::ADDR_KEY_END if addr % 4 == 0 => {
                self.key[((addr - Self::ADDR_KEY_START) / 4) as usize].read(size)
            }
            Self::ADDR_HASH_START..=Self::ADDR_HASH_END if addr % 4 == 0 => {
                self.hash[((addr - Self::ADDR_HASH_START) / 4) as usize].read(size)
            }
            _ => Err(BusError::LoadAccessFault),
        }
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        match addr {
            Self::ADDR_CTRL => self.on_write_control(val),
            Self::ADDR_STATUS => self.status.write(size, val)?,
            Self::ADDR_MODE => self.mode.write(size, val)?,
            Self::ADDR_MSG_ADDR => self.msg_addr.write(size, val)?,
            Self::ADDR_MSG_LEN => self.msg_len.write(size, val)?,
            Self::ADDR_KEY_START..=Self::ADDR_KEY_END if addr % 4 == 0 => {
                self.key[((addr - Self::ADDR_KEY_START) / 4) as usize].write(size, val)?
            }
            Self::ADDR_HASH_START..=Self::ADDR_HASH_END if addr % 4 == 0 => {
                self.hash[((addr - Self::ADDR_HASH_START) / 4) as usize].write(size, val)?
            }
            _ => Err(BusError::StoreAccessFault)?,
        }
        Ok(())
    }

    /// Advance the engine by one clock
    fn poll(&mut self) {
        if !self.is_busy() {
            return;
        }
        let event = self.engine.step(&mut *self.arbiter.borrow_mut());
        match event {
            HmacEvent::Done(digest) => {
                log::debug!("crypto: done {}", HexDigest(&digest));
                self.complete(&digest);
            }
            HmacEvent::Faulted => {
                log::warn!("crypto: message fetch faulted");
                self.status.reg.set(CryptoStatus::ERROR::SET.value);
            }
            HmacEvent::Busy | HmacEvent::Idle => {}
        }
    }
}

struct HexDigest<'a>(&'a [u8; 32]);

impl std::fmt::Display for HexDigest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::MemPort;
    use hmac::{Hmac, Mac};
    use secsoc_emu_bus::{Clock, Ram, Rom};
    use sha2::{Digest, Sha256};

    const OFFSET_CTRL: RvAddr = 0x00;
    const OFFSET_STATUS: RvAddr = 0x04;
    const OFFSET_MODE: RvAddr = 0x08;
    const OFFSET_MSG_ADDR: RvAddr = 0x0C;
    const OFFSET_MSG_LEN: RvAddr = 0x10;
    const OFFSET_KEY: RvAddr = 0x14;
    const OFFSET_HASH: RvAddr = 0x40;

    const BUSY: u32 = 0b001;
    const DONE: u32 = 0b010;
    const ERROR: u32 = 0b100;

    const START: u32 = 0b01;
    const RESET: u32 = 0b10;

    struct Fixture {
        clock: Clock,
        arbiter: Rc<RefCell<BusArbiter>>,
        crypto: CryptoAccelerator,
    }

    impl Fixture {
        fn new(data: &[u8]) -> Self {
            let mut ram = vec![0u8; MemPort::DATA_RAM_SIZE];
            ram[..data.len()].copy_from_slice(data);
            let arbiter = Rc::new(RefCell::new(BusArbiter::new(
                Rom::new(vec![0; MemPort::BOOT_ROM_SIZE]),
                Ram::new(vec![0; MemPort::FIRMWARE_SIZE]),
                Ram::new(ram),
            )));
            Self {
                clock: Clock::new(),
                crypto: CryptoAccelerator::new(arbiter.clone()),
                arbiter,
            }
        }

        fn tick(&mut self) {
            self.clock.increment(1);
            self.arbiter.borrow_mut().begin_cycle();
            self.crypto.poll();
        }

        fn program(&mut self, mode: u32, key: &[u8; 32], addr: u32, len: u32) {
            for (i, chunk) in key.chunks_exact(4).enumerate() {
                let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                self.crypto
                    .write(RvSize::Word, OFFSET_KEY + 4 * i as RvAddr, word)
                    .unwrap();
            }
            self.crypto.write(RvSize::Word, OFFSET_MODE, mode).unwrap();
            self.crypto.write(RvSize::Word, OFFSET_MSG_ADDR, addr).unwrap();
            self.crypto.write(RvSize::Word, OFFSET_MSG_LEN, len).unwrap();
        }

        fn status(&mut self) -> u32 {
            self.crypto.read(RvSize::Word, OFFSET_STATUS).unwrap()
        }

        fn run(&mut self) -> u32 {
            for _ in 0..100_000 {
                let status = self.status();
                if status & BUSY == 0 {
                    return status;
                }
                self.tick();
            }
            panic!("accelerator never finished");
        }

        fn hash_regs(&mut self) -> [u8; 32] {
            let mut digest = [0u8; 32];
            for i in 0..HASH_WORDS {
                let word = self
                    .crypto
                    .read(RvSize::Word, OFFSET_HASH + 4 * i as RvAddr)
                    .unwrap();
                digest[4 * i..4 * i + 4].copy_from_slice(&word.to_be_bytes());
            }
            digest
        }
    }

    fn reference_hmac(key: &[u8; 32], msg: &[u8]) -> [u8; 32] {
        let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
        mac.update(msg);
        mac.finalize().into_bytes().into()
    }

    #[test]
    fn test_power_on_registers() {
        let mut fx = Fixture::new(&[]);
        assert_eq!(fx.crypto.read(RvSize::Word, OFFSET_CTRL), Ok(0));
        assert_eq!(fx.status(), 0);
        assert_eq!(fx.crypto.read(RvSize::Word, OFFSET_MODE), Ok(MODE_SHA256));
        assert_eq!(fx.hash_regs(), [0; 32]);
    }

    #[test]
    fn test_register_access_rules() {
        let mut fx = Fixture::new(&[]);
        assert_eq!(
            fx.crypto.read(RvSize::Word, OFFSET_KEY),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            fx.crypto.write(RvSize::Word, OFFSET_STATUS, 0xFF),
            Err(BusError::StoreAccessFault)
        );
        assert_eq!(
            fx.crypto.write(RvSize::Word, OFFSET_HASH + 8, 0xFF),
            Err(BusError::StoreAccessFault)
        );
        assert_eq!(
            fx.crypto.write(RvSize::Byte, OFFSET_MODE, 1),
            Err(BusError::StoreAccessFault)
        );
        assert_eq!(
            fx.crypto.read(RvSize::HalfWord, OFFSET_STATUS),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            fx.crypto.read(RvSize::Word, 0x60),
            Err(BusError::LoadAccessFault)
        );
    }

    #[test]
    fn test_hmac_over_data_ram() {
        let msg = b"Sample message for keylen=blocklen";
        let key = [0x0bu8; 32];
        let mut fx = Fixture::new(msg);
        fx.program(MODE_HMAC_SHA256, &key, 0x1000_0000, msg.len() as u32);
        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        assert_eq!(fx.status(), BUSY);
        assert_eq!(fx.crypto.read(RvSize::Word, OFFSET_CTRL), Ok(0));

        assert_eq!(fx.run(), DONE);
        assert_eq!(fx.hash_regs(), reference_hmac(&key, msg));
        assert_eq!(fx.crypto.digest(), reference_hmac(&key, msg));
    }

    #[test]
    fn test_sha256_mode() {
        let msg: Vec<u8> = (0..200u32).map(|i| i as u8).collect();
        let mut fx = Fixture::new(&msg);
        fx.program(MODE_SHA256, &[0; 32], 0x1000_0000, msg.len() as u32);
        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        assert_eq!(fx.run(), DONE);
        let expected: [u8; 32] = Sha256::digest(&msg).into();
        assert_eq!(fx.hash_regs(), expected);
    }

    #[test]
    fn test_reset_mid_job() {
        let msg = [0xA5u8; 512];
        let mut fx = Fixture::new(&msg);
        fx.program(MODE_HMAC_SHA256, &[1; 32], 0x1000_0000, msg.len() as u32);
        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        for _ in 0..150 {
            fx.tick();
        }
        assert_eq!(fx.status(), BUSY);

        fx.crypto.write(RvSize::Word, OFFSET_CTRL, RESET).unwrap();
        assert_eq!(fx.status(), 0);
        for _ in 0..2000 {
            fx.tick();
        }
        assert_eq!(fx.status(), 0);
        assert_eq!(fx.hash_regs(), [0; 32]);
        assert!(!fx.crypto.engine().is_busy());
    }

    #[test]
    fn test_reset_wins_over_start() {
        let mut fx = Fixture::new(&[1, 2, 3, 4]);
        fx.program(MODE_SHA256, &[0; 32], 0x1000_0000, 4);
        fx.crypto
            .write(RvSize::Word, OFFSET_CTRL, START | RESET)
            .unwrap();
        assert_eq!(fx.status(), 0);
        assert!(!fx.crypto.engine().is_busy());
    }

    #[test]
    fn test_start_while_busy_keeps_running_job() {
        let msg = b"what do ya want for nothing?";
        let mut key = [0u8; 32];
        key[..4].copy_from_slice(b"Jefe");
        let mut fx = Fixture::new(msg);
        fx.program(MODE_HMAC_SHA256, &key, 0x1000_0000, msg.len() as u32);
        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        for _ in 0..10 {
            fx.tick();
        }

        // Reprogramming mid-job does not affect the latched parameters
        fx.program(MODE_SHA256, &[0xFF; 32], 0x1000_0100, 3);
        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        assert_eq!(fx.status(), BUSY);

        assert_eq!(fx.run(), DONE);
        assert_eq!(fx.hash_regs(), reference_hmac(&key, msg));
    }

    #[test]
    fn test_new_start_clears_previous_result() {
        let mut fx = Fixture::new(b"abc");
        fx.program(MODE_SHA256, &[0; 32], 0x1000_0000, 3);
        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        assert_eq!(fx.run(), DONE);
        assert_ne!(fx.hash_regs(), [0; 32]);

        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        assert_eq!(fx.status(), BUSY);
        assert_eq!(fx.hash_regs(), [0; 32]);
        assert_eq!(fx.run(), DONE);
        assert_eq!(
            hex::encode(fx.hash_regs()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_error_conditions() {
        let mut fx = Fixture::new(&[]);
        fx.program(7, &[0; 32], 0x1000_0000, 4);
        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        assert_eq!(fx.status(), ERROR);

        fx.program(MODE_SHA256, &[0; 32], 0x1000_0002, 4);
        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        assert_eq!(fx.status(), ERROR);

        // Key store is not a message memory
        fx.program(MODE_SHA256, &[0; 32], 0x4000_0000, 16);
        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        assert_eq!(fx.status(), BUSY);
        assert_eq!(fx.run(), ERROR);
        assert_eq!(fx.hash_regs(), [0; 32]);

        fx.crypto.write(RvSize::Word, OFFSET_CTRL, RESET).unwrap();
        assert_eq!(fx.status(), 0);
    }

    #[test]
    fn test_message_overrunning_memory_faults() {
        let mut fx = Fixture::new(&[]);
        fx.program(MODE_SHA256, &[0; 32], 0x1000_FFF0, 64);
        fx.crypto.write(RvSize::Word, OFFSET_CTRL, START).unwrap();
        assert_eq!(fx.run(), ERROR);
    }
}
