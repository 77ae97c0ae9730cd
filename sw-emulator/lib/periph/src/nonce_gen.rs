/*++

Licensed under the Apache-2.0 license.

File Name:

    nonce_gen.rs

Abstract:

    File contains the LFSR nonce generator of the anti-replay block.

--*/

use crate::monotonic_counter::Outcome;
use secsoc_emu_bus::{Bus, BusError};
use secsoc_emu_types::{RvAddr, RvData, RvSize};
use tock_registers::register_bitfields;
use tock_registers::LocalRegisterCopy;

register_bitfields! [
    u32,

    /// Control Register Fields
    pub NonceCtrl [
        ENABLE OFFSET(0) NUMBITS(1) [],
        ADVANCE OFFSET(1) NUMBITS(1) [],
    ],

    /// Status Register Fields
    pub NonceStatus [
        READY OFFSET(0) NUMBITS(1) [],
        ENABLED OFFSET(1) NUMBITS(1) [],
    ],
];

/// Seed loaded at power-on unless overridden
pub const DEFAULT_NONCE_SEED: u32 = 0xACE1_5EED;

/// Advances performed after a (re)seed before the output is usable
pub const NONCE_WARMUP_STEPS: u8 = 32;

/// Galois toggle mask for x^32 + x^22 + x^2 + x + 1
const LFSR_TOGGLE_MASK: u32 = 0x8020_0003;

/// 32-bit maximal-period Galois LFSR
pub struct NonceGenerator {
    value: u32,
    warmup_remaining: u8,
    enabled: bool,
}

impl NonceGenerator {
    /// Nonce value register
    const ADDR_VALUE: RvAddr = 0x00;

    /// Control register
    const ADDR_CTRL: RvAddr = 0x04;

    /// Seed register
    const ADDR_SEED: RvAddr = 0x08;

    /// Status register
    const ADDR_STATUS: RvAddr = 0x0C;

    /// Create a generator seeded with `seed` (or the default seed if `seed`
    /// is zero) with auto-advance enabled.
    pub fn new(seed: u32) -> Self {
        let value = if seed == 0 { DEFAULT_NONCE_SEED } else { seed };
        Self {
            value,
            warmup_remaining: NONCE_WARMUP_STEPS,
            enabled: true,
        }
    }

    /// Current output without advancing.
    ///
    /// The value is not sound before [`NonceGenerator::is_ready`].
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_ready(&self) -> bool {
        self.warmup_remaining == 0
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Single step requested by firmware. Ignored while warming up.
    pub fn advance(&mut self) -> Outcome {
        if !self.is_ready() {
            log::warn!("nonce: advance during warm-up ignored");
            return Outcome::Ignored;
        }
        self.step();
        Outcome::Applied
    }

    /// Load a new seed and restart the warm-up. A zero seed would lock the
    /// LFSR and is ignored.
    pub fn seed(&mut self, seed: u32) -> Outcome {
        if seed == 0 {
            log::warn!("nonce: zero seed ignored");
            return Outcome::Ignored;
        }
        self.value = seed;
        self.warmup_remaining = NONCE_WARMUP_STEPS;
        Outcome::Applied
    }

    /// Called once per clock.
    pub fn tick(&mut self) {
        if self.warmup_remaining > 0 {
            self.step();
            self.warmup_remaining -= 1;
        } else if self.enabled {
            self.step();
        }
    }

    fn step(&mut self) {
        let lsb = self.value & 1;
        self.value >>= 1;
        if lsb != 0 {
            self.value ^= LFSR_TOGGLE_MASK;
        }
    }

    fn status(&self) -> LocalRegisterCopy<u32, NonceStatus::Register> {
        let mut status = LocalRegisterCopy::new(0);
        if self.is_ready() {
            status.modify(NonceStatus::READY::SET);
        }
        if self.enabled {
            status.modify(NonceStatus::ENABLED::SET);
        }
        status
    }
}

impl Default for NonceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_NONCE_SEED)
    }
}

impl Bus for NonceGenerator {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        if size != RvSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        match addr {
            Self::ADDR_VALUE => Ok(self.value),
            Self::ADDR_CTRL => Ok(if self.enabled {
                NonceCtrl::ENABLE::SET.value
            } else {
                0
            }),
            Self::ADDR_STATUS => Ok(self.status().get()),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        match addr {
            Self::ADDR_CTRL => {
                let ctrl = LocalRegisterCopy::<u32, NonceCtrl::Register>::new(val);
                self.set_enabled(ctrl.is_set(NonceCtrl::ENABLE));
                if ctrl.is_set(NonceCtrl::ADVANCE) {
                    self.advance();
                }
            }
            Self::ADDR_SEED => {
                self.seed(val);
            }
            _ => Err(BusError::StoreAccessFault)?,
        }
        Ok(())
    }

    fn poll(&mut self) {
        self.tick();
    }
}
