/*++

Licensed under the Apache-2.0 license.

File Name:

    monotonic_counter.rs

Abstract:

    File contains the lockable monotonic counter of the anti-replay block.

--*/

use secsoc_emu_bus::{Bus, BusError, ReadOnlyRegister};
use secsoc_emu_types::{RvAddr, RvData, RvSize};
use tock_registers::interfaces::{ReadWriteable, Readable};
use tock_registers::register_bitfields;
use tock_registers::LocalRegisterCopy;

register_bitfields! [
    u32,

    /// Control Register Fields
    pub CounterCtrl [
        INCREMENT OFFSET(0) NUMBITS(1) [],
    ],

    /// Status Register Fields
    pub CounterStatus [
        LOCKED OFFSET(0) NUMBITS(1) [],
        OVERFLOW OFFSET(1) NUMBITS(1) [],
    ],
];

/// Value that must be written to `LOCK` to freeze the counter
pub const COUNTER_LOCK_MAGIC: u32 = 0xDEAD_10CC;

/// Result of a counter operation
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    Applied,
    Ignored,
}

/// Monotonic counter
///
/// The value only ever grows. Once locked with [`COUNTER_LOCK_MAGIC`] the
/// counter is frozen until power-on reset.
pub struct MonotonicCounter {
    value: u32,

    /// Status register (LOCKED, OVERFLOW)
    status: ReadOnlyRegister<CounterStatus::Register>,
}

impl Default for MonotonicCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicCounter {
    /// Counter value register
    const ADDR_VALUE: RvAddr = 0x00;

    /// Control register
    const ADDR_CTRL: RvAddr = 0x04;

    /// Lock register
    const ADDR_LOCK: RvAddr = 0x08;

    /// Status register
    const ADDR_STATUS: RvAddr = 0x0C;

    pub fn new() -> Self {
        Self {
            value: 0,
            status: ReadOnlyRegister::new(0),
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_locked(&self) -> bool {
        self.status.reg.is_set(CounterStatus::LOCKED)
    }

    pub fn has_overflowed(&self) -> bool {
        self.status.reg.is_set(CounterStatus::OVERFLOW)
    }

    /// Add one to the counter. At `u32::MAX` the counter saturates and
    /// records the overflow instead.
    pub fn increment(&mut self) -> Outcome {
        if self.is_locked() {
            log::warn!("counter: increment while locked ignored");
            return Outcome::Ignored;
        }
        match self.value.checked_add(1) {
            Some(next) => {
                self.value = next;
                Outcome::Applied
            }
            None => {
                log::warn!("counter: saturated at {:#010x}", self.value);
                self.status.reg.modify(CounterStatus::OVERFLOW::SET);
                Outcome::Ignored
            }
        }
    }

    /// Set the counter to `val`, which must be strictly greater than the
    /// current value.
    pub fn write_value(&mut self, val: u32) -> Outcome {
        if self.is_locked() || self.has_overflowed() || val <= self.value {
            log::warn!(
                "counter: write {:#010x} over {:#010x} ignored",
                val,
                self.value
            );
            return Outcome::Ignored;
        }
        self.value = val;
        Outcome::Applied
    }

    /// Lock the counter if `magic` matches [`COUNTER_LOCK_MAGIC`].
    pub fn lock(&mut self, magic: u32) -> Outcome {
        if magic != COUNTER_LOCK_MAGIC || self.is_locked() {
            return Outcome::Ignored;
        }
        log::debug!("counter: locked at {:#010x}", self.value);
        self.status.reg.modify(CounterStatus::LOCKED::SET);
        Outcome::Applied
    }
}

impl Bus for MonotonicCounter {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        if size != RvSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        match addr {
            Self::ADDR_VALUE => Ok(self.value),
            Self::ADDR_STATUS => Ok(self.status.reg.get()),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        match addr {
            Self::ADDR_VALUE => {
                self.write_value(val);
            }
            Self::ADDR_CTRL => {
                let ctrl = LocalRegisterCopy::<u32, CounterCtrl::Register>::new(val);
                if ctrl.is_set(CounterCtrl::INCREMENT) {
                    self.increment();
                }
            }
            Self::ADDR_LOCK => {
                self.lock(val);
            }
            _ => Err(BusError::StoreAccessFault)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFSET_VALUE: RvAddr = 0x00;
    const OFFSET_CTRL: RvAddr = 0x04;
    const OFFSET_LOCK: RvAddr = 0x08;
    const OFFSET_STATUS: RvAddr = 0x0C;

    #[test]
    fn test_increment() {
        let mut counter = MonotonicCounter::new();
        for _ in 0..5 {
            assert_eq!(
                counter.write(RvSize::Word, OFFSET_CTRL, CounterCtrl::INCREMENT::SET.value),
                Ok(())
            );
        }
        assert_eq!(counter.read(RvSize::Word, OFFSET_VALUE), Ok(5));
    }

    #[test]
    fn test_write_must_increase() {
        let mut counter = MonotonicCounter::new();
        assert_eq!(counter.write_value(10), Outcome::Applied);
        assert_eq!(counter.write_value(10), Outcome::Ignored);
        assert_eq!(counter.write_value(3), Outcome::Ignored);
        assert_eq!(counter.write(RvSize::Word, OFFSET_VALUE, 0), Ok(()));
        assert_eq!(counter.value(), 10);
        assert_eq!(counter.write_value(11), Outcome::Applied);
    }

    #[test]
    fn test_lock_is_permanent() {
        let mut counter = MonotonicCounter::new();
        counter.write_value(15);
        assert_eq!(counter.lock(0x1234_5678), Outcome::Ignored);
        assert!(!counter.is_locked());

        assert_eq!(
            counter.write(RvSize::Word, OFFSET_LOCK, COUNTER_LOCK_MAGIC),
            Ok(())
        );
        assert_eq!(counter.read(RvSize::Word, OFFSET_STATUS), Ok(1));

        assert_eq!(counter.increment(), Outcome::Ignored);
        assert_eq!(counter.write_value(100), Outcome::Ignored);
        assert_eq!(counter.lock(COUNTER_LOCK_MAGIC), Outcome::Ignored);
        assert_eq!(counter.value(), 15);
        assert!(counter.is_locked());
    }

    #[test]
    fn test_saturation() {
        let mut counter = MonotonicCounter::new();
        assert_eq!(counter.write_value(u32::MAX - 1), Outcome::Applied);
        assert_eq!(counter.increment(), Outcome::Applied);
        assert!(!counter.has_overflowed());
        assert_eq!(counter.increment(), Outcome::Ignored);
        assert_eq!(counter.value(), u32::MAX);
        assert_eq!(counter.read(RvSize::Word, OFFSET_STATUS), Ok(0b10));
    }

    #[test]
    fn test_access_faults() {
        let mut counter = MonotonicCounter::new();
        assert_eq!(
            counter.read(RvSize::Word, OFFSET_CTRL),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            counter.read(RvSize::Byte, OFFSET_VALUE),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            counter.write(RvSize::Word, OFFSET_STATUS, 0),
            Err(BusError::StoreAccessFault)
        );
    }
}
