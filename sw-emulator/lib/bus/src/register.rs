/*++

Licensed under the Apache-2.0 license.

File Name:

    register.rs

Abstract:

    File contains the word-wide register types used by the peripherals. All
    peripheral registers on this SoC are 32 bits and word-access only.

--*/

use crate::BusError;
use secsoc_emu_types::{RvData, RvSize};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::InMemoryRegister;
use tock_registers::RegisterLongName;

pub trait Register {
    /// Read the register with an access of `size`.
    ///
    /// # Error
    ///
    /// * `BusError::LoadAccessFault` - Access is not a word or the register is write-only
    fn read(&self, size: RvSize) -> Result<RvData, BusError>;

    /// Write the register with an access of `size`.
    ///
    /// # Error
    ///
    /// * `BusError::StoreAccessFault` - Access is not a word or the register is read-only
    fn write(&mut self, size: RvSize, val: RvData) -> Result<(), BusError>;
}

/// Read Write Register
pub struct ReadWriteRegister<R: RegisterLongName = ()> {
    pub reg: InMemoryRegister<u32, R>,
}

impl<R: RegisterLongName> ReadWriteRegister<R> {
    pub fn new(val: u32) -> Self {
        Self {
            reg: InMemoryRegister::new(val),
        }
    }
}

impl<R: RegisterLongName> Register for ReadWriteRegister<R> {
    fn read(&self, size: RvSize) -> Result<RvData, BusError> {
        if size != RvSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        Ok(self.reg.get())
    }

    fn write(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        self.reg.set(val);
        Ok(())
    }
}

/// Read Only Register
pub struct ReadOnlyRegister<R: RegisterLongName = ()> {
    pub reg: InMemoryRegister<u32, R>,
}

impl<R: RegisterLongName> ReadOnlyRegister<R> {
    pub fn new(val: u32) -> Self {
        Self {
            reg: InMemoryRegister::new(val),
        }
    }
}

impl<R: RegisterLongName> Register for ReadOnlyRegister<R> {
    fn read(&self, size: RvSize) -> Result<RvData, BusError> {
        if size != RvSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        Ok(self.reg.get())
    }

    fn write(&mut self, _size: RvSize, _val: RvData) -> Result<(), BusError> {
        Err(BusError::StoreAccessFault)
    }
}

/// Write Only Register
pub struct WriteOnlyRegister<R: RegisterLongName = ()> {
    pub reg: InMemoryRegister<u32, R>,
}

impl<R: RegisterLongName> WriteOnlyRegister<R> {
    pub fn new(val: u32) -> Self {
        Self {
            reg: InMemoryRegister::new(val),
        }
    }
}

impl<R: RegisterLongName> Register for WriteOnlyRegister<R> {
    fn read(&self, _size: RvSize) -> Result<RvData, BusError> {
        Err(BusError::LoadAccessFault)
    }

    fn write(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        self.reg.set(val);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tock_registers::register_bitfields;

    register_bitfields! [
        u32,
        Control [
            START OFFSET(0) NUMBITS(1) [],
            RESET OFFSET(1) NUMBITS(1) [],
        ],
    ];

    #[test]
    fn test_read_write_register() {
        let mut reg = ReadWriteRegister::<Control::Register>::new(0);
        assert_eq!(reg.write(RvSize::Word, 0b10), Ok(()));
        assert!(reg.reg.is_set(Control::RESET));
        assert!(!reg.reg.is_set(Control::START));
        assert_eq!(reg.read(RvSize::Word), Ok(0b10));
    }

    #[test]
    fn test_sub_word_access_faults() {
        let mut reg = ReadWriteRegister::<()>::new(0xFF);
        assert_eq!(reg.read(RvSize::Byte), Err(BusError::LoadAccessFault));
        assert_eq!(
            reg.write(RvSize::HalfWord, 0),
            Err(BusError::StoreAccessFault)
        );
        assert_eq!(reg.reg.get(), 0xFF);
    }

    #[test]
    fn test_read_only_register() {
        let mut reg = ReadOnlyRegister::<()>::new(0x1234);
        assert_eq!(reg.read(RvSize::Word), Ok(0x1234));
        assert_eq!(reg.write(RvSize::Word, 0), Err(BusError::StoreAccessFault));
    }

    #[test]
    fn test_write_only_register() {
        let mut reg = WriteOnlyRegister::<()>::new(0);
        assert_eq!(reg.write(RvSize::Word, 0x55), Ok(()));
        assert_eq!(reg.read(RvSize::Word), Err(BusError::LoadAccessFault));
        assert_eq!(reg.reg.get(), 0x55);
    }
}
