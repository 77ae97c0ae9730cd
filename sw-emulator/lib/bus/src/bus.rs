/*++

Licensed under the Apache-2.0 license.

File Name:

    bus.rs

Abstract:

    File contains definition of the Bus trait.

--*/

use secsoc_emu_types::{ByteLanes, RvAddr, RvData, RvSize};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusError {
    /// Load address misaligned exception
    LoadAddrMisaligned,

    /// Load access fault exception
    LoadAccessFault,

    /// Store address misaligned exception
    StoreAddrMisaligned,

    /// Store access fault exception
    StoreAccessFault,
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            BusError::LoadAddrMisaligned => "load address misaligned",
            BusError::LoadAccessFault => "load access fault",
            BusError::StoreAddrMisaligned => "store address misaligned",
            BusError::StoreAccessFault => "store access fault",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for BusError {}

/// Represents an abstract memory bus. Used to read and write from RAM and
/// peripheral addresses.
pub trait Bus {
    /// Read data of specified size from given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the read
    /// * `addr` - Address to read from
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::LoadAccessFault` or `BusError::LoadAddrMisaligned`
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError>;

    /// Write data of specified size to given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the write
    /// * `addr` - Address to write
    /// * `val` - Data to write
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::StoreAccessFault` or `BusError::StoreAddrMisaligned`
    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError>;

    /// Write a bus word under a byte-enable strobe.
    ///
    /// `val` carries each byte in its lane of the word at `addr & !3`. Only
    /// strobes that describe one naturally aligned byte, half-word or word
    /// are accepted; anything else is a `StoreAccessFault`.
    fn write_masked(&mut self, addr: RvAddr, val: RvData, byte_mask: u8) -> Result<(), BusError> {
        let (size, addr, val) = ByteLanes::from_mask(byte_mask)
            .to_access(addr, val)
            .ok_or(BusError::StoreAccessFault)?;
        self.write(size, addr, val)
    }

    /// Called once per clock tick by the owner of the bus. Peripherals with
    /// multi-cycle engines advance them here.
    fn poll(&mut self) {
        // By default, do nothing
    }
}

impl<T: Bus + ?Sized> Bus for Box<T> {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        T::read(self, size, addr)
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        T::write(self, size, addr, val)
    }

    fn poll(&mut self) {
        T::poll(self)
    }
}
