/*++

Licensed under the Apache-2.0 license.

File Name:

    mem.rs

Abstract:

    File contains the byte-addressed little-endian storage shared by the ROM
    and RAM devices.

--*/

use crate::BusError;
use secsoc_emu_types::{RvAddr, RvData, RvSize};

/// Memory Exception
#[derive(Debug, PartialEq, Eq)]
pub enum MemError {
    /// Read Address misaligned
    ReadAddrMisaligned,

    /// Read Access fault
    ReadAccessFault,

    /// Write Address misaligned
    WriteAddrMisaligned,

    /// Write access fault
    WriteAccessFault,
}

impl From<MemError> for BusError {
    fn from(exception: MemError) -> BusError {
        match exception {
            MemError::ReadAddrMisaligned => BusError::LoadAddrMisaligned,
            MemError::ReadAccessFault => BusError::LoadAccessFault,
            MemError::WriteAddrMisaligned => BusError::StoreAddrMisaligned,
            MemError::WriteAccessFault => BusError::StoreAccessFault,
        }
    }
}

/// Memory
pub struct Mem {
    /// Data storage
    data: Vec<u8>,
}

impl Mem {
    /// Create a new memory object
    ///
    /// # Arguments
    ///
    /// * `data` - Data contents for memory
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Size of the memory in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Immutable reference to data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Read data of specified size from given address. The address must be
    /// `size` aligned.
    ///
    /// # Error
    ///
    /// * `MemError::ReadAddrMisaligned` - Read address is not `size` aligned
    /// * `MemError::ReadAccessFault` - Read from invalid or non existent address
    pub fn read(&self, size: RvSize, addr: RvAddr) -> Result<RvData, MemError> {
        if addr as usize % usize::from(size) != 0 {
            Err(MemError::ReadAddrMisaligned)?
        }
        let range = self.slice(size, addr).ok_or(MemError::ReadAccessFault)?;
        let bytes = &self.data[range];
        Ok(bytes
            .iter()
            .rev()
            .fold(0, |acc, b| (acc << 8) | RvData::from(*b)))
    }

    /// Write data of specified size to given address. The address must be
    /// `size` aligned.
    ///
    /// # Error
    ///
    /// * `MemError::WriteAddrMisaligned` - Write address is not `size` aligned
    /// * `MemError::WriteAccessFault` - Write to invalid or non existent address
    pub fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), MemError> {
        if addr as usize % usize::from(size) != 0 {
            Err(MemError::WriteAddrMisaligned)?
        }
        let range = self.slice(size, addr).ok_or(MemError::WriteAccessFault)?;
        let le = val.to_le_bytes();
        let len = range.len();
        self.data[range].copy_from_slice(&le[..len]);
        Ok(())
    }

    fn slice(&self, size: RvSize, addr: RvAddr) -> Option<std::ops::Range<usize>> {
        let start = addr as usize;
        let end = start.checked_add(usize::from(size))?;
        if end > self.data.len() {
            return None;
        }
        Some(start..end)
    }
}
