/*++

Licensed under the Apache-2.0 license.

File Name:

    rom.rs

Abstract:

    File contains implementation of ROM

--*/

use crate::{mem::Mem, Bus, BusError};
use secsoc_emu_types::{RvAddr, RvData, RvSize};

/// Read Only Memory Device
pub struct Rom {
    data: Mem,
}

impl Rom {
    /// Create new ROM
    ///
    /// # Arguments
    ///
    /// * `data` - Data to be stored in the ROM
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Mem::new(data),
        }
    }

    pub fn mmap_size(&self) -> RvAddr {
        self.data.len() as RvAddr
    }

    pub fn data(&self) -> &[u8] {
        self.data.data()
    }
}

impl Bus for Rom {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        Ok(self.data.read(size, addr)?)
    }

    /// ROM contents cannot be changed from the bus; every write faults.
    fn write(&mut self, _size: RvSize, _addr: RvAddr, _val: RvData) -> Result<(), BusError> {
        Err(BusError::StoreAccessFault)
    }
}
