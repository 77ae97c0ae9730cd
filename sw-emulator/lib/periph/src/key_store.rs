/*++

Licensed under the Apache-2.0 license.

File Name:

    key_store.rs

Abstract:

    File contains the privileged key store.

--*/

use secsoc_emu_bus::{Bus, BusError, Ram};
use secsoc_emu_types::{RvAddr, RvData, RvSize};

/// Word-addressable key memory. Access control lives in the MPU.
pub struct KeyStore {
    ram: Ram,
}

impl KeyStore {
    pub const SIZE: usize = 256;

    /// Conventional slot of the AES key
    pub const SLOT_AES_KEY: RvAddr = 0x00;

    /// Conventional slot of the HMAC key
    pub const SLOT_HMAC_KEY: RvAddr = 0x10;

    /// Conventional slot of the root key
    pub const SLOT_ROOT_KEY: RvAddr = 0x20;

    /// Create a key store provisioned with `contents`. Bytes past
    /// [`KeyStore::SIZE`] are dropped and the remainder is zero-filled.
    pub fn new(contents: &[u8]) -> Self {
        let mut data = vec![0u8; Self::SIZE];
        let len = contents.len().min(Self::SIZE);
        if contents.len() > Self::SIZE {
            log::warn!(
                "key store: {} provisioning bytes truncated to {}",
                contents.len(),
                Self::SIZE
            );
        }
        data[..len].copy_from_slice(&contents[..len]);
        Self { ram: Ram::new(data) }
    }

    /// Memory map size.
    pub fn mmap_size(&self) -> RvAddr {
        self.ram.mmap_size()
    }

    pub fn data(&self) -> &[u8] {
        self.ram.data()
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl Bus for KeyStore {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        if size != RvSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        self.ram.read(size, addr)
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        self.ram.write(size, addr, val)
    }
}
