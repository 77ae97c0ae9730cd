/*++

Licensed under the Apache-2.0 license.

File Name:

    root_bus.rs

Abstract:

    File contains the root Bus implementation for the secure SoC emulator.

--*/

use crate::arbiter::{BusArbiter, MemPort};
use crate::nonce_gen::DEFAULT_NONCE_SEED;
use crate::uart::UartOutput;
use crate::{AntiReplayBlock, CryptoAccelerator, KeyStore, Uart};
use secsoc_emu_bus::{Bus, BusError, Clock, Ram, Rom};
use secsoc_emu_types::{RvAddr, RvData, RvSize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Root bus construction arguments
pub struct SocArgs {
    /// Boot ROM image, zero-filled to 4 KiB
    pub rom: Vec<u8>,

    /// Firmware image, zero-filled to 64 KiB
    pub firmware: Vec<u8>,

    /// Initial data RAM contents, zero-filled to 64 KiB
    pub data: Vec<u8>,

    /// Key store provisioning
    pub key_store: Vec<u8>,

    /// Power-on seed of the nonce generator
    pub nonce_seed: u32,

    /// Sink for UART output
    pub uart_output: UartOutput,
}

impl Default for SocArgs {
    fn default() -> Self {
        Self {
            rom: Default::default(),
            firmware: Default::default(),
            data: Default::default(),
            key_store: Default::default(),
            nonce_seed: DEFAULT_NONCE_SEED,
            uart_output: Default::default(),
        }
    }
}

/// An image does not fit its memory
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ImageTooLarge {
    pub port: MemPort,
    pub len: usize,
    pub capacity: usize,
}

impl fmt::Display for ImageTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} image is {} bytes, capacity is {} bytes",
            self.port, self.len, self.capacity
        )
    }
}

impl std::error::Error for ImageTooLarge {}

fn fill_region(port: MemPort, mut image: Vec<u8>) -> Result<Vec<u8>, ImageTooLarge> {
    if image.len() > port.size() {
        return Err(ImageTooLarge {
            port,
            len: image.len(),
            capacity: port.size(),
        });
    }
    image.resize(port.size(), 0);
    Ok(image)
}

/// Secure SoC Root Bus
pub struct SocRootBus {
    /// Boot ROM, firmware RAM and data RAM behind the port arbiter
    pub arbiter: Rc<RefCell<BusArbiter>>,

    pub uart: Uart,

    pub crypto: CryptoAccelerator,

    pub key_store: KeyStore,

    pub anti_replay: AntiReplayBlock,
}

impl SocRootBus {
    pub const UART_BASE: RvAddr = 0x2000_0000;
    pub const UART_END: RvAddr = 0x2000_00FF;
    pub const CRYPTO_BASE: RvAddr = 0x3000_0000;
    pub const CRYPTO_END: RvAddr = 0x3000_00FF;
    pub const KEY_STORE_BASE: RvAddr = 0x4000_0000;
    pub const KEY_STORE_END: RvAddr = 0x4000_00FF;
    pub const ANTI_REPLAY_BASE: RvAddr = 0x5000_0000;
    pub const ANTI_REPLAY_END: RvAddr = 0x5000_00FF;

    pub fn new(clock: &Clock, args: SocArgs) -> Result<Self, ImageTooLarge> {
        let rom = fill_region(MemPort::BootRom, args.rom)?;
        let firmware = fill_region(MemPort::Firmware, args.firmware)?;
        let data = fill_region(MemPort::DataRam, args.data)?;
        let arbiter = Rc::new(RefCell::new(BusArbiter::new(
            Rom::new(rom),
            Ram::new(firmware),
            Ram::new(data),
        )));

        Ok(Self {
            crypto: CryptoAccelerator::new(arbiter.clone()),
            arbiter,
            uart: Uart::new(args.uart_output),
            key_store: KeyStore::new(&args.key_store),
            anti_replay: AntiReplayBlock::new(clock, args.nonce_seed),
        })
    }
}

impl Bus for SocRootBus {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        match addr {
            _ if MemPort::decode(addr).is_some() => self.arbiter.borrow_mut().read(size, addr),
            Self::UART_BASE..=Self::UART_END => self.uart.read(size, addr - Self::UART_BASE),
            Self::CRYPTO_BASE..=Self::CRYPTO_END => {
                self.crypto.read(size, addr - Self::CRYPTO_BASE)
            }
            Self::KEY_STORE_BASE..=Self::KEY_STORE_END => {
                self.key_store.read(size, addr - Self::KEY_STORE_BASE)
            }
            Self::ANTI_REPLAY_BASE..=Self::ANTI_REPLAY_END => {
                self.anti_replay.read(size, addr - Self::ANTI_REPLAY_BASE)
            }
            _ => Err(BusError::LoadAccessFault),
        }
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        match addr {
            _ if MemPort::decode(addr).is_some() => {
                self.arbiter.borrow_mut().write(size, addr, val)
            }
            Self::UART_BASE..=Self::UART_END => {
                self.uart.write(size, addr - Self::UART_BASE, val)
            }
            Self::CRYPTO_BASE..=Self::CRYPTO_END => {
                self.crypto.write(size, addr - Self::CRYPTO_BASE, val)
            }
            Self::KEY_STORE_BASE..=Self::KEY_STORE_END => {
                self.key_store
                    .write(size, addr - Self::KEY_STORE_BASE, val)
            }
            Self::ANTI_REPLAY_BASE..=Self::ANTI_REPLAY_END => {
                self.anti_replay
                    .write(size, addr - Self::ANTI_REPLAY_BASE, val)
            }
            _ => Err(BusError::StoreAccessFault),
        }
    }

    fn poll(&mut self) {
        self.crypto.poll();
        self.anti_replay.poll();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> SocRootBus {
        SocRootBus::new(
            &Clock::new(),
            SocArgs {
                rom: vec![0x13, 0x00, 0x00, 0x00],
                firmware: vec![0xEF, 0xBE, 0xAD, 0xDE],
                key_store: vec![0x01, 0x02, 0x03, 0x04],
                nonce_seed: 0x5EED,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_memory_map() {
        let mut bus = bus();
        assert_eq!(bus.read(RvSize::Word, 0x0000_0000), Ok(0x13));
        assert_eq!(bus.read(RvSize::Word, 0x0000_0FFC), Ok(0));
        assert_eq!(bus.read(RvSize::Word, 0x0001_0000), Ok(0xDEAD_BEEF));
        assert_eq!(bus.read(RvSize::Word, 0x4000_0000), Ok(0x0403_0201));
        assert_eq!(bus.read(RvSize::Word, 0x5000_0010), Ok(0x5EED));
        assert_eq!(bus.read(RvSize::Word, 0x3000_0004), Ok(0));
        assert_eq!(bus.read(RvSize::Word, 0x2000_0004), Ok(0));

        assert_eq!(bus.write(RvSize::Word, 0x1000_0010, 0x55AA), Ok(()));
        assert_eq!(bus.read(RvSize::HalfWord, 0x1000_0010), Ok(0x55AA));
    }

    #[test]
    fn test_unmapped_faults() {
        let mut bus = bus();
        for addr in [0x0000_1000, 0x0002_0000, 0x1001_0000, 0x2000_0100, 0x6000_0000] {
            assert_eq!(bus.read(RvSize::Word, addr), Err(BusError::LoadAccessFault));
            assert_eq!(
                bus.write(RvSize::Word, addr, 0),
                Err(BusError::StoreAccessFault)
            );
        }
        assert_eq!(
            bus.write(RvSize::Word, 0x0000_0000, 0),
            Err(BusError::StoreAccessFault)
        );
    }

    #[test]
    fn test_uart_sink() {
        let output = UartOutput::default();
        let mut bus = SocRootBus::new(
            &Clock::new(),
            SocArgs {
                uart_output: output.clone(),
                ..Default::default()
            },
        )
        .unwrap();
        bus.write(RvSize::Word, 0x2000_0000, b'k' as u32).unwrap();
        assert_eq!(output.borrow().as_slice(), b"k");
    }

    #[test]
    fn test_oversized_image() {
        let result = SocRootBus::new(
            &Clock::new(),
            SocArgs {
                rom: vec![0; 0x1001],
                ..Default::default()
            },
        );
        assert_eq!(
            result.err(),
            Some(ImageTooLarge {
                port: MemPort::BootRom,
                len: 0x1001,
                capacity: 0x1000,
            })
        );
    }
}
