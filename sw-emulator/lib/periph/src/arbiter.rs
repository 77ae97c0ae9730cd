/*++

Licensed under the Apache-2.0 license.

File Name:

    arbiter.rs

Abstract:

    File contains the single-port message memories and the arbiter that
    shares them between the CPU and the crypto engine.

--*/

use secsoc_emu_bus::{Bus, BusError, Ram, Rom};
use secsoc_emu_crypto::{Fetch, MessagePort};
use secsoc_emu_types::{RvAddr, RvData, RvSize};

/// Consecutive CPU stalls after which the crypto engine yields the port
/// for one cycle
pub const CPU_STARVATION_LIMIT: u32 = 4;

/// Memories readable by the crypto engine, one port each
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemPort {
    BootRom,
    Firmware,
    DataRam,
}

impl MemPort {
    pub const BOOT_ROM_BASE: RvAddr = 0x0000_0000;
    pub const BOOT_ROM_SIZE: usize = 0x1000;
    pub const FIRMWARE_BASE: RvAddr = 0x0001_0000;
    pub const FIRMWARE_SIZE: usize = 0x1_0000;
    pub const DATA_RAM_BASE: RvAddr = 0x1000_0000;
    pub const DATA_RAM_SIZE: usize = 0x1_0000;

    pub fn base(self) -> RvAddr {
        match self {
            MemPort::BootRom => Self::BOOT_ROM_BASE,
            MemPort::Firmware => Self::FIRMWARE_BASE,
            MemPort::DataRam => Self::DATA_RAM_BASE,
        }
    }

    pub fn size(self) -> usize {
        match self {
            MemPort::BootRom => Self::BOOT_ROM_SIZE,
            MemPort::Firmware => Self::FIRMWARE_SIZE,
            MemPort::DataRam => Self::DATA_RAM_SIZE,
        }
    }

    /// Port holding `addr` and the offset of `addr` within it
    pub fn decode(addr: RvAddr) -> Option<(MemPort, RvAddr)> {
        [MemPort::BootRom, MemPort::Firmware, MemPort::DataRam]
            .into_iter()
            .find(|port| {
                addr >= port.base() && ((addr - port.base()) as usize) < port.size()
            })
            .map(|port| (port, addr - port.base()))
    }
}

/// Per-cycle owner of the message memory ports.
///
/// The crypto engine requests a port while it is being stepped; the grant
/// holds until the next clock edge. A CPU access to the granted memory in
/// that window stalls. After [`CPU_STARVATION_LIMIT`] consecutive CPU
/// stalls the next crypto request is refused so the CPU can get through.
pub struct BusArbiter {
    boot_rom: Rom,
    firmware: Ram,
    data_ram: Ram,
    crypto_grant: Option<MemPort>,
    cpu_stall_streak: u32,
}

impl BusArbiter {
    pub fn new(boot_rom: Rom, firmware: Ram, data_ram: Ram) -> Self {
        Self {
            boot_rom,
            firmware,
            data_ram,
            crypto_grant: None,
            cpu_stall_streak: 0,
        }
    }

    /// Release any grant at the start of a clock cycle.
    pub fn begin_cycle(&mut self) {
        self.crypto_grant = None;
    }

    /// Port currently granted to the crypto engine
    pub fn crypto_grant(&self) -> Option<MemPort> {
        self.crypto_grant
    }

    pub fn cpu_stall_streak(&self) -> u32 {
        self.cpu_stall_streak
    }

    /// Arbitrate a CPU access to `addr`. Returns `false` if the CPU must
    /// stall this cycle.
    pub fn cpu_request(&mut self, addr: RvAddr) -> bool {
        match MemPort::decode(addr) {
            Some((port, _)) if self.crypto_grant == Some(port) => {
                self.cpu_stall_streak += 1;
                log::debug!(
                    "arbiter: cpu stalled on {:?} ({} in a row)",
                    port,
                    self.cpu_stall_streak
                );
                false
            }
            Some(_) => {
                self.cpu_stall_streak = 0;
                true
            }
            None => true,
        }
    }

    pub fn data(&self, port: MemPort) -> &[u8] {
        match port {
            MemPort::BootRom => self.boot_rom.data(),
            MemPort::Firmware => self.firmware.data(),
            MemPort::DataRam => self.data_ram.data(),
        }
    }

    fn memory(&mut self, port: MemPort) -> &mut dyn Bus {
        match port {
            MemPort::BootRom => &mut self.boot_rom,
            MemPort::Firmware => &mut self.firmware,
            MemPort::DataRam => &mut self.data_ram,
        }
    }
}

/// CPU data path into the message memories (absolute addresses)
impl Bus for BusArbiter {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        let (port, offset) = MemPort::decode(addr).ok_or(BusError::LoadAccessFault)?;
        self.memory(port).read(size, offset)
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        let (port, offset) = MemPort::decode(addr).ok_or(BusError::StoreAccessFault)?;
        self.memory(port).write(size, offset, val)
    }
}

/// Crypto engine data path
impl MessagePort for BusArbiter {
    fn fetch(&mut self, addr: u32) -> Fetch {
        let Some((port, offset)) = MemPort::decode(addr) else {
            return Fetch::Fault;
        };
        if self.cpu_stall_streak >= CPU_STARVATION_LIMIT {
            log::debug!("arbiter: crypto yields {:?} to starved cpu", port);
            self.cpu_stall_streak = 0;
            return Fetch::Stall;
        }
        self.crypto_grant = Some(port);
        match self.memory(port).read(RvSize::Word, offset) {
            Ok(word) => Fetch::Data(word),
            Err(_) => Fetch::Fault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arbiter() -> BusArbiter {
        BusArbiter::new(
            Rom::new(vec![0x11; MemPort::BOOT_ROM_SIZE]),
            Ram::new(vec![0x22; MemPort::FIRMWARE_SIZE]),
            Ram::new(vec![0x33; MemPort::DATA_RAM_SIZE]),
        )
    }

    #[test]
    fn test_decode() {
        assert_eq!(MemPort::decode(0x0000_0FFC), Some((MemPort::BootRom, 0xFFC)));
        assert_eq!(MemPort::decode(0x0000_1000), None);
        assert_eq!(MemPort::decode(0x0001_FFC0), Some((MemPort::Firmware, 0xFFC0)));
        assert_eq!(MemPort::decode(0x1000_0004), Some((MemPort::DataRam, 4)));
        assert_eq!(MemPort::decode(0x1001_0000), None);
        assert_eq!(MemPort::decode(0x3000_0000), None);
    }

    #[test]
    fn test_cpu_path() {
        let mut arb = arbiter();
        assert_eq!(arb.read(RvSize::Word, 0x1000_0000), Ok(0x3333_3333));
        assert_eq!(arb.write(RvSize::Byte, 0x1000_0001, 0xAB), Ok(()));
        assert_eq!(arb.read(RvSize::Word, 0x1000_0000), Ok(0x3333_AB33));
        assert_eq!(
            arb.write(RvSize::Word, 0x0000_0000, 0),
            Err(BusError::StoreAccessFault)
        );
        assert_eq!(
            arb.read(RvSize::Word, 0x2000_0000),
            Err(BusError::LoadAccessFault)
        );
    }

    #[test]
    fn test_crypto_priority_stalls_cpu() {
        let mut arb = arbiter();
        assert_eq!(arb.fetch(0x0001_0000), Fetch::Data(0x2222_2222));
        assert_eq!(arb.crypto_grant(), Some(MemPort::Firmware));
        assert!(!arb.cpu_request(0x0001_0100));
        assert!(arb.cpu_request(0x1000_0000));
        assert!(arb.cpu_request(0x2000_0000));
        arb.begin_cycle();
        assert!(arb.cpu_request(0x0001_0100));
    }

    #[test]
    fn test_starvation_bound() {
        let mut arb = arbiter();
        let mut stalls = 0;
        let mut served = false;
        for _ in 0..10 {
            arb.begin_cycle();
            let fetch = arb.fetch(0x1000_0000);
            if arb.cpu_request(0x1000_0008) {
                assert_eq!(fetch, Fetch::Stall);
                served = true;
                break;
            }
            stalls += 1;
        }
        assert!(served);
        assert_eq!(stalls, CPU_STARVATION_LIMIT);
        assert_eq!(arb.cpu_stall_streak(), 0);
    }

    #[test]
    fn test_crypto_fault_outside_memories() {
        let mut arb = arbiter();
        assert_eq!(arb.fetch(0x4000_0000), Fetch::Fault);
        assert_eq!(arb.fetch(0x3000_0000), Fetch::Fault);
        assert_eq!(arb.crypto_grant(), None);
    }
}
