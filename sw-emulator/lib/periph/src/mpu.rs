/*++

Licensed under the Apache-2.0 license.

File Name:

    mpu.rs

Abstract:

    File contains the memory protection unit. Every CPU bus access is
    classified against a fixed region table before it reaches the bus.

--*/

use secsoc_emu_types::{AccessKind, PrivMode, RvAddr};

/// Named address region
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Region {
    BootRom,
    Firmware,
    Data,
    Uart,
    Crypto,
    KeyStore,
    AntiReplay,
    Unmapped,
}

/// Outcome of an MPU check
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MpuDecision {
    Allow(Region),
    Violation(Region),
}

impl MpuDecision {
    pub fn access_allowed(self) -> bool {
        matches!(self, MpuDecision::Allow(_))
    }

    pub fn violation(self) -> bool {
        !self.access_allowed()
    }

    pub fn region(self) -> Region {
        match self {
            MpuDecision::Allow(region) | MpuDecision::Violation(region) => region,
        }
    }
}

const R: u8 = AccessKind::Read as u8;
const W: u8 = AccessKind::Write as u8;
const X: u8 = AccessKind::Execute as u8;

struct RegionEntry {
    region: Region,
    base: RvAddr,
    end: RvAddr,

    /// Access kinds allowed in user mode
    user: u8,

    /// Access kinds allowed in machine mode
    machine: u8,
}

#[rustfmt::skip]
const REGION_TABLE: [RegionEntry; 7] = [
    RegionEntry { region: Region::BootRom,    base: 0x0000_0000, end: 0x0000_0FFF, user: R | X,     machine: R | X },
    RegionEntry { region: Region::Firmware,   base: 0x0001_0000, end: 0x0001_FFFF, user: R | X,     machine: R | X },
    RegionEntry { region: Region::Data,       base: 0x1000_0000, end: 0x1000_FFFF, user: R | W | X, machine: R | W | X },
    RegionEntry { region: Region::Uart,       base: 0x2000_0000, end: 0x2000_00FF, user: R | W | X, machine: R | W | X },
    RegionEntry { region: Region::Crypto,     base: 0x3000_0000, end: 0x3000_00FF, user: R | W | X, machine: R | W | X },
    RegionEntry { region: Region::KeyStore,   base: 0x4000_0000, end: 0x4000_00FF, user: 0,         machine: R | W | X },
    RegionEntry { region: Region::AntiReplay, base: 0x5000_0000, end: 0x5000_00FF, user: R | W | X, machine: R | W | X },
];

/// Region containing `addr`; first match wins.
pub fn region_of(addr: RvAddr) -> Region {
    REGION_TABLE
        .iter()
        .find(|entry| (entry.base..=entry.end).contains(&addr))
        .map_or(Region::Unmapped, |entry| entry.region)
}

/// Classify an access. The result depends only on the arguments.
pub fn check(addr: RvAddr, access: AccessKind, mode: PrivMode) -> MpuDecision {
    let Some(entry) = REGION_TABLE
        .iter()
        .find(|entry| (entry.base..=entry.end).contains(&addr))
    else {
        log::warn!("mpu: {:?} of unmapped address {:#010x}", access, addr);
        return MpuDecision::Violation(Region::Unmapped);
    };

    let allowed_mask = match mode {
        PrivMode::Machine => entry.machine,
        PrivMode::User => entry.user,
    };

    let access = u8::from(access);
    if access & allowed_mask != access {
        log::warn!(
            "mpu: access {:#x} to {:?} at {:#010x} denied in {:?} mode",
            access,
            entry.region,
            addr,
            mode
        );
        MpuDecision::Violation(entry.region)
    } else {
        MpuDecision::Allow(entry.region)
    }
}

/// Flag-style form of [`check`]
pub fn check_access(addr: RvAddr, is_write: bool, is_exec: bool, privileged: bool) -> MpuDecision {
    let access = if is_exec {
        AccessKind::Execute
    } else if is_write {
        AccessKind::Write
    } else {
        AccessKind::Read
    };
    let mode = if privileged {
        PrivMode::Machine
    } else {
        PrivMode::User
    };
    check(addr, access, mode)
}
