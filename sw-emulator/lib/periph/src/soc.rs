/*++

Licensed under the Apache-2.0 license.

File Name:

    soc.rs

Abstract:

    File contains the SoC model: the clock, the root bus and the CPU-facing
    access path through the MPU and the port arbiter.

--*/

use crate::mpu;
use crate::root_bus::{ImageTooLarge, SocArgs, SocRootBus};
use secsoc_emu_bus::{Bus, BusError, Clock};
use secsoc_emu_types::{AccessKind, PrivMode, RvAddr, RvData, RvSize};

/// One CPU bus request
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BusAccess {
    pub addr: RvAddr,
    pub size: RvSize,
    pub kind: AccessKind,
    pub mode: PrivMode,

    /// Store data; ignored for loads and fetches
    pub data: RvData,
}

impl BusAccess {
    pub fn read(mode: PrivMode, size: RvSize, addr: RvAddr) -> Self {
        Self {
            addr,
            size,
            kind: AccessKind::Read,
            mode,
            data: 0,
        }
    }

    pub fn write(mode: PrivMode, size: RvSize, addr: RvAddr, data: RvData) -> Self {
        Self {
            addr,
            size,
            kind: AccessKind::Write,
            mode,
            data,
        }
    }

    /// Instruction fetch (always a word)
    pub fn fetch(mode: PrivMode, addr: RvAddr) -> Self {
        Self {
            addr,
            size: RvSize::Word,
            kind: AccessKind::Execute,
            mode,
            data: 0,
        }
    }
}

/// Answer to a CPU bus request
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CpuResponse {
    /// Load or fetch data
    Data(RvData),

    /// Store completed
    Done,

    /// Memory port busy; retry after the next tick
    Stall,

    /// MPU violation; the trap line is now asserted
    Trap,

    /// The addressed device rejected the access
    BusFault(BusError),
}

/// Secure SoC
pub struct Soc {
    clock: Clock,
    bus: SocRootBus,
    mpu_violation: bool,
    cpu_fault: bool,
    halted: bool,
}

impl Soc {
    pub fn new(args: SocArgs) -> Result<Self, ImageTooLarge> {
        let clock = Clock::new();
        let bus = SocRootBus::new(&clock, args)?;
        Ok(Self {
            clock,
            bus,
            mpu_violation: false,
            cpu_fault: false,
            halted: false,
        })
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn bus(&self) -> &SocRootBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SocRootBus {
        &mut self.bus
    }

    /// Advance the SoC by one clock. A halted SoC does not advance.
    pub fn tick(&mut self) {
        if self.halted {
            return;
        }
        self.clock.increment(1);
        self.bus.arbiter.borrow_mut().begin_cycle();
        self.bus.poll();
    }

    /// Perform a CPU access. The MPU is consulted first; a violation
    /// asserts the trap line and the access never reaches the bus.
    pub fn cpu_access(&mut self, access: BusAccess) -> CpuResponse {
        if mpu::check(access.addr, access.kind, access.mode).violation() {
            self.mpu_violation = true;
            return CpuResponse::Trap;
        }

        if !self.bus.arbiter.borrow_mut().cpu_request(access.addr) {
            return CpuResponse::Stall;
        }

        match access.kind {
            AccessKind::Write => match self.bus.write(access.size, access.addr, access.data) {
                Ok(()) => CpuResponse::Done,
                Err(err) => CpuResponse::BusFault(err),
            },
            AccessKind::Read | AccessKind::Execute => {
                match self.bus.read(access.size, access.addr) {
                    Ok(data) => CpuResponse::Data(data),
                    Err(err) => CpuResponse::BusFault(err),
                }
            }
        }
    }

    /// Word load, retried across stalls for at most `max_ticks` ticks
    pub(crate) fn read_word_blocking(
        &mut self,
        mode: PrivMode,
        addr: RvAddr,
        max_ticks: u64,
    ) -> CpuResponse {
        let mut waited = 0;
        loop {
            let resp = self.cpu_access(BusAccess::read(mode, RvSize::Word, addr));
            if resp != CpuResponse::Stall || waited >= max_ticks {
                return resp;
            }
            self.tick();
            waited += 1;
        }
    }

    /// Record a fault raised inside the CPU (illegal instruction and the
    /// like). It is ORed into the trap line.
    pub fn raise_cpu_fault(&mut self) {
        self.cpu_fault = true;
    }

    pub fn mpu_violation(&self) -> bool {
        self.mpu_violation
    }

    /// Trap line: MPU violation OR CPU fault. Sticky until power-on reset.
    pub fn trap(&self) -> bool {
        self.mpu_violation || self.cpu_fault
    }

    pub fn halt(&mut self) {
        if !self.halted {
            log::warn!("soc: halted at cycle {}", self.clock.now());
        }
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}
