/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Secure SoC Emulator Types library.

--*/

mod lanes;
mod macros;

pub use crate::lanes::ByteLanes;

/// Bus data width
pub type RvData = u32;

/// Bus address width
pub type RvAddr = u32;

emu_enum!(
    /// Bus transfer size
    #[derive(Debug, Eq, PartialEq, Copy, Clone)]
    pub RvSize;
    usize;
    {
        Byte = 1,
        HalfWord = 2,
        Word = 4,
    }
);

emu_enum!(
    /// Privilege of the bus master issuing an access
    #[derive(Debug, Eq, PartialEq, Copy, Clone)]
    pub PrivMode;
    u32;
    {
        /// User mode
        User = 0b00,

        /// Machine mode
        Machine = 0b11,
    }
);

emu_enum!(
    /// Kind of bus access, as seen by the memory protection unit
    #[derive(Debug, Eq, PartialEq, Copy, Clone)]
    pub AccessKind;
    u8;
    {
        /// Data read
        Read = 0b001,

        /// Data write
        Write = 0b010,

        /// Instruction fetch
        Execute = 0b100,
    }
);

impl PrivMode {
    /// Returns true for machine mode.
    pub fn is_privileged(self) -> bool {
        self == PrivMode::Machine
    }
}
