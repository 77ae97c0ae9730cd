/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Secure SoC Emulator Bus library.

--*/
mod bus;
mod clock;
mod mem;
mod ram;
mod register;
mod rom;

pub use crate::bus::{Bus, BusError};
pub use crate::clock::{ActionHandle, Clock, Timer};
pub use crate::mem::{Mem, MemError};
pub use crate::ram::Ram;
pub use crate::register::{ReadOnlyRegister, ReadWriteRegister, Register, WriteOnlyRegister};
pub use crate::rom::Rom;
