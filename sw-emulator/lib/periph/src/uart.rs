/*++

Licensed under the Apache-2.0 license.

File Name:

    uart.rs

Abstract:

    File contains UART device implementation.

--*/

use secsoc_emu_bus::{Bus, BusError};
use secsoc_emu_types::{RvAddr, RvData, RvSize};
use std::cell::RefCell;
use std::rc::Rc;

/// Console output shared between the UART and whoever displays it
pub type UartOutput = Rc<RefCell<Vec<u8>>>;

/// End-of-transmission byte; firmware writes it to end the simulation
pub const UART_EOT: u8 = 0x04;

pub struct Uart {
    output: UartOutput,
    eot: bool,
}

impl Uart {
    /// Transmit Data Register
    const ADDR_TX: RvAddr = 0x00;

    /// Transmit Status Register
    const ADDR_STATUS: RvAddr = 0x04;

    pub fn new(output: UartOutput) -> Self {
        Self { output, eot: false }
    }

    /// Memory map size.
    pub fn mmap_size(&self) -> RvAddr {
        256
    }

    pub fn output(&self) -> UartOutput {
        self.output.clone()
    }

    /// Whether firmware has sent [`UART_EOT`]
    pub fn end_of_transmission(&self) -> bool {
        self.eot
    }
}

impl Default for Uart {
    fn default() -> Self {
        Self::new(UartOutput::default())
    }
}

impl Bus for Uart {
    /// Read data of specified size from given address
    ///
    /// # Error
    ///
    /// * `BusError::LoadAccessFault` - Access is not a word read of `STATUS`
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        match (size, addr) {
            // Transmission is instantaneous so TX_BUSY never sets
            (RvSize::Word, Uart::ADDR_STATUS) => Ok(0),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    /// Write data of specified size to given address
    ///
    /// # Error
    ///
    /// * `BusError::StoreAccessFault` - Access is not a word write of `TX`
    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        match (size, addr) {
            (RvSize::Word, Uart::ADDR_TX) => {
                let byte = val as u8;
                if byte == UART_EOT {
                    log::debug!("uart: end of transmission");
                    self.eot = true;
                } else {
                    self.output.borrow_mut().push(byte);
                }
            }
            _ => Err(BusError::StoreAccessFault)?,
        }
        Ok(())
    }
}
