/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Secure SoC Emulator Peripheral library.

--*/

mod anti_replay;
mod arbiter;
mod crypto_accel;
mod key_store;
mod monotonic_counter;
pub mod mpu;
mod nonce_gen;
mod replay_block;
mod root_bus;
mod secure_boot;
mod soc;
mod uart;

pub use anti_replay::{AntiReplayEngine, NonceCache, ReplayStatus, NONCE_CACHE_CAPACITY};
pub use arbiter::{BusArbiter, MemPort, CPU_STARVATION_LIMIT};
pub use crypto_accel::{CryptoAccelerator, CryptoCtrl, CryptoStatus, MODE_HMAC_SHA256, MODE_SHA256};
pub use key_store::KeyStore;
pub use monotonic_counter::{MonotonicCounter, Outcome, COUNTER_LOCK_MAGIC};
pub use mpu::{MpuDecision, Region};
pub use nonce_gen::{NonceGenerator, DEFAULT_NONCE_SEED, NONCE_WARMUP_STEPS};
pub use replay_block::{AntiReplayBlock, ReplayCtrl, ReplayValidator};
pub use root_bus::{ImageTooLarge, SocArgs, SocRootBus};
pub use secure_boot::{
    BootError, BootVerdict, FirmwareHeader, HaltReason, SecureBoot, FW_BASE, FW_HEADER_MAGIC,
    FW_HEADER_OFFSET, FW_SIGNED_LEN,
};
pub use soc::{BusAccess, CpuResponse, Soc};
pub use uart::{Uart, UartOutput, UART_EOT};
