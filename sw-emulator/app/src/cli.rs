/*++

Licensed under the Apache-2.0 license.

File Name:

    cli.rs

Abstract:

    File contains the command line arguments of the Secure SoC Emulator.

--*/

use clap::Parser;
use secsoc_emu_periph::DEFAULT_NONCE_SEED;
use std::path::PathBuf;

/// Default bound on the secure-boot accelerator poll
pub const DEFAULT_BOOT_TIMEOUT_IN_CYCLES: u64 = 2_000_000;

#[derive(Parser, Debug)]
#[command(author, version, about = "Secure SoC emulator", long_about = None)]
pub struct Args {
    /// Signed firmware image (at most 64 KiB, header at offset 0xFFC0)
    #[arg(long)]
    pub firmware: PathBuf,

    /// 256-bit HMAC boot key as 64 hex characters
    #[arg(long)]
    pub key: String,

    /// Boot ROM binary path
    #[arg(long)]
    pub rom: Option<PathBuf>,

    /// Initial data RAM contents
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Key store provisioning file
    #[arg(long)]
    pub key_store: Option<PathBuf>,

    /// Power-on seed of the nonce generator
    #[arg(long, default_value_t = DEFAULT_NONCE_SEED)]
    pub nonce_seed: u32,

    /// Secure-boot poll bound in clock cycles
    #[arg(long, default_value_t = DEFAULT_BOOT_TIMEOUT_IN_CYCLES)]
    pub boot_timeout: u64,
}
