/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the Secure SoC Emulator.

--*/

use anyhow::{anyhow, Context};
use clap::Parser;
use secsoc_emu_periph::{BootVerdict, SecureBoot, Soc, SocArgs, UartOutput};
use std::path::Path;
use std::process::exit;

mod cli;

fn read_file(path: &Path, what: &str) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {} {}", what, path.display()))
}

fn parse_key(key: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = hex::decode(key.trim()).context("Boot key is not valid hex")?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("Boot key must be 32 bytes, got {}", bytes.len()))
}

fn run(args: cli::Args) -> anyhow::Result<bool> {
    log::debug!("{:?}", args);
    let key = parse_key(&args.key)?;
    let uart_output = UartOutput::default();

    let soc_args = SocArgs {
        rom: args
            .rom
            .as_deref()
            .map(|p| read_file(p, "ROM"))
            .transpose()?
            .unwrap_or_default(),
        firmware: read_file(&args.firmware, "firmware image")?,
        data: args
            .data
            .as_deref()
            .map(|p| read_file(p, "data image"))
            .transpose()?
            .unwrap_or_default(),
        key_store: args
            .key_store
            .as_deref()
            .map(|p| read_file(p, "key store"))
            .transpose()?
            .unwrap_or_default(),
        nonce_seed: args.nonce_seed,
        uart_output: uart_output.clone(),
    };

    let mut soc = Soc::new(soc_args).context("Failed to build the SoC")?;
    let verdict = SecureBoot::new(key, args.boot_timeout)
        .run(&mut soc)
        .context("Secure boot did not complete")?;

    let verified = match verdict {
        BootVerdict::Verified {
            version,
            entry_point,
        } => {
            println!(
                "Secure boot: VERIFIED (version {}, entry {:#010x}, {} cycles)",
                version,
                entry_point,
                soc.clock().now()
            );
            true
        }
        BootVerdict::Halted(reason) => {
            println!("Secure boot: HALTED ({})", reason);
            false
        }
    };

    let output = uart_output.borrow();
    if !output.is_empty() {
        println!("UART output:");
        println!("{}", String::from_utf8_lossy(&output));
    }

    Ok(verified)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(cli::Args::parse()) {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        let key = parse_key(&"ab".repeat(32)).unwrap();
        assert_eq!(key, [0xAB; 32]);
        assert!(parse_key("abcd").is_err());
        assert!(parse_key(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_args() {
        use clap::CommandFactory;
        cli::Args::command().debug_assert();

        let args = cli::Args::parse_from([
            "secsoc-emu",
            "--firmware",
            "fw.bin",
            "--key",
            "00",
            "--nonce-seed",
            "7",
        ]);
        assert_eq!(args.nonce_seed, 7);
        assert_eq!(args.boot_timeout, cli::DEFAULT_BOOT_TIMEOUT_IN_CYCLES);
        assert!(args.rom.is_none());
    }
}
