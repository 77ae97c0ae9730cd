/*++

Licensed under the Apache-2.0 license.

File Name:

    secure_boot.rs

Abstract:

    File contains the firmware header layout and the boot-time signature
    check that drives the crypto accelerator through the CPU access path.

--*/

use crate::crypto_accel::{CryptoStatus, MODE_HMAC_SHA256};
use crate::soc::{BusAccess, CpuResponse, Soc};
use crate::SocRootBus;
use secsoc_emu_types::{PrivMode, RvAddr, RvData, RvSize};
use std::fmt;
use tock_registers::LocalRegisterCopy;
use zerocopy::{AsBytes, FromBytes};

/// Header magic of a signed image
pub const FW_HEADER_MAGIC: u32 = 0xDEAD_BEEF;

/// Base of the firmware region
pub const FW_BASE: RvAddr = 0x0001_0000;

/// Offset of the header from [`FW_BASE`]
pub const FW_HEADER_OFFSET: usize = 0xFFC0;

/// Number of bytes covered by the signature: the firmware region up to and
/// including the header fields that precede the signature
pub const FW_SIGNED_LEN: usize = FW_HEADER_OFFSET + FirmwareHeader::SIGNATURE_OFFSET;

/// Header at the end of the firmware region
#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct FirmwareHeader {
    pub magic: u32,
    pub version: u32,
    pub length: u32,
    pub entry_point: u32,
    pub timestamp: u32,
    pub reserved: [u32; 3],

    /// HMAC-SHA256 over the first [`FW_SIGNED_LEN`] bytes of the region
    pub signature: [u8; 32],
}

impl FirmwareHeader {
    pub const SIZE: usize = 64;
    pub const SIGNATURE_OFFSET: usize = 32;
}

/// Why boot stopped
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HaltReason {
    /// Header magic is not [`FW_HEADER_MAGIC`]
    BadMagic(u32),

    /// Accelerator digest differs from the header signature
    SignatureMismatch,

    /// Accelerator raised `STATUS.error`
    CryptoError,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::BadMagic(magic) => write!(f, "bad header magic {:#010x}", magic),
            HaltReason::SignatureMismatch => write!(f, "signature mismatch"),
            HaltReason::CryptoError => write!(f, "crypto accelerator error"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BootVerdict {
    Verified { version: u32, entry_point: u32 },
    Halted(HaltReason),
}

/// Failure of the verifier itself, as opposed to a rejected image
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BootError {
    /// A register or memory access did not complete
    Access { addr: RvAddr, response: CpuResponse },

    /// The accelerator was still busy when the poll bound ran out
    Timeout { cycles: u64 },
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Access { addr, response } => {
                write!(f, "access to {:#010x} failed: {:?}", addr, response)
            }
            BootError::Timeout { cycles } => {
                write!(f, "crypto accelerator still busy after {} cycles", cycles)
            }
        }
    }
}

impl std::error::Error for BootError {}

const CRYPTO_CTRL: RvAddr = SocRootBus::CRYPTO_BASE;
const CRYPTO_STATUS: RvAddr = SocRootBus::CRYPTO_BASE + 0x04;
const CRYPTO_MODE: RvAddr = SocRootBus::CRYPTO_BASE + 0x08;
const CRYPTO_MSG_ADDR: RvAddr = SocRootBus::CRYPTO_BASE + 0x0C;
const CRYPTO_MSG_LEN: RvAddr = SocRootBus::CRYPTO_BASE + 0x10;
const CRYPTO_KEY: RvAddr = SocRootBus::CRYPTO_BASE + 0x14;
const CRYPTO_HASH: RvAddr = SocRootBus::CRYPTO_BASE + 0x40;

const CTRL_START: RvData = 1;

/// Boot-time signature check, executed as machine mode
pub struct SecureBoot {
    key: [u8; 32],
    max_cycles: u64,
}

impl SecureBoot {
    /// `max_cycles` bounds both the accelerator poll and any single stalled
    /// memory access.
    pub fn new(key: [u8; 32], max_cycles: u64) -> Self {
        Self { key, max_cycles }
    }

    /// Verify the firmware image. A rejected image halts `soc`.
    pub fn run(&self, soc: &mut Soc) -> Result<BootVerdict, BootError> {
        let header = self.read_header(soc)?;
        if header.magic != FW_HEADER_MAGIC {
            return Ok(Self::halt(soc, HaltReason::BadMagic(header.magic)));
        }

        for (i, chunk) in self.key.chunks_exact(4).enumerate() {
            let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.write_reg(soc, CRYPTO_KEY + 4 * i as RvAddr, word)?;
        }
        self.write_reg(soc, CRYPTO_MODE, MODE_HMAC_SHA256)?;
        self.write_reg(soc, CRYPTO_MSG_ADDR, FW_BASE)?;
        self.write_reg(soc, CRYPTO_MSG_LEN, FW_SIGNED_LEN as u32)?;
        self.write_reg(soc, CRYPTO_CTRL, CTRL_START)?;
        log::debug!("boot: verifying {:#x} bytes at {:#010x}", FW_SIGNED_LEN, FW_BASE);

        let mut cycles = 0;
        let status = loop {
            let status = LocalRegisterCopy::<u32, CryptoStatus::Register>::new(
                self.read_reg(soc, CRYPTO_STATUS)?,
            );
            if !status.is_set(CryptoStatus::BUSY) {
                break status;
            }
            if cycles >= self.max_cycles {
                return Err(BootError::Timeout { cycles });
            }
            soc.tick();
            cycles += 1;
        };

        if status.is_set(CryptoStatus::ERROR) || !status.is_set(CryptoStatus::DONE) {
            return Ok(Self::halt(soc, HaltReason::CryptoError));
        }

        let mut digest = [0u8; 32];
        for (i, chunk) in digest.chunks_exact_mut(4).enumerate() {
            let word = self.read_reg(soc, CRYPTO_HASH + 4 * i as RvAddr)?;
            chunk.copy_from_slice(&word.to_be_bytes());
        }

        if digest != header.signature {
            return Ok(Self::halt(soc, HaltReason::SignatureMismatch));
        }

        log::info!(
            "boot: firmware v{} verified in {} cycles, entry {:#010x}",
            header.version,
            cycles,
            header.entry_point
        );
        Ok(BootVerdict::Verified {
            version: header.version,
            entry_point: header.entry_point,
        })
    }

    /// Read the header through the CPU path.
    pub fn read_header(&self, soc: &mut Soc) -> Result<FirmwareHeader, BootError> {
        let base = FW_BASE + FW_HEADER_OFFSET as RvAddr;
        let mut header = FirmwareHeader::default();
        for (i, chunk) in header.as_bytes_mut().chunks_exact_mut(4).enumerate() {
            let word = self.read_reg(soc, base + 4 * i as RvAddr)?;
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(header)
    }

    fn halt(soc: &mut Soc, reason: HaltReason) -> BootVerdict {
        log::info!("boot: halted, {}", reason);
        soc.halt();
        BootVerdict::Halted(reason)
    }

    fn read_reg(&self, soc: &mut Soc, addr: RvAddr) -> Result<RvData, BootError> {
        match soc.read_word_blocking(PrivMode::Machine, addr, self.max_cycles) {
            CpuResponse::Data(word) => Ok(word),
            response => Err(BootError::Access { addr, response }),
        }
    }

    fn write_reg(&self, soc: &mut Soc, addr: RvAddr, val: RvData) -> Result<(), BootError> {
        match soc.cpu_access(BusAccess::write(PrivMode::Machine, RvSize::Word, addr, val)) {
            CpuResponse::Done => Ok(()),
            response => Err(BootError::Access { addr, response }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SocArgs;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    const KEY: [u8; 32] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE,
        0xFF, 0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0xFE, 0xDC, 0xBA, 0x98, 0x76, 0x54,
        0x32, 0x10,
    ];

    const BOOT_CYCLES: u64 = 1_000_000;

    fn sign(image: &mut [u8], key: &[u8; 32]) {
        let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
        mac.update(&image[..FW_SIGNED_LEN]);
        let sig = mac.finalize().into_bytes();
        image[FW_HEADER_OFFSET + FirmwareHeader::SIGNATURE_OFFSET..].copy_from_slice(&sig);
    }

    fn signed_image(code: &[u8], version: u32, key: &[u8; 32]) -> Vec<u8> {
        let mut image = vec![0u8; FW_HEADER_OFFSET + FirmwareHeader::SIZE];
        image[..code.len()].copy_from_slice(code);
        let header = FirmwareHeader {
            magic: FW_HEADER_MAGIC,
            version,
            length: FW_HEADER_OFFSET as u32,
            entry_point: FW_BASE,
            timestamp: 0x6500_0000,
            ..Default::default()
        };
        image[FW_HEADER_OFFSET..].copy_from_slice(header.as_bytes());
        sign(&mut image, key);
        image
    }

    fn boot(image: Vec<u8>, key: [u8; 32]) -> (Soc, Result<BootVerdict, BootError>) {
        let mut soc = Soc::new(SocArgs {
            firmware: image,
            ..Default::default()
        })
        .unwrap();
        let verdict = SecureBoot::new(key, BOOT_CYCLES).run(&mut soc);
        (soc, verdict)
    }

    #[test]
    fn test_header_layout() {
        assert_eq!(std::mem::size_of::<FirmwareHeader>(), FirmwareHeader::SIZE);
        assert_eq!(FW_SIGNED_LEN, 0xFFE0);
        let header = FirmwareHeader {
            magic: FW_HEADER_MAGIC,
            ..Default::default()
        };
        assert_eq!(&header.as_bytes()[..4], &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn test_verified_boot() {
        let image = signed_image(b"\x6f\x00\x00\x00firmware", 3, &KEY);
        let (soc, verdict) = boot(image, KEY);
        assert_eq!(
            verdict,
            Ok(BootVerdict::Verified {
                version: 3,
                entry_point: FW_BASE,
            })
        );
        assert!(!soc.is_halted());
        assert!(!soc.trap());
    }

    #[test]
    fn test_tampered_code_halts() {
        let mut image = signed_image(b"genuine firmware", 1, &KEY);
        image[0x100] ^= 0x01;
        let (soc, verdict) = boot(image, KEY);
        assert_eq!(verdict, Ok(BootVerdict::Halted(HaltReason::SignatureMismatch)));
        assert!(soc.is_halted());
    }

    #[test]
    fn test_tampered_header_halts() {
        let mut image = signed_image(b"genuine firmware", 1, &KEY);
        // Version is covered by the signature
        image[FW_HEADER_OFFSET + 4] = 9;
        let (_, verdict) = boot(image, KEY);
        assert_eq!(verdict, Ok(BootVerdict::Halted(HaltReason::SignatureMismatch)));
    }

    #[test]
    fn test_wrong_key_halts() {
        let image = signed_image(b"genuine firmware", 1, &KEY);
        let mut other = KEY;
        other[31] ^= 0x80;
        let (_, verdict) = boot(image, other);
        assert_eq!(verdict, Ok(BootVerdict::Halted(HaltReason::SignatureMismatch)));
    }

    #[test]
    fn test_bad_magic_halts() {
        let (soc, verdict) = boot(vec![0u8; 16], KEY);
        assert_eq!(verdict, Ok(BootVerdict::Halted(HaltReason::BadMagic(0))));
        assert!(soc.is_halted());
    }

    #[test]
    fn test_poll_bound() {
        let image = signed_image(b"genuine firmware", 1, &KEY);
        let mut soc = Soc::new(SocArgs {
            firmware: image,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            SecureBoot::new(KEY, 100).run(&mut soc),
            Err(BootError::Timeout { cycles: 100 })
        );
        assert!(!soc.is_halted());
        assert_eq!(
            BootError::Timeout { cycles: 100 }.to_string(),
            "crypto accelerator still busy after 100 cycles"
        );
    }

    #[test]
    fn test_read_header() {
        let image = signed_image(b"", 0x0102_0304, &KEY);
        let mut soc = Soc::new(SocArgs {
            firmware: image,
            ..Default::default()
        })
        .unwrap();
        let header = SecureBoot::new(KEY, 10).read_header(&mut soc).unwrap();
        assert_eq!(header.magic, FW_HEADER_MAGIC);
        assert_eq!(header.version, 0x0102_0304);
        assert_eq!(header.entry_point, FW_BASE);
        assert_ne!(header.signature, [0; 32]);
    }
}
