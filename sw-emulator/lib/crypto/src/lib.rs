/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Secure SoC Emulator Crypto library.

--*/

mod hmac256;
mod sha256;

pub use hmac256::hmac_sha256;
pub use hmac256::sha256;
pub use hmac256::{Fetch, HashMode, HmacEngine, HmacEvent, HmacPhase, HmacRequest, MessagePort};

pub use sha256::Sha256Engine;
pub use sha256::Sha256State;
