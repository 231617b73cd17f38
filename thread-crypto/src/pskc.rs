// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! PSKc derivation
//!
//! ```text
//! PSKc = PBKDF2(PRF = AES-CMAC-PRF-128,
//!               P   = passphrase,
//!               S   = "Thread" || extended PAN ID || network name,
//!               c   = 16384,
//!               dkLen = 128 bits)
//! ```
//!
//! AES-CMAC-PRF-128 (RFC 4615) accepts keys of any length: a key that is not
//! exactly 16 bytes is first compressed with AES-CMAC under the all-zero key.
//! The compressed key is computed once and then used for every PBKDF2 round.

use aes::Aes128;
use cmac::{Cmac, Mac};
use thread_common::{ExtendedPanId, Pskc, MAX_NETWORK_NAME_LEN, PSKC_LEN};
use tracing::trace;

type AesCmac = Cmac<Aes128>;

/// PBKDF2 iteration count mandated for Thread PSKc
pub const PSKC_ITERATIONS: u32 = 16384;

const SALT_PREFIX: &[u8] = b"Thread";
const MIN_PASSPHRASE_LEN: usize = 6;
const MAX_PASSPHRASE_LEN: usize = 255;
const AES_KEY_LEN: usize = 16;

/// PSKc derivation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PskcError {
    /// Passphrase outside 6..=255 bytes
    #[error("passphrase must be 6..=255 bytes, got {0}")]
    InvalidPassphraseLength(usize),

    /// Network name longer than 16 bytes
    #[error("network name must be at most 16 bytes, got {0}")]
    NetworkNameTooLong(usize),

    /// The PRF rejected its key or output length
    #[error("PRF failure: {0}")]
    Prf(String),
}

/// Derive the PSKc for a Thread network
///
/// Pure and deterministic: the same inputs always produce the same 16 bytes.
///
/// # Errors
///
/// Returns `PskcError::InvalidPassphraseLength` or `PskcError::NetworkNameTooLong`
/// for inputs Thread does not allow.
///
/// # Example
///
/// ```
/// use thread_common::ExtendedPanId;
/// use thread_crypto::derive_pskc;
///
/// let xpanid = ExtendedPanId::from_hex("0001020304050607").unwrap();
/// let pskc = derive_pskc("12SECRETPASSWORD34", "Test Network", &xpanid).unwrap();
/// assert_eq!(pskc.to_hex(), "c3f59368445a1b6106be420a706d4cc9");
/// ```
pub fn derive_pskc(
    passphrase: &str,
    network_name: &str,
    extended_pan_id: &ExtendedPanId,
) -> Result<Pskc, PskcError> {
    let passphrase = passphrase.as_bytes();
    if !(MIN_PASSPHRASE_LEN..=MAX_PASSPHRASE_LEN).contains(&passphrase.len()) {
        return Err(PskcError::InvalidPassphraseLength(passphrase.len()));
    }
    let network_name = network_name.as_bytes();
    if network_name.len() > MAX_NETWORK_NAME_LEN {
        return Err(PskcError::NetworkNameTooLong(network_name.len()));
    }

    let mut salt = Vec::with_capacity(SALT_PREFIX.len() + 8 + network_name.len());
    salt.extend_from_slice(SALT_PREFIX);
    salt.extend_from_slice(extended_pan_id.as_bytes());
    salt.extend_from_slice(network_name);

    let key = prf_key(passphrase)?;
    let mut out = [0u8; PSKC_LEN];
    pbkdf2::pbkdf2::<AesCmac>(&key, &salt, PSKC_ITERATIONS, &mut out)
        .map_err(|e| PskcError::Prf(e.to_string()))?;

    trace!(
        extended_pan_id = %extended_pan_id,
        network_name_len = network_name.len(),
        "derived PSKc"
    );
    Ok(Pskc::from_bytes(out))
}

/// Key preparation step of AES-CMAC-PRF-128 (RFC 4615 section 3)
fn prf_key(key: &[u8]) -> Result<[u8; AES_KEY_LEN], PskcError> {
    if let Ok(exact) = <[u8; AES_KEY_LEN]>::try_from(key) {
        return Ok(exact);
    }
    let mut mac = <AesCmac as Mac>::new_from_slice(&[0u8; AES_KEY_LEN])
        .map_err(|e| PskcError::Prf(e.to_string()))?;
    mac.update(key);
    Ok(mac.finalize().into_bytes().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xpanid() -> ExtendedPanId {
        ExtendedPanId::from_bytes([0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07])
    }

    #[test]
    fn test_thread_spec_vector() {
        let pskc = derive_pskc("12SECRETPASSWORD34", "Test Network", &xpanid()).unwrap();
        assert_eq!(pskc.to_hex(), "c3f59368445a1b6106be420a706d4cc9");
    }

    #[test]
    fn test_deterministic() {
        let a = derive_pskc("123456", "Net1", &xpanid()).unwrap();
        let b = derive_pskc("123456", "Net1", &xpanid()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_inputs_change_output() {
        let base = derive_pskc("123456", "Net1", &xpanid()).unwrap();
        assert_ne!(base, derive_pskc("654321", "Net1", &xpanid()).unwrap());
        assert_ne!(base, derive_pskc("123456", "Net2", &xpanid()).unwrap());
        assert_ne!(
            base,
            derive_pskc("123456", "Net1", &ExtendedPanId::from(1u64)).unwrap()
        );
    }

    #[test]
    fn test_sixteen_byte_passphrase_used_directly() {
        // A 16-byte key skips the CMAC compression step
        let key = prf_key(b"0123456789abcdef").unwrap();
        assert_eq!(&key, b"0123456789abcdef");
        assert!(derive_pskc("0123456789abcdef", "Net1", &xpanid()).is_ok());
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert_eq!(
            derive_pskc("12345", "Net1", &xpanid()),
            Err(PskcError::InvalidPassphraseLength(5))
        );
        assert_eq!(
            derive_pskc(&"x".repeat(256), "Net1", &xpanid()),
            Err(PskcError::InvalidPassphraseLength(256))
        );
        assert_eq!(
            derive_pskc("123456", "a-network-name-that-is-long", &xpanid()),
            Err(PskcError::NetworkNameTooLong(27))
        );
    }
}
