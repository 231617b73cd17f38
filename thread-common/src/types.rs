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

//! Fixed-size Thread identifiers.

use crate::IdentifierError;
use core::fmt;
use core::str::FromStr;

/// Length of an extended PAN ID in bytes
pub const EXTENDED_PAN_ID_LEN: usize = 8;

/// Length of a PSKc in bytes
pub const PSKC_LEN: usize = 16;

/// Maximum length of a Thread network name in bytes
pub const MAX_NETWORK_NAME_LEN: usize = 16;

/// Extended PAN ID of a Thread network
///
/// Together with the network name this is the identity of a Thread network:
/// two Border Agents advertising the same pair front the same mesh.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtendedPanId([u8; EXTENDED_PAN_ID_LEN]);

impl ExtendedPanId {
    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; EXTENDED_PAN_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, as found in the `xp` TXT record
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError::InvalidLength` unless the slice is exactly 8 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentifierError> {
        let arr: [u8; EXTENDED_PAN_ID_LEN] =
            bytes
                .try_into()
                .map_err(|_| IdentifierError::InvalidLength {
                    expected: EXTENDED_PAN_ID_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Parse from a hex string (e.g. `1122334455667788`)
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not 16 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, IdentifierError> {
        let bytes = hex::decode(s).map_err(|e| IdentifierError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Raw bytes
    pub const fn as_bytes(&self) -> &[u8; EXTENDED_PAN_ID_LEN] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ExtendedPanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ExtendedPanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtendedPanId({})", self.to_hex())
    }
}

impl FromStr for ExtendedPanId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<u64> for ExtendedPanId {
    fn from(value: u64) -> Self {
        Self(value.to_be_bytes())
    }
}

/// Pre-shared key for the commissioner (PSKc)
///
/// Derived from the commissioning password and the network identity, and
/// required to petition a Border Agent. The `Debug` output is redacted.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pskc([u8; PSKC_LEN]);

impl Pskc {
    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; PSKC_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError::InvalidLength` unless the slice is exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentifierError> {
        let arr: [u8; PSKC_LEN] = bytes
            .try_into()
            .map_err(|_| IdentifierError::InvalidLength {
                expected: PSKC_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Parse from a 32-character hex string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex of the right length.
    pub fn from_hex(s: &str) -> Result<Self, IdentifierError> {
        let bytes = hex::decode(s).map_err(|e| IdentifierError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Raw bytes
    pub const fn as_bytes(&self) -> &[u8; PSKC_LEN] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Pskc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pskc(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_pan_id_hex() {
        let xpanid: ExtendedPanId = "1122334455667788".parse().unwrap();
        assert_eq!(
            xpanid.as_bytes(),
            &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]
        );
        assert_eq!(xpanid.to_string(), "1122334455667788");
        assert_eq!(xpanid, ExtendedPanId::from(0x1122_3344_5566_7788_u64));
    }

    #[test]
    fn test_extended_pan_id_wrong_length() {
        let err = ExtendedPanId::from_slice(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            IdentifierError::InvalidLength {
                expected: 8,
                actual: 3
            }
        );
        assert!(matches!(
            ExtendedPanId::from_hex("zz"),
            Err(IdentifierError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_pskc_debug_is_redacted() {
        let pskc = Pskc::from_bytes([0xAB; 16]);
        assert_eq!(format!("{pskc:?}"), "Pskc(..)");
        assert_eq!(pskc.to_hex(), "ab".repeat(16));
    }

    #[test]
    fn test_pskc_from_hex() {
        let pskc = Pskc::from_hex("c3f59368445a1b6106be420a706d4cc9").unwrap();
        assert_eq!(pskc.as_bytes()[0], 0xc3);
        assert!(Pskc::from_hex("c3f5").is_err());
    }
}
