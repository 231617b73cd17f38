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

//! Joiner steering data
//!
//! The commissioner dataset carries a small bloom filter of joiner IDs. Each
//! joiner sets two bits: one at `CRC16-CCITT(joiner_id) % bits` and one at
//! `CRC16-ANSI(joiner_id) % bits`, counted from the last byte.

use core::fmt;
use sha2::{Digest, Sha256};

/// Maximum steering data length in bytes
pub const MAX_STEERING_DATA_LEN: usize = 16;

const CRC16_CCITT_POLY: u16 = 0x1021;
const CRC16_ANSI_POLY: u16 = 0x8005;

/// Joiner ID: the first 8 bytes of SHA-256(EUI-64) with the local bit set
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinerId([u8; 8]);

impl JoinerId {
    /// Compute the joiner ID of a device from its factory EUI-64
    pub fn from_eui64(eui64: [u8; 8]) -> Self {
        let digest = Sha256::digest(eui64);
        let mut id = [0u8; 8];
        id.copy_from_slice(&digest[..8]);
        id[0] |= 0x02;
        Self(id)
    }

    /// Wrap a joiner ID reported by the commissioner
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Debug for JoinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JoinerId({self})")
    }
}

impl fmt::Display for JoinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

/// Steering data bloom filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteeringData(Vec<u8>);

impl SteeringData {
    /// Empty filter of `len` bytes, clamped to 1..=16
    pub fn new(len: usize) -> Self {
        Self(vec![0; len.clamp(1, MAX_STEERING_DATA_LEN)])
    }

    /// Filter that admits every joiner (a single `0xFF` byte)
    pub fn allow_all() -> Self {
        Self(vec![0xFF])
    }

    /// Filter that admits exactly the given joiners (plus false positives)
    pub fn for_joiners<'a>(joiners: impl IntoIterator<Item = &'a JoinerId>) -> Self {
        let mut steering = Self::new(MAX_STEERING_DATA_LEN);
        for joiner in joiners {
            steering.add(joiner);
        }
        steering
    }

    /// Add a joiner to the filter
    pub fn add(&mut self, joiner: &JoinerId) {
        let (ccitt, ansi) = self.bit_positions(joiner);
        self.set_bit(ccitt);
        self.set_bit(ansi);
    }

    /// Whether a joiner passes the filter
    pub fn contains(&self, joiner: &JoinerId) -> bool {
        let (ccitt, ansi) = self.bit_positions(joiner);
        self.bit(ccitt) && self.bit(ansi)
    }

    /// Encoded bytes, as carried in the Steering Data TLV
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn bit_positions(&self, joiner: &JoinerId) -> (usize, usize) {
        let bits = self.0.len() * 8;
        let ccitt = usize::from(crc16(joiner.as_bytes(), CRC16_CCITT_POLY)) % bits;
        let ansi = usize::from(crc16(joiner.as_bytes(), CRC16_ANSI_POLY)) % bits;
        (ccitt, ansi)
    }

    fn byte_index(&self, bit: usize) -> usize {
        self.0.len() - 1 - bit / 8
    }

    fn set_bit(&mut self, bit: usize) {
        let index = self.byte_index(bit);
        self.0[index] |= 1 << (bit % 8);
    }

    fn bit(&self, bit: usize) -> bool {
        self.0[self.byte_index(bit)] & (1 << (bit % 8)) != 0
    }
}

/// MSB-first CRC16 with zero initial value
fn crc16(data: &[u8], poly: u16) -> u16 {
    data.iter().fold(0u16, |crc, &byte| {
        (0..8).fold(crc ^ (u16::from(byte) << 8), |crc, _| {
            if crc & 0x8000 != 0 {
                (crc << 1) ^ poly
            } else {
                crc << 1
            }
        })
    })
}
