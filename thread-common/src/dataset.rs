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

//! Active Operational Dataset

use crate::tlv::{self, TlvType};
use crate::{ExtendedPanId, Pskc, TlvError};

/// Network credential retrieved from a Border Agent
///
/// Wraps the encoded Active Operational Dataset (a MeshCoP TLV blob). The
/// blob is validated on construction and never modified afterwards; the
/// accessors decode individual fields on demand.
///
/// Unknown TLVs are kept as-is so the credential can be handed back to a
/// Thread stack byte-for-byte.
#[derive(Clone, PartialEq, Eq)]
pub struct ThreadNetworkCredential {
    tlvs: Vec<u8>,
}

impl ThreadNetworkCredential {
    /// Wrap an encoded dataset
    ///
    /// # Errors
    ///
    /// Returns `TlvError::Empty` for an empty blob and `TlvError::Truncated`
    /// if the TLV framing is broken.
    pub fn from_tlvs(tlvs: Vec<u8>) -> Result<Self, TlvError> {
        if tlvs.is_empty() {
            return Err(TlvError::Empty);
        }
        tlv::validate(&tlvs)?;
        Ok(Self { tlvs })
    }

    /// Parse a hex-encoded dataset, as printed by `ot-ctl dataset active -x`
    ///
    /// # Errors
    ///
    /// Returns `TlvError::InvalidHex` or any framing error from [`Self::from_tlvs`].
    pub fn from_hex(s: &str) -> Result<Self, TlvError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TlvError::InvalidHex(e.to_string()))?;
        Self::from_tlvs(bytes)
    }

    /// Encoded dataset
    pub fn as_tlvs(&self) -> &[u8] {
        &self.tlvs
    }

    /// Consume and return the encoded dataset
    pub fn into_tlvs(self) -> Vec<u8> {
        self.tlvs
    }

    /// Lowercase hex encoding of the dataset
    pub fn to_hex(&self) -> String {
        hex::encode(&self.tlvs)
    }

    fn field(&self, kind: TlvType) -> Option<&[u8]> {
        tlv::find(&self.tlvs, kind)
    }

    fn fixed<const N: usize>(&self, kind: TlvType) -> Option<[u8; N]> {
        self.field(kind).and_then(|v| v.try_into().ok())
    }

    /// Channel page
    pub fn channel_page(&self) -> Option<u8> {
        self.fixed::<3>(TlvType::Channel).map(|v| v[0])
    }

    /// Channel number
    pub fn channel(&self) -> Option<u16> {
        self.fixed::<3>(TlvType::Channel)
            .map(|v| u16::from_be_bytes([v[1], v[2]]))
    }

    /// PAN ID
    pub fn pan_id(&self) -> Option<u16> {
        self.fixed::<2>(TlvType::PanId).map(u16::from_be_bytes)
    }

    /// Extended PAN ID
    pub fn extended_pan_id(&self) -> Option<ExtendedPanId> {
        self.fixed::<8>(TlvType::ExtendedPanId)
            .map(ExtendedPanId::from_bytes)
    }

    /// Network name, if present and valid UTF-8
    pub fn network_name(&self) -> Option<&str> {
        self.field(TlvType::NetworkName)
            .and_then(|v| core::str::from_utf8(v).ok())
    }

    /// PSKc
    pub fn pskc(&self) -> Option<Pskc> {
        self.fixed::<16>(TlvType::Pskc).map(Pskc::from_bytes)
    }

    /// Network key
    pub fn network_key(&self) -> Option<[u8; 16]> {
        self.fixed(TlvType::NetworkKey)
    }

    /// Mesh-local prefix (the upper 64 bits of the mesh-local /64)
    pub fn mesh_local_prefix(&self) -> Option<[u8; 8]> {
        self.fixed(TlvType::MeshLocalPrefix)
    }

    /// Seconds part of the active timestamp
    pub fn active_timestamp_seconds(&self) -> Option<u64> {
        self.fixed::<8>(TlvType::ActiveTimestamp)
            .map(|v| u64::from_be_bytes(v) >> 16)
    }
}

impl core::fmt::Debug for ThreadNetworkCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadNetworkCredential")
            .field("network_name", &self.network_name())
            .field("extended_pan_id", &self.extended_pan_id())
            .field("channel", &self.channel())
            .field("pan_id", &self.pan_id())
            .field("len", &self.tlvs.len())
            .finish_non_exhaustive()
    }
}

/// Builds a dataset blob field by field
///
/// Mostly useful for tests and simulated backends.
#[derive(Debug, Default, Clone)]
pub struct DatasetBuilder {
    tlvs: Vec<u8>,
}

impl DatasetBuilder {
    /// Start an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    // Every field written here is at most 16 bytes, so the short length form applies
    fn push(mut self, kind: TlvType, value: &[u8]) -> Self {
        self.tlvs.push(kind.code());
        self.tlvs.push(value.len() as u8);
        self.tlvs.extend_from_slice(value);
        self
    }

    pub fn active_timestamp(self, seconds: u64) -> Self {
        self.push(TlvType::ActiveTimestamp, &(seconds << 16).to_be_bytes())
    }

    pub fn channel(self, page: u8, channel: u16) -> Self {
        let [hi, lo] = channel.to_be_bytes();
        self.push(TlvType::Channel, &[page, hi, lo])
    }

    pub fn pan_id(self, pan_id: u16) -> Self {
        self.push(TlvType::PanId, &pan_id.to_be_bytes())
    }

    pub fn extended_pan_id(self, xpanid: ExtendedPanId) -> Self {
        self.push(TlvType::ExtendedPanId, xpanid.as_bytes())
    }

    /// Network name; truncated to 16 bytes
    pub fn network_name(self, name: &str) -> Self {
        let bytes = name.as_bytes();
        let len = bytes.len().min(crate::MAX_NETWORK_NAME_LEN);
        self.push(TlvType::NetworkName, &bytes[..len])
    }

    pub fn pskc(self, pskc: Pskc) -> Self {
        self.push(TlvType::Pskc, pskc.as_bytes())
    }

    pub fn network_key(self, key: [u8; 16]) -> Self {
        self.push(TlvType::NetworkKey, &key)
    }

    pub fn mesh_local_prefix(self, prefix: [u8; 8]) -> Self {
        self.push(TlvType::MeshLocalPrefix, &prefix)
    }

    /// Finish the dataset
    ///
    /// # Errors
    ///
    /// Returns `TlvError::Empty` if no field was set.
    pub fn build(self) -> Result<ThreadNetworkCredential, TlvError> {
        ThreadNetworkCredential::from_tlvs(self.tlvs)
    }
}
