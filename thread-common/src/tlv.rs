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

//! MeshCoP TLV framing
//!
//! Each TLV is `type (1 byte) | length (1 byte) | value`. A length byte of
//! `0xFF` means an extended TLV whose real length follows as a big-endian u16.

use crate::TlvError;

/// Length byte announcing an extended (u16) length
const EXTENDED_LENGTH: u8 = 0xFF;

/// MeshCoP TLV types that appear in operational datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TlvType {
    Channel = 0,
    PanId = 1,
    ExtendedPanId = 2,
    NetworkName = 3,
    Pskc = 4,
    NetworkKey = 5,
    NetworkKeySequence = 6,
    MeshLocalPrefix = 7,
    SteeringData = 8,
    BorderAgentLocator = 9,
    CommissionerId = 10,
    CommissionerSessionId = 11,
    SecurityPolicy = 12,
    ActiveTimestamp = 14,
    JoinerUdpPort = 18,
    PendingTimestamp = 51,
    DelayTimer = 52,
    ChannelMask = 53,
}

impl TlvType {
    /// Wire value of this type
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// A borrowed TLV inside a dataset blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    /// Raw type byte (unknown types are preserved)
    pub kind: u8,
    /// Value bytes
    pub value: &'a [u8],
}

/// Iterator over the TLVs in a blob
///
/// Yields `Err(TlvError::Truncated)` once and then stops if the framing is broken.
pub struct TlvIter<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> TlvIter<'a> {
    /// Iterate over `data`
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            failed: false,
        }
    }

    fn read_next(&mut self) -> Result<Tlv<'a>, TlvError> {
        let start = self.offset;
        let truncated = TlvError::Truncated { offset: start };

        let header = self.data.get(start..start + 2).ok_or(truncated.clone())?;
        let kind = header[0];
        let (len, value_start) = if header[1] == EXTENDED_LENGTH {
            let ext = self
                .data
                .get(start + 2..start + 4)
                .ok_or(truncated.clone())?;
            (usize::from(u16::from_be_bytes([ext[0], ext[1]])), start + 4)
        } else {
            (usize::from(header[1]), start + 2)
        };

        let value = self
            .data
            .get(value_start..value_start + len)
            .ok_or(truncated)?;
        self.offset = value_start + len;
        Ok(Tlv { kind, value })
    }
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Result<Tlv<'a>, TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        let item = self.read_next();
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

/// Check that `data` is a well-formed sequence of TLVs
///
/// # Errors
///
/// Returns the first framing error found.
pub fn validate(data: &[u8]) -> Result<(), TlvError> {
    TlvIter::new(data).try_for_each(|tlv| tlv.map(|_| ()))
}

/// Find the first TLV of `kind`
///
/// Stops at the first framing error; callers validate the blob up front.
pub fn find(data: &[u8], kind: TlvType) -> Option<&[u8]> {
    TlvIter::new(data)
        .map_while(Result::ok)
        .find(|tlv| tlv.kind == kind.code())
        .map(|tlv| tlv.value)
}

/// Append a TLV to `out`, using the extended length form when needed
///
/// # Errors
///
/// Returns `TlvError::ValueTooLong` if the value exceeds `u16::MAX` bytes.
pub fn encode(out: &mut Vec<u8>, kind: u8, value: &[u8]) -> Result<(), TlvError> {
    out.push(kind);
    match u8::try_from(value.len()) {
        Ok(len) if len < EXTENDED_LENGTH => out.push(len),
        _ => {
            let len = u16::try_from(value.len())
                .map_err(|_| TlvError::ValueTooLong(value.len()))?;
            out.push(EXTENDED_LENGTH);
            out.extend_from_slice(&len.to_be_bytes());
        }
    }
    out.extend_from_slice(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterates_tlvs() {
        let data = [0x01, 0x02, 0xAB, 0xCD, 0x03, 0x01, b'x'];
        let tlvs: Vec<_> = TlvIter::new(&data).collect::<Result<_, _>>().unwrap();
        assert_eq!(tlvs.len(), 2);
        assert_eq!(tlvs[0].kind, 1);
        assert_eq!(tlvs[0].value, &[0xAB, 0xCD]);
        assert_eq!(tlvs[1].value, b"x");
    }

    #[test]
    fn test_truncated_value_is_reported_once() {
        let data = [0x01, 0x05, 0xAB];
        let mut iter = TlvIter::new(&data);
        assert_eq!(iter.next(), Some(Err(TlvError::Truncated { offset: 0 })));
        assert_eq!(iter.next(), None);
        assert!(validate(&data).is_err());
    }

    #[test]
    fn test_extended_length() {
        let value = vec![0x5A; 300];
        let mut out = Vec::new();
        encode(&mut out, 0x33, &value).unwrap();
        assert_eq!(&out[..4], &[0x33, 0xFF, 0x01, 0x2C]);

        let tlv = TlvIter::new(&out).next().unwrap().unwrap();
        assert_eq!(tlv.value.len(), 300);
    }

    #[test]
    fn test_find_skips_unknown_types() {
        let mut out = Vec::new();
        encode(&mut out, 0x80, &[1, 2, 3]).unwrap();
        encode(&mut out, TlvType::PanId.code(), &[0xFA, 0xCE]).unwrap();
        assert_eq!(find(&out, TlvType::PanId), Some(&[0xFA, 0xCE][..]));
        assert_eq!(find(&out, TlvType::Channel), None);
    }
}
