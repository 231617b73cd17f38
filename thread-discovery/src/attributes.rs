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

//! MeshCoP TXT record parsing

use crate::{BorderAgentInfo, ResolvedService, ServiceDescriptor};
use std::collections::BTreeMap;
use thread_common::{ExtendedPanId, IdentifierError};

/// TXT key carrying the Border Agent discriminator
pub const KEY_DISCRIMINATOR: &str = "discriminator";
/// TXT key carrying the network name
pub const KEY_NETWORK_NAME: &str = "nn";
/// TXT key carrying the raw 8-byte extended PAN ID
pub const KEY_EXTENDED_PAN_ID: &str = "xp";

/// Errors decoding Border Agent TXT attributes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    /// `xp` is present but not 8 bytes
    #[error("Invalid extended PAN ID: {0}")]
    InvalidExtendedPanId(#[from] IdentifierError),

    /// A text attribute is not UTF-8
    #[error("TXT key {key:?} is not valid UTF-8")]
    InvalidUtf8 { key: String },
}

/// DNS-SD TXT records
///
/// Keys are case-insensitive and stored lowercased. Values are raw bytes,
/// since `xp` is binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxtRecords(BTreeMap<String, Vec<u8>>);

impl TxtRecords {
    /// Empty record set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, key: &str, value: impl Into<Vec<u8>>) {
        self.0.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Raw value of `key`
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.0.get(&key.to_ascii_lowercase()).map(Vec::as_slice)
    }

    /// Value of `key` as text
    ///
    /// # Errors
    ///
    /// Returns `AttributeError::InvalidUtf8` if the value is not UTF-8.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>, AttributeError> {
        self.get(key)
            .map(|value| {
                core::str::from_utf8(value).map_err(|_| AttributeError::InvalidUtf8 {
                    key: key.to_string(),
                })
            })
            .transpose()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Discriminator entry, if present and non-empty
    pub fn discriminator(&self) -> Option<String> {
        self.get_str(KEY_DISCRIMINATOR)
            .ok()
            .flatten()
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}

impl<K: AsRef<str>, V: Into<Vec<u8>>> FromIterator<(K, V)> for TxtRecords {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut records = Self::new();
        for (key, value) in iter {
            records.insert(key.as_ref(), value);
        }
        records
    }
}

/// Decode a resolved `_meshcop._udp` service into a [`BorderAgentInfo`]
///
/// Returns `Ok(None)` when `nn` or `xp` is missing: such a service cannot be
/// tied to a Thread network and is skipped. The discriminator falls back to the
/// host address when the TXT key is absent.
///
/// # Errors
///
/// Returns `AttributeError` if `xp` is not 8 bytes or `nn` is not UTF-8.
pub fn parse_border_agent(
    service: &ResolvedService,
) -> Result<Option<BorderAgentInfo>, AttributeError> {
    let Some(network_name) = service.txt.get_str(KEY_NETWORK_NAME)? else {
        return Ok(None);
    };
    let Some(xp) = service.txt.get(KEY_EXTENDED_PAN_ID) else {
        return Ok(None);
    };
    let extended_pan_id = ExtendedPanId::from_slice(xp)?;

    let discriminator = service
        .txt
        .discriminator()
        .unwrap_or_else(|| service.host.to_string());

    Ok(Some(BorderAgentInfo {
        discriminator,
        instance_name: service.instance_name.clone(),
        network_name: network_name.to_string(),
        extended_pan_id,
        host: service.host,
        port: service.port,
        pskc: None,
    }))
}

/// Discriminator of a browse-level descriptor: TXT first, then host address
pub fn discriminator_of(descriptor: &ServiceDescriptor) -> Option<String> {
    descriptor
        .txt
        .as_ref()
        .and_then(TxtRecords::discriminator)
        .or_else(|| descriptor.host.map(|host| host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const XP: [u8; 8] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];

    fn service() -> ResolvedService {
        ResolvedService::new("OpenThread BR #1", "192.168.1.10".parse().unwrap(), 49154)
    }

    #[test]
    fn test_parse_full_record() {
        let svc = service()
            .with_txt("nn", "Net1")
            .with_txt("xp", XP)
            .with_txt("discriminator", "B");
        let info = parse_border_agent(&svc).unwrap().unwrap();
        assert_eq!(info.discriminator, "B");
        assert_eq!(info.network_name, "Net1");
        assert_eq!(info.extended_pan_id.to_hex(), "1122334455667788");
        assert_eq!(info.port, 49154);
        assert_eq!(info.instance_name, "OpenThread BR #1");
        assert!(info.pskc.is_none());
    }

    #[test]
    fn test_discriminator_defaults_to_host() {
        let svc = service().with_txt("nn", "Net1").with_txt("xp", XP);
        let info = parse_border_agent(&svc).unwrap().unwrap();
        assert_eq!(info.discriminator, "192.168.1.10");

        let svc = service()
            .with_txt("nn", "Net1")
            .with_txt("xp", XP)
            .with_txt("discriminator", "");
        let info = parse_border_agent(&svc).unwrap().unwrap();
        assert_eq!(info.discriminator, "192.168.1.10");
    }

    #[test]
    fn test_missing_identity_keys_are_skipped() {
        assert_eq!(parse_border_agent(&service()).unwrap(), None);
        let svc = service().with_txt("nn", "Net1");
        assert_eq!(parse_border_agent(&svc).unwrap(), None);
        let svc = service().with_txt("xp", XP);
        assert_eq!(parse_border_agent(&svc).unwrap(), None);
    }

    #[test]
    fn test_bad_values_are_errors() {
        let svc = service().with_txt("nn", "Net1").with_txt("xp", &XP[..4]);
        assert!(matches!(
            parse_border_agent(&svc),
            Err(AttributeError::InvalidExtendedPanId(_))
        ));

        let svc = service()
            .with_txt("nn", vec![0xff, 0xfe])
            .with_txt("xp", XP);
        assert!(matches!(
            parse_border_agent(&svc),
            Err(AttributeError::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let txt: TxtRecords = [("NN", b"Net1".to_vec()), ("Xp", XP.to_vec())]
            .into_iter()
            .collect();
        assert_eq!(txt.get_str("nn").unwrap(), Some("Net1"));
        assert_eq!(txt.get("XP"), Some(&XP[..]));
        assert_eq!(txt.len(), 2);
    }

    #[test]
    fn test_descriptor_discriminator() {
        let desc = ServiceDescriptor::new("BR", crate::MESHCOP_SERVICE_TYPE);
        assert_eq!(discriminator_of(&desc), None);

        let desc = desc.with_host("fd00::1".parse().unwrap());
        assert_eq!(discriminator_of(&desc).as_deref(), Some("fd00::1"));

        let txt: TxtRecords = [("discriminator", "A")].into_iter().collect();
        let desc = desc.with_txt(txt);
        assert_eq!(discriminator_of(&desc).as_deref(), Some("A"));
    }
}
