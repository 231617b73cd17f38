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

//! Native commissioner call contract

use crate::{CommissionerHandler, ErrorCode, LogSink, NativeError, TracingLogSink};
use async_trait::async_trait;
use core::fmt;
use core::net::IpAddr;
use core::ops::BitOr;
use std::sync::Arc;
use thread_common::tlv::{self, TlvType};
use thread_common::{ExtendedPanId, Pskc, TlvError};
use thread_crypto::SteeringData;

/// Default commissioner identity
pub const DEFAULT_COMMISSIONER_ID: &str = "thread-commission";
/// Default Thread domain name
pub const DEFAULT_DOMAIN_NAME: &str = "Thread";

/// Configuration passed to the native `init`
///
/// The PSKc is mandatory: a commissioner without one cannot petition.
#[derive(Clone)]
pub struct CommissionerConfig {
    /// Commissioner identity string
    pub id: String,
    /// Thread domain name
    pub domain_name: String,
    /// Commercial commissioning mode
    pub enable_ccm: bool,
    /// PSKc of the target network
    pub pskc: Pskc,
    /// Receives native log lines
    pub log_sink: Arc<dyn LogSink>,
}

impl CommissionerConfig {
    /// Non-CCM config with default identity and a `tracing` log sink
    pub fn new(pskc: Pskc) -> Self {
        Self {
            id: DEFAULT_COMMISSIONER_ID.to_string(),
            domain_name: DEFAULT_DOMAIN_NAME.to_string(),
            enable_ccm: false,
            pskc,
            log_sink: Arc::new(TracingLogSink),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = domain_name.into();
        self
    }

    pub fn with_ccm(mut self, enable: bool) -> Self {
        self.enable_ccm = enable;
        self
    }

    pub fn with_log_sink(mut self, log_sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }
}

impl fmt::Debug for CommissionerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommissionerConfig")
            .field("id", &self.id)
            .field("domain_name", &self.domain_name)
            .field("enable_ccm", &self.enable_ccm)
            .field("pskc", &self.pskc)
            .finish_non_exhaustive()
    }
}

/// Active Operational Dataset fields to request
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetFlags(u16);

impl DatasetFlags {
    pub const ACTIVE_TIMESTAMP: Self = Self(1 << 15);
    pub const CHANNEL: Self = Self(1 << 14);
    pub const CHANNEL_MASK: Self = Self(1 << 13);
    pub const EXTENDED_PAN_ID: Self = Self(1 << 12);
    pub const MESH_LOCAL_PREFIX: Self = Self(1 << 11);
    pub const NETWORK_KEY: Self = Self(1 << 10);
    pub const NETWORK_NAME: Self = Self(1 << 9);
    pub const PAN_ID: Self = Self(1 << 8);
    pub const PSKC: Self = Self(1 << 7);
    pub const SECURITY_POLICY: Self = Self(1 << 6);

    /// No fields
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every field
    pub const fn all() -> Self {
        Self(0xFFC0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DatasetFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for DatasetFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatasetFlags({:#06x})", self.0)
    }
}

/// Commissioner dataset: what joiners the commissioner admits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommissionerDataset {
    /// Commissioner session ID, assigned by the leader
    pub session_id: Option<u16>,
    /// RLOC16 of the Border Agent
    pub border_agent_locator: Option<u16>,
    /// Joiner bloom filter
    pub steering_data: Option<SteeringData>,
    /// UDP port joiners connect to
    pub joiner_udp_port: Option<u16>,
}

impl CommissionerDataset {
    /// Dataset that only sets steering data
    pub fn with_steering_data(steering_data: SteeringData) -> Self {
        Self {
            steering_data: Some(steering_data),
            ..Self::default()
        }
    }

    /// MeshCoP TLV encoding of the fields that are set
    pub fn to_tlvs(&self) -> Result<Vec<u8>, TlvError> {
        let mut out = Vec::new();
        if let Some(id) = self.session_id {
            tlv::encode(&mut out, TlvType::CommissionerSessionId.code(), &id.to_be_bytes())?;
        }
        if let Some(locator) = self.border_agent_locator {
            tlv::encode(&mut out, TlvType::BorderAgentLocator.code(), &locator.to_be_bytes())?;
        }
        if let Some(steering) = &self.steering_data {
            tlv::encode(&mut out, TlvType::SteeringData.code(), steering.as_bytes())?;
        }
        if let Some(port) = self.joiner_udp_port {
            tlv::encode(&mut out, TlvType::JoinerUdpPort.code(), &port.to_be_bytes())?;
        }
        Ok(out)
    }
}

/// Native commissioner library
///
/// One instance backs one commissioning session at a time; see
/// [`Commissioner`](crate::Commissioner). Every call reports failure as a
/// [`NativeError`] carrying the library's own code and message.
#[async_trait]
pub trait CommissionerBackend: Send + Sync + 'static {
    /// Configure the commissioner and register its callbacks
    async fn init(
        &self,
        config: &CommissionerConfig,
        handler: CommissionerHandler,
    ) -> Result<(), NativeError>;

    /// Petition the Border Agent at `address:port` to become the active
    /// commissioner
    ///
    /// A rejection names the existing commissioner in the error message.
    async fn petition(&self, address: IpAddr, port: u16) -> Result<(), NativeError>;

    /// Publish the commissioner dataset (steering data) to the network
    async fn set_commissioner_dataset(
        &self,
        dataset: &CommissionerDataset,
    ) -> Result<(), NativeError>;

    /// Fetch the raw Active Operational Dataset TLVs selected by `flags`
    async fn get_raw_active_dataset(&self, flags: DatasetFlags) -> Result<Vec<u8>, NativeError>;

    /// Give up the active commissioner role
    async fn resign(&self) -> Result<(), NativeError>;

    /// Abort all outstanding requests
    fn cancel_requests(&self);

    /// Compute the PSKc of a network
    async fn generate_pskc(
        &self,
        passphrase: &str,
        network_name: &str,
        extended_pan_id: &ExtendedPanId,
    ) -> Result<Pskc, NativeError> {
        thread_crypto::derive_pskc(passphrase, network_name, extended_pan_id)
            .map_err(|e| NativeError::new(ErrorCode::InvalidArgs, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thread_crypto::JoinerId;

    #[test]
    fn test_dataset_flags() {
        let flags = DatasetFlags::NETWORK_NAME | DatasetFlags::EXTENDED_PAN_ID;
        assert!(flags.contains(DatasetFlags::NETWORK_NAME));
        assert!(!flags.contains(DatasetFlags::PSKC));
        assert!(DatasetFlags::all().contains(flags | DatasetFlags::SECURITY_POLICY));
        assert_eq!(DatasetFlags::empty().bits(), 0);
        assert_eq!(format!("{:?}", DatasetFlags::PSKC), "DatasetFlags(0x0080)");
    }

    #[test]
    fn test_commissioner_dataset_tlvs() {
        let steering = SteeringData::allow_all();
        let dataset = CommissionerDataset {
            session_id: Some(0x1234),
            joiner_udp_port: Some(1000),
            ..CommissionerDataset::with_steering_data(steering)
        };
        assert_eq!(
            dataset.to_tlvs().unwrap(),
            [0x0b, 2, 0x12, 0x34, 0x08, 1, 0xff, 0x12, 2, 0x03, 0xe8]
        );

        let joiner = JoinerId::from_bytes([2; 8]);
        let tlvs = CommissionerDataset::with_steering_data(SteeringData::for_joiners([&joiner]))
            .to_tlvs()
            .unwrap();
        assert_eq!(tlvs[..2], [0x08, 16]);
        assert_eq!(tlv::find(&tlvs, TlvType::SteeringData).map(<[u8]>::len), Some(16));
    }

    #[test]
    fn test_config_debug_redacts_pskc() {
        let config = CommissionerConfig::new(Pskc::from_bytes([7; 16])).with_id("ops");
        let debug = format!("{config:?}");
        assert!(debug.contains("\"ops\""));
        assert!(debug.contains("Pskc(..)"));
        assert!(!debug.contains("07"));
    }
}
