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

//! Border Agent identity types

use core::fmt;
use core::net::{IpAddr, SocketAddr};
use thread_common::{ExtendedPanId, Pskc};

/// A discovered Thread Border Agent
///
/// IMPORTANT: the network a Border Agent fronts is identified by
/// `(network_name, extended_pan_id)`, not by the discriminator. Two agents
/// with the same pair belong to the same Thread network and are grouped
/// together even when their discriminators differ (see [`Self::network`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderAgentInfo {
    /// Identifies this Border Agent; defaults to the host address when the
    /// `discriminator` TXT key is absent
    pub discriminator: String,

    /// mDNS service instance name (e.g. `OpenThread BR #1`)
    pub instance_name: String,

    /// Thread network name (`nn` TXT key)
    pub network_name: String,

    /// Extended PAN ID (`xp` TXT key)
    pub extended_pan_id: ExtendedPanId,

    /// Host address
    pub host: IpAddr,

    /// MeshCoP UDP port
    pub port: u16,

    /// PSKc, when already known for this agent
    pub pskc: Option<Pskc>,
}

impl BorderAgentInfo {
    /// The Thread network this agent fronts
    pub fn network(&self) -> ThreadNetworkInfo {
        ThreadNetworkInfo {
            network_name: self.network_name.clone(),
            extended_pan_id: self.extended_pan_id,
        }
    }

    /// Whether both agents front the same Thread network
    pub fn same_network(&self, other: &Self) -> bool {
        self.network_name == other.network_name && self.extended_pan_id == other.extended_pan_id
    }

    /// Socket address to petition
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Identity of a Thread network
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadNetworkInfo {
    /// Network name
    pub network_name: String,
    /// Extended PAN ID
    pub extended_pan_id: ExtendedPanId,
}

impl ThreadNetworkInfo {
    /// Whether `agent` fronts this network
    pub fn matches(&self, agent: &BorderAgentInfo) -> bool {
        self.network_name == agent.network_name && self.extended_pan_id == agent.extended_pan_id
    }
}

impl fmt::Display for ThreadNetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.network_name, self.extended_pan_id)
    }
}
