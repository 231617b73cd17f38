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

//! Thread Border Agent Discovery
//!
//! This crate finds Thread Border Agents advertised over DNS-SD
//! (`_meshcop._udp`) and turns them into typed [`BorderAgentInfo`] values.
//! It is not tied to a specific mDNS implementation.
//!
//! ## Architecture
//!
//! - **Backend trait**: [`ServiceBackend`] models the OS mDNS service (browse,
//!   resolve, multicast lock). Implementations live in separate crates
//!   (`thread-discovery-mdns`, `thread-discovery-mock`).
//! - **Resolution queue**: [`ResolutionQueue`] serializes resolves, since the
//!   underlying resolve primitive is not safe for concurrent use.
//! - **Discoverer**: [`BorderAgentDiscoverer`] owns the discovery lifecycle and
//!   funnels backend callbacks and resolver output through one dispatcher task.
//! - **Registry**: [`BorderAgentRegistry`] coalesces agents into one group per
//!   Thread network.
//!
//! ```text
//! backend callback -> ServiceFound -> ResolutionQueue -> resolve -> TXT parse
//!     -> dispatcher -> listeners / event stream -> registry
//! ```

pub mod attributes;
pub mod backend;
pub mod border_agent;
pub mod discoverer;
pub mod error;
pub mod listener;
pub mod queue;
pub mod registry;

pub use attributes::{parse_border_agent, AttributeError, TxtRecords};
pub use backend::{BackendEvent, ResolvedService, ServiceBackend, ServiceDescriptor};
pub use border_agent::{BorderAgentInfo, ThreadNetworkInfo};
pub use discoverer::{BorderAgentDiscoverer, DiscoveryConfig};
pub use error::DiscoveryError;
pub use listener::{BorderAgentListener, DiscoveryEvent};
pub use queue::{PushOutcome, ResolutionQueue};
pub use registry::{BorderAgentRegistry, NetworkGroup, RegistryListener};

/// DNS-SD service type advertised by Thread Border Agents
pub const MESHCOP_SERVICE_TYPE: &str = "_meshcop._udp.local.";
