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

//! Mock mDNS backend for testing Border Agent discovery
//!
//! [`MockBackend`] is an in-memory service registry that implements
//! [`ServiceBackend`](thread_discovery::ServiceBackend). Tests publish and
//! unpublish services on it and inject failures.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use thread_discovery::{BorderAgentDiscoverer, DiscoveryEvent, ResolvedService};
//! use thread_discovery_mock::MockBackend;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = MockBackend::new();
//! let mut discoverer = BorderAgentDiscoverer::new(Arc::new(backend.clone()));
//! let mut events = discoverer.subscribe();
//! discoverer.start().await?;
//!
//! backend
//!     .publish(
//!         ResolvedService::new("BR1", "192.168.1.10".parse()?, 49154)
//!             .with_txt("nn", "Net1")
//!             .with_txt("xp", [0x11u8, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]),
//!     )
//!     .await;
//!
//! let DiscoveryEvent::Found(agent) = events.recv().await? else {
//!     panic!("expected a found event");
//! };
//! assert_eq!(agent.network_name, "Net1");
//! # Ok(())
//! # }
//! ```

mod backend;

pub use backend::MockBackend;
