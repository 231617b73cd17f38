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

//! mDNS backend for Border Agent discovery using mdns-sd
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use thread_discovery::BorderAgentDiscoverer;
//! use thread_discovery_mdns::MdnsBackend;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(MdnsBackend::new()?);
//! let mut discoverer = BorderAgentDiscoverer::new(backend);
//! discoverer.start().await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod utils;

pub use backend::MdnsBackend;
pub use utils::instance_label;
