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

//! Discovery listener and events

use crate::BorderAgentInfo;

/// Receives Border Agent found/lost notifications
///
/// Callbacks run on the discovery dispatcher task. Implementations must not
/// block; marshal to another task if the work is slow.
pub trait BorderAgentListener: Send + Sync {
    /// A Border Agent was resolved and identified
    fn on_border_agent_found(&self, info: &BorderAgentInfo);

    /// A Border Agent went away
    fn on_border_agent_lost(&self, discriminator: &str);

    /// Discovery stopped because the OS browse failed
    fn on_discovery_failed(&self, _reason: &str) {}
}

/// Discovery events (found/lost/failed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A Border Agent was resolved
    Found(BorderAgentInfo),

    /// A Border Agent went away
    Lost {
        /// Discriminator of the lost agent
        discriminator: String,
    },

    /// Discovery stopped after an OS-level failure
    Failed(String),
}
