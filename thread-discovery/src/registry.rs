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

//! Border Agents grouped by Thread network

use crate::{BorderAgentInfo, BorderAgentListener, ThreadNetworkInfo};
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

/// One Thread network and the Border Agents that front it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkGroup {
    /// Network identity
    pub network: ThreadNetworkInfo,
    /// Agents reachable for this network
    pub agents: Vec<BorderAgentInfo>,
}

/// Border Agents coalesced by `(network_name, extended_pan_id)`
#[derive(Debug, Clone, Default)]
pub struct BorderAgentRegistry {
    groups: Vec<NetworkGroup>,
}

impl BorderAgentRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent to its network's group, creating the group if needed
    ///
    /// An agent whose discriminator is already in the group replaces the old
    /// entry. One that moved to another network leaves its old group.
    pub fn add(&mut self, agent: BorderAgentInfo) {
        let network = agent.network();
        for group in self.groups.iter_mut().filter(|g| g.network != network) {
            group.agents.retain(|a| a.discriminator != agent.discriminator);
        }
        self.groups.retain(|g| !g.agents.is_empty());

        match self.groups.iter_mut().find(|g| g.network == network) {
            Some(group) => {
                match group
                    .agents
                    .iter_mut()
                    .find(|a| a.discriminator == agent.discriminator)
                {
                    Some(existing) => *existing = agent,
                    None => group.agents.push(agent),
                }
            }
            None => self.groups.push(NetworkGroup {
                network,
                agents: vec![agent],
            }),
        }
    }

    /// Remove the agent with `discriminator` from every group
    ///
    /// Groups left empty are dropped. Returns whether anything was removed.
    pub fn remove(&mut self, discriminator: &str) -> bool {
        let mut removed = false;
        for group in &mut self.groups {
            let before = group.agents.len();
            group.agents.retain(|a| a.discriminator != discriminator);
            removed |= group.agents.len() != before;
        }
        self.groups.retain(|g| !g.agents.is_empty());
        removed
    }

    /// Current groups, in first-seen order
    pub fn groups(&self) -> &[NetworkGroup] {
        &self.groups
    }

    /// Agents fronting `network`
    pub fn agents_for(&self, network: &ThreadNetworkInfo) -> &[BorderAgentInfo] {
        self.groups
            .iter()
            .find(|g| &g.network == network)
            .map(|g| g.agents.as_slice())
            .unwrap_or_default()
    }

    /// Number of networks
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no agent is known
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

/// Listener that maintains a registry and publishes snapshots
///
/// Each mutation publishes a fresh copy of the groups on a `watch` channel, so
/// readers on other tasks never touch the registry itself.
pub struct RegistryListener {
    registry: Mutex<BorderAgentRegistry>,
    snapshots: watch::Sender<Vec<NetworkGroup>>,
}

impl RegistryListener {
    /// Create the listener and a receiver for its snapshots
    pub fn new() -> (Self, watch::Receiver<Vec<NetworkGroup>>) {
        let (snapshots, rx) = watch::channel(Vec::new());
        (
            Self {
                registry: Mutex::new(BorderAgentRegistry::new()),
                snapshots,
            },
            rx,
        )
    }

    /// Another receiver for snapshots
    pub fn subscribe(&self) -> watch::Receiver<Vec<NetworkGroup>> {
        self.snapshots.subscribe()
    }

    /// Current groups
    pub fn snapshot(&self) -> Vec<NetworkGroup> {
        self.snapshots.borrow().clone()
    }

    fn update(&self, mutate: impl FnOnce(&mut BorderAgentRegistry) -> bool) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if mutate(&mut registry) {
            self.snapshots.send_replace(registry.groups().to_vec());
        }
    }
}

impl BorderAgentListener for RegistryListener {
    fn on_border_agent_found(&self, info: &BorderAgentInfo) {
        self.update(|registry| {
            registry.add(info.clone());
            true
        });
    }

    fn on_border_agent_lost(&self, discriminator: &str) {
        self.update(|registry| registry.remove(discriminator));
    }

    fn on_discovery_failed(&self, _reason: &str) {
        self.update(|registry| {
            let had_agents = !registry.is_empty();
            registry.clear();
            had_agents
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thread_common::ExtendedPanId;

    fn agent(discriminator: &str, name: &str, xpanid: u64, host: &str) -> BorderAgentInfo {
        BorderAgentInfo {
            discriminator: discriminator.to_string(),
            instance_name: format!("BR {discriminator}"),
            network_name: name.to_string(),
            extended_pan_id: ExtendedPanId::from(xpanid),
            host: host.parse().unwrap(),
            port: 49154,
            pskc: None,
        }
    }

    #[test]
    fn test_agents_on_same_network_are_coalesced() {
        let mut registry = BorderAgentRegistry::new();
        registry.add(agent("192.168.1.10", "Net1", 0x1122_3344_5566_7788, "192.168.1.10"));
        registry.add(agent("B", "Net1", 0x1122_3344_5566_7788, "192.168.1.11"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.groups()[0].agents.len(), 2);
        assert_eq!(registry.groups()[0].network.network_name, "Net1");
    }

    #[test]
    fn test_distinct_networks_get_distinct_groups() {
        let mut registry = BorderAgentRegistry::new();
        registry.add(agent("A", "Net1", 1, "10.0.0.1"));
        registry.add(agent("B", "Net1", 2, "10.0.0.2"));
        registry.add(agent("C", "Net2", 1, "10.0.0.3"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_agent_moving_network_leaves_old_group() {
        let mut registry = BorderAgentRegistry::new();
        registry.add(agent("A", "Net1", 1, "10.0.0.1"));
        registry.add(agent("B", "Net1", 1, "10.0.0.2"));
        registry.add(agent("A", "Net2", 2, "10.0.0.1"));

        assert_eq!(registry.len(), 2);
        let net1 = registry.groups()[0].network.clone();
        let net2 = registry.groups()[1].network.clone();
        assert_eq!(registry.agents_for(&net1).len(), 1);
        assert_eq!(registry.agents_for(&net1)[0].discriminator, "B");
        assert_eq!(registry.agents_for(&net2)[0].discriminator, "A");

        // Moving the last agent away drops the empty group.
        registry.add(agent("B", "Net2", 2, "10.0.0.2"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.groups()[0].network, net2);
        assert_eq!(registry.groups()[0].agents.len(), 2);
    }

    #[test]
    fn test_same_discriminator_replaces() {
        let mut registry = BorderAgentRegistry::new();
        registry.add(agent("A", "Net1", 1, "10.0.0.1"));
        registry.add(agent("A", "Net1", 1, "10.0.0.9"));
        let agents = registry.agents_for(&agent("A", "Net1", 1, "10.0.0.1").network());
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].host.to_string(), "10.0.0.9");
    }

    #[test]
    fn test_remove_drops_empty_groups() {
        let mut registry = BorderAgentRegistry::new();
        registry.add(agent("A", "Net1", 1, "10.0.0.1"));
        registry.add(agent("B", "Net1", 1, "10.0.0.2"));
        registry.add(agent("C", "Net2", 2, "10.0.0.3"));

        assert!(registry.remove("A"));
        assert_eq!(registry.len(), 2);
        assert!(registry.remove("C"));
        assert_eq!(registry.len(), 1);
        assert!(!registry.remove("missing"));
        assert!(registry.remove("B"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_listener_publishes_snapshots() {
        let (listener, mut rx) = RegistryListener::new();
        listener.on_border_agent_found(&agent("A", "Net1", 1, "10.0.0.1"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        listener.on_border_agent_lost("unknown");
        assert!(!rx.has_changed().unwrap());

        listener.on_border_agent_lost("A");
        assert!(rx.has_changed().unwrap());
        assert!(listener.snapshot().is_empty());
    }
}
