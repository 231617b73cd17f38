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

//! Border Agent discovery against the mock backend

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use thread_common::ExtendedPanId;
use thread_discovery::{
    BackendEvent, BorderAgentDiscoverer, BorderAgentInfo, BorderAgentListener, DiscoveryConfig,
    DiscoveryError, DiscoveryEvent, NetworkGroup, RegistryListener, ResolvedService,
    ServiceDescriptor, MESHCOP_SERVICE_TYPE,
};
use thread_discovery_mock::MockBackend;
use tokio::sync::{broadcast, watch};

const XP: [u8; 8] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];

fn border_router(name: &str, host: &str) -> ResolvedService {
    ResolvedService::new(name, host.parse().unwrap(), 49154)
        .with_txt("nn", "Net1")
        .with_txt("xp", XP)
}

fn discoverer(backend: &MockBackend) -> BorderAgentDiscoverer<MockBackend> {
    BorderAgentDiscoverer::new(Arc::new(backend.clone()))
}

async fn next_event(rx: &mut broadcast::Receiver<DiscoveryEvent>) -> DiscoveryEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn next_found(rx: &mut broadcast::Receiver<DiscoveryEvent>) -> BorderAgentInfo {
    match next_event(rx).await {
        DiscoveryEvent::Found(info) => info,
        other => panic!("expected Found, got {other:?}"),
    }
}

async fn wait_for_groups(
    rx: &mut watch::Receiver<Vec<NetworkGroup>>,
    done: impl FnMut(&Vec<NetworkGroup>) -> bool,
) -> Vec<NetworkGroup> {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(done))
        .await
        .expect("timed out waiting for registry")
        .expect("registry dropped")
        .clone()
}

#[tokio::test]
async fn test_agents_on_one_network_form_one_group() {
    let backend = MockBackend::new();
    let mut discoverer = discoverer(&backend);
    let (registry, mut groups) = RegistryListener::new();
    discoverer.add_listener(Arc::new(registry));
    discoverer.start().await.unwrap();

    backend.publish(border_router("BR1", "192.168.1.10")).await;
    backend
        .publish(border_router("BR2", "192.168.1.11").with_txt("discriminator", "B"))
        .await;

    let groups = wait_for_groups(&mut groups, |g| {
        g.first().is_some_and(|group| group.agents.len() == 2)
    })
    .await;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].network.network_name, "Net1");
    assert_eq!(
        groups[0].network.extended_pan_id,
        ExtendedPanId::from(0x1122_3344_5566_7788_u64)
    );
    let mut discriminators: Vec<_> = groups[0]
        .agents
        .iter()
        .map(|a| a.discriminator.as_str())
        .collect();
    discriminators.sort_unstable();
    assert_eq!(discriminators, ["192.168.1.10", "B"]);

    discoverer.stop().await.unwrap();
}

#[tokio::test]
async fn test_grouping_does_not_depend_on_arrival_order() {
    let with_discriminator = || border_router("BR2", "192.168.1.11").with_txt("discriminator", "B");
    let without = || border_router("BR1", "192.168.1.10");

    for (first, second) in [
        (without(), with_discriminator()),
        (with_discriminator(), without()),
    ] {
        let backend = MockBackend::new();
        let mut discoverer = discoverer(&backend);
        let (registry, mut groups) = RegistryListener::new();
        discoverer.add_listener(Arc::new(registry));
        discoverer.start().await.unwrap();

        let first_name = first.instance_name.clone();
        backend.publish(first).await;
        backend.publish(second).await;

        let groups = wait_for_groups(&mut groups, |g| {
            g.first().is_some_and(|group| group.agents.len() == 2)
        })
        .await;
        assert_eq!(groups.len(), 1, "first arrival {first_name}");
        assert_eq!(groups[0].network.network_name, "Net1");
        assert_eq!(groups[0].network.extended_pan_id, ExtendedPanId::from_bytes(XP));
        let mut discriminators: Vec<_> = groups[0]
            .agents
            .iter()
            .map(|a| a.discriminator.as_str())
            .collect();
        discriminators.sort_unstable();
        assert_eq!(discriminators, ["192.168.1.10", "B"]);

        discoverer.stop().await.unwrap();
    }
}

#[tokio::test]
async fn test_agent_lost_while_resolving_stays_lost() {
    let backend = MockBackend::new();
    backend.set_resolve_delay(Duration::from_millis(300));
    let mut discoverer = discoverer(&backend);
    let (registry, groups) = RegistryListener::new();
    discoverer.add_listener(Arc::new(registry));
    let mut events = discoverer.subscribe();
    discoverer.start().await.unwrap();

    backend
        .publish(border_router("BR1", "192.168.1.10").with_txt("discriminator", "A"))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.resolve_count(), 1);

    // Lost while its resolve is in flight; the service record stays
    // resolvable so only the loss can keep it out.
    backend.emit(BackendEvent::ServiceLost(ServiceDescriptor::new(
        "BR1",
        MESHCOP_SERVICE_TYPE,
    )));
    // Resolves are serialized, so BR2 is found only after BR1's resolve ends.
    backend
        .publish(border_router("BR2", "192.168.1.11").with_txt("discriminator", "B"))
        .await;

    let found = next_found(&mut events).await;
    assert_eq!(found.discriminator, "B");
    let agents = discoverer.discovered_agents();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].discriminator, "B");
    let snapshot = groups.borrow().clone();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].agents.len(), 1);
    assert_eq!(snapshot[0].agents[0].discriminator, "B");

    discoverer.stop().await.unwrap();
}

#[tokio::test]
async fn test_lost_agent_leaves_registry() {
    let backend = MockBackend::new();
    let mut discoverer = discoverer(&backend);
    let (registry, mut groups) = RegistryListener::new();
    discoverer.add_listener(Arc::new(registry));
    let mut events = discoverer.subscribe();
    discoverer.start().await.unwrap();

    backend
        .publish(border_router("BR1", "192.168.1.10").with_txt("discriminator", "A"))
        .await;
    next_found(&mut events).await;

    backend.unpublish("BR1").await;
    assert_eq!(
        next_event(&mut events).await,
        DiscoveryEvent::Lost {
            discriminator: "A".to_string()
        }
    );
    let groups = wait_for_groups(&mut groups, |g| g.is_empty()).await;
    assert!(groups.is_empty());

    discoverer.stop().await.unwrap();
}

#[tokio::test]
async fn test_services_without_identity_are_skipped() {
    let backend = MockBackend::new();
    let mut discoverer = discoverer(&backend);
    let mut events = discoverer.subscribe();
    discoverer.start().await.unwrap();

    backend
        .publish(ResolvedService::new("printer", "10.0.0.5".parse().unwrap(), 631).with_txt("nn", "x"))
        .await;
    backend
        .publish(
            ResolvedService::new("bad-xp", "10.0.0.6".parse().unwrap(), 49154)
                .with_txt("nn", "Net1")
                .with_txt("xp", &XP[..3]),
        )
        .await;
    backend.publish(border_router("BR1", "10.0.0.7")).await;

    let found = next_found(&mut events).await;
    assert_eq!(found.instance_name, "BR1");
    assert_eq!(backend.resolve_count(), 3);

    discoverer.stop().await.unwrap();
}

#[tokio::test]
async fn test_resolve_failure_does_not_stop_worker() {
    let backend = MockBackend::new();
    backend.fail_resolve_for("broken");
    let mut discoverer = discoverer(&backend);
    let mut events = discoverer.subscribe();
    discoverer.start().await.unwrap();

    backend.publish(border_router("broken", "10.0.0.1")).await;
    backend.publish(border_router("BR2", "10.0.0.2")).await;

    assert_eq!(next_found(&mut events).await.instance_name, "BR2");
    assert!(discoverer.is_running());

    discoverer.stop().await.unwrap();
}

#[tokio::test]
async fn test_resolves_are_serialized() {
    let backend = MockBackend::new();
    backend.set_resolve_delay(Duration::from_millis(20));
    let mut discoverer = discoverer(&backend);
    let mut events = discoverer.subscribe();
    discoverer.start().await.unwrap();

    for i in 0..5 {
        backend
            .publish(border_router(&format!("BR{i}"), &format!("10.0.0.{i}")))
            .await;
    }
    for _ in 0..5 {
        next_found(&mut events).await;
    }
    assert_eq!(backend.resolve_count(), 5);
    assert_eq!(backend.max_concurrent_resolves(), 1);
    assert_eq!(discoverer.discovered_agents().len(), 5);

    discoverer.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_clears_pending_resolutions() {
    let backend = MockBackend::new();
    backend.set_resolve_delay(Duration::from_secs(30));
    let mut discoverer = discoverer(&backend);
    discoverer.start().await.unwrap();

    for i in 0..4 {
        backend
            .publish(border_router(&format!("BR{i}"), &format!("10.0.0.{i}")))
            .await;
    }
    tokio::time::timeout(Duration::from_secs(2), async {
        while backend.resolve_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    discoverer.stop().await.unwrap();
    assert!(discoverer.queue().is_empty());
    assert!(!discoverer.queue().is_resolving());
    assert!(!backend.is_browsing());
    assert!(!backend.lock_held());
    assert_eq!(backend.resolve_count(), 1);
}

#[tokio::test]
async fn test_multicast_lock_follows_lifecycle() {
    let backend = MockBackend::new();
    let mut discoverer = discoverer(&backend);

    discoverer.start().await.unwrap();
    assert!(backend.lock_held());
    assert!(backend.is_browsing());

    discoverer.stop().await.unwrap();
    assert!(!backend.lock_held());

    // Restart after a clean stop
    discoverer.start().await.unwrap();
    assert_eq!(backend.lock_acquisitions(), 2);
    discoverer.stop().await.unwrap();
}

#[tokio::test]
async fn test_start_failures() {
    let backend = MockBackend::new();
    let mut discoverer = discoverer(&backend);

    backend.fail_multicast_lock(true);
    assert!(matches!(
        discoverer.start().await,
        Err(DiscoveryError::MulticastLock(_))
    ));
    assert!(!discoverer.is_running());

    backend.fail_multicast_lock(false);
    backend.fail_next_start();
    assert!(matches!(
        discoverer.start().await,
        Err(DiscoveryError::BrowseFailed(_))
    ));
    assert!(!discoverer.is_running());
    assert!(!backend.lock_held());

    discoverer.start().await.unwrap();
    assert!(discoverer.is_running());
    discoverer.stop().await.unwrap();
}

#[derive(Default)]
struct FailureListener {
    reasons: std::sync::Mutex<Vec<String>>,
}

impl BorderAgentListener for FailureListener {
    fn on_border_agent_found(&self, _info: &BorderAgentInfo) {}

    fn on_border_agent_lost(&self, _discriminator: &str) {}

    fn on_discovery_failed(&self, reason: &str) {
        self.reasons.lock().unwrap().push(reason.to_string());
    }
}

#[tokio::test]
async fn test_browse_failure_stops_and_releases() {
    let backend = MockBackend::new();
    let mut discoverer = discoverer(&backend);
    let listener = Arc::new(FailureListener::default());
    discoverer.add_listener(listener.clone());
    let mut events = discoverer.subscribe();
    discoverer.start().await.unwrap();

    backend.emit_failure("interface down");
    assert_eq!(
        next_event(&mut events).await,
        DiscoveryEvent::Failed("interface down".to_string())
    );
    assert!(!discoverer.is_running());
    assert!(!backend.lock_held());
    assert_eq!(backend.stop_count(), 1);
    assert_eq!(*listener.reasons.lock().unwrap(), ["interface down"]);

    // No automatic retry; an explicit start works again.
    discoverer.start().await.unwrap();
    assert!(discoverer.is_running());
    discoverer.stop().await.unwrap();
    assert_eq!(backend.stop_count(), 2);
}

#[tokio::test]
async fn test_event_stream_and_custom_queue() {
    let backend = MockBackend::new();
    backend.publish(border_router("BR1", "10.0.0.1")).await;

    let mut discoverer = BorderAgentDiscoverer::with_config(
        Arc::new(backend.clone()),
        DiscoveryConfig {
            queue_capacity: 1,
            ..DiscoveryConfig::default()
        },
    );
    let mut stream = discoverer.event_stream();
    discoverer.start().await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for event")
        .expect("stream ended");
    match event {
        DiscoveryEvent::Found(info) => assert_eq!(info.port, 49154),
        other => panic!("expected Found, got {other:?}"),
    }

    discoverer.stop().await.unwrap();
}
