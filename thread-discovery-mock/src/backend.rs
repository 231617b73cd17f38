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

//! Shared in-memory service registry

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thread_discovery::{
    BackendEvent, DiscoveryError, ResolvedService, ServiceBackend, ServiceDescriptor,
};
use tokio::sync::{mpsc, RwLock};

/// In-memory mDNS service
///
/// Clones share the same registry, so a test can keep one handle while the
/// discoverer owns another.
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<MockBackendInner>,
}

#[derive(Default)]
struct MockBackendInner {
    /// Published services by instance name
    services: RwLock<HashMap<String, ResolvedService>>,
    /// Browse channel while discovery runs
    browse: Mutex<Option<(String, mpsc::UnboundedSender<BackendEvent>)>>,

    lock_held: AtomicBool,
    lock_acquisitions: AtomicUsize,
    stops: AtomicUsize,
    fail_lock: AtomicBool,
    fail_next_start: AtomicBool,

    failing_resolves: Mutex<HashSet<String>>,
    resolve_delay: Mutex<Duration>,
    resolves: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockBackendInner {
    fn browse(&self) -> std::sync::MutexGuard<'_, Option<(String, mpsc::UnboundedSender<BackendEvent>)>> {
        self.browse.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: BackendEvent) {
        if let Some((_, tx)) = self.browse().as_ref() {
            let _ = tx.send(event);
        }
    }

    fn service_type(&self) -> Option<String> {
        self.browse().as_ref().map(|(ty, _)| ty.clone())
    }
}

/// Decrements the in-flight counter when a resolve ends or is abandoned
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a service; browsers see a `ServiceFound` with only its name
    pub async fn publish(&self, service: ResolvedService) {
        let instance_name = service.instance_name.clone();
        self.inner
            .services
            .write()
            .await
            .insert(instance_name.clone(), service);
        if let Some(ty) = self.inner.service_type() {
            self.inner
                .emit(BackendEvent::ServiceFound(ServiceDescriptor::new(instance_name, ty)));
        }
    }

    /// Unpublish a service; browsers see a `ServiceLost` with only its name
    pub async fn unpublish(&self, instance_name: &str) {
        self.inner.services.write().await.remove(instance_name);
        if let Some(ty) = self.inner.service_type() {
            self.inner
                .emit(BackendEvent::ServiceLost(ServiceDescriptor::new(instance_name, ty)));
        }
    }

    /// Deliver a raw browse event
    pub fn emit(&self, event: BackendEvent) {
        self.inner.emit(event);
    }

    /// Make the running browse fail
    pub fn emit_failure(&self, reason: &str) {
        self.inner
            .emit(BackendEvent::DiscoveryFailed(reason.to_string()));
    }

    /// Make the next `start_discovery` fail
    pub fn fail_next_start(&self) {
        self.inner.fail_next_start.store(true, Ordering::SeqCst);
    }

    /// Make `acquire_multicast_lock` fail
    pub fn fail_multicast_lock(&self, fail: bool) {
        self.inner.fail_lock.store(fail, Ordering::SeqCst);
    }

    /// Make resolves of `instance_name` fail
    pub fn fail_resolve_for(&self, instance_name: &str) {
        self.inner
            .failing_resolves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(instance_name.to_string());
    }

    /// Delay every resolve by `delay`
    pub fn set_resolve_delay(&self, delay: Duration) {
        *self
            .inner
            .resolve_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Whether the multicast lock is held
    pub fn lock_held(&self) -> bool {
        self.inner.lock_held.load(Ordering::SeqCst)
    }

    /// How many times the multicast lock was acquired
    pub fn lock_acquisitions(&self) -> usize {
        self.inner.lock_acquisitions.load(Ordering::SeqCst)
    }

    /// Whether a browse is running
    pub fn is_browsing(&self) -> bool {
        self.inner.browse().is_some()
    }

    /// How many times `stop_discovery` was called
    pub fn stop_count(&self) -> usize {
        self.inner.stops.load(Ordering::SeqCst)
    }

    /// Resolves started so far
    pub fn resolve_count(&self) -> usize {
        self.inner.resolves.load(Ordering::SeqCst)
    }

    /// Highest number of resolves observed in flight at once
    pub fn max_concurrent_resolves(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    /// Get count of published services (for testing)
    pub async fn service_count(&self) -> usize {
        self.inner.services.read().await.len()
    }
}

#[async_trait]
impl ServiceBackend for MockBackend {
    async fn acquire_multicast_lock(&self) -> Result<(), DiscoveryError> {
        if self.inner.fail_lock.load(Ordering::SeqCst) {
            return Err(DiscoveryError::MulticastLock(
                "multicast not permitted".to_string(),
            ));
        }
        self.inner.lock_held.store(true, Ordering::SeqCst);
        self.inner.lock_acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release_multicast_lock(&self) -> Result<(), DiscoveryError> {
        self.inner.lock_held.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn start_discovery(
        &self,
        service_type: &str,
    ) -> Result<mpsc::UnboundedReceiver<BackendEvent>, DiscoveryError> {
        if self.inner.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(DiscoveryError::BrowseFailed(
                "mock browse failure".to_string(),
            ));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        // Services already on the network are reported right away.
        for name in self.inner.services.read().await.keys() {
            let _ = tx.send(BackendEvent::ServiceFound(ServiceDescriptor::new(
                name.clone(),
                service_type,
            )));
        }
        *self.inner.browse() = Some((service_type.to_string(), tx));
        Ok(rx)
    }

    async fn stop_discovery(&self, _service_type: &str) -> Result<(), DiscoveryError> {
        self.inner.stops.fetch_add(1, Ordering::SeqCst);
        *self.inner.browse() = None;
        Ok(())
    }

    async fn resolve(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> Result<ResolvedService, DiscoveryError> {
        self.inner.resolves.fetch_add(1, Ordering::SeqCst);
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.inner.in_flight);
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self
            .inner
            .resolve_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .inner
            .failing_resolves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&descriptor.instance_name);
        let failed = |reason: &str| DiscoveryError::ResolveFailed {
            instance_name: descriptor.instance_name.clone(),
            reason: reason.to_string(),
        };
        if failing {
            return Err(failed("mock resolve failure"));
        }
        self.inner
            .services
            .read()
            .await
            .get(&descriptor.instance_name)
            .cloned()
            .ok_or_else(|| failed("service not found"))
    }
}
