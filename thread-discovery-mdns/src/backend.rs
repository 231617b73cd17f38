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

use crate::utils::{instance_label, resolved_from_mdns};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thread_discovery::{
    BackendEvent, DiscoveryError, ResolvedService, ServiceBackend, ServiceDescriptor,
};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// mDNS-based implementation of [`ServiceBackend`]
///
/// mdns-sd resolves services as part of browsing, so `resolve` waits for the
/// browse task to have seen the service's resolution, bounded by a timeout.
pub struct MdnsBackend {
    mdns: mdns_sd::ServiceDaemon,
    resolved: Arc<ResolvedCache>,
    resolve_timeout: Duration,
    pump: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Default)]
struct ResolvedCache {
    services: Mutex<HashMap<String, ResolvedService>>,
    changed: Notify,
}

impl ResolvedCache {
    fn services(&self) -> std::sync::MutexGuard<'_, HashMap<String, ResolvedService>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MdnsBackend {
    /// Create a backend on the standard mDNS port
    ///
    /// # Errors
    ///
    /// Returns an error if the mDNS daemon cannot be started.
    pub fn new() -> Result<Self, DiscoveryError> {
        let mdns = mdns_sd::ServiceDaemon::new().map_err(|e| {
            DiscoveryError::BrowseFailed(format!("Failed to create mDNS daemon: {e}"))
        })?;

        Ok(Self {
            mdns,
            resolved: Arc::new(ResolvedCache::default()),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            pump: Mutex::new(None),
        })
    }

    /// Set how long `resolve` waits for a service's resolution
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }
}

#[async_trait]
impl ServiceBackend for MdnsBackend {
    async fn start_discovery(
        &self,
        service_type: &str,
    ) -> Result<mpsc::UnboundedReceiver<BackendEvent>, DiscoveryError> {
        let receiver = self
            .mdns
            .browse(service_type)
            .map_err(|e| DiscoveryError::BrowseFailed(format!("Failed to start browsing: {e}")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let cache = self.resolved.clone();
        let pump_type = service_type.to_string();

        let pump = tokio::spawn(async move {
            loop {
                let event = match receiver.recv_async().await {
                    Ok(mdns_sd::ServiceEvent::ServiceFound(ty, fullname)) => {
                        log::debug!("Service found: {fullname}");
                        BackendEvent::ServiceFound(ServiceDescriptor::new(
                            instance_label(&fullname, &pump_type),
                            ty,
                        ))
                    }
                    Ok(mdns_sd::ServiceEvent::ServiceResolved(info)) => {
                        log::debug!("Service resolved: {}", info.get_fullname());
                        match resolved_from_mdns(&info, &pump_type) {
                            Some(service) => {
                                cache
                                    .services()
                                    .insert(service.instance_name.clone(), service);
                                cache.changed.notify_waiters();
                            }
                            None => log::warn!("No address for {}", info.get_fullname()),
                        }
                        continue;
                    }
                    Ok(mdns_sd::ServiceEvent::ServiceRemoved(ty, fullname)) => {
                        log::debug!("Service removed: {fullname}");
                        let label = instance_label(&fullname, &pump_type);
                        match cache.services().remove(&label) {
                            Some(known) => BackendEvent::ServiceLost(known.descriptor(&ty)),
                            None => BackendEvent::ServiceLost(ServiceDescriptor::new(label, ty)),
                        }
                    }
                    Ok(mdns_sd::ServiceEvent::SearchStopped(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        log::error!("Error receiving mDNS event: {e}");
                        BackendEvent::DiscoveryFailed(e.to_string())
                    }
                };
                let failed = matches!(event, BackendEvent::DiscoveryFailed(_));
                if tx.send(event).is_err() || failed {
                    break;
                }
            }
            log::debug!("mDNS event pump stopped");
        });

        if let Some(previous) = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(pump)
        {
            previous.abort();
        }
        log::info!("Started browsing for {service_type}");
        Ok(rx)
    }

    async fn stop_discovery(&self, service_type: &str) -> Result<(), DiscoveryError> {
        let pump = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pump) = pump {
            pump.abort();
        }
        self.resolved.services().clear();

        self.mdns.stop_browse(service_type).map_err(|e| {
            DiscoveryError::StopBrowseFailed(format!("Failed to stop browsing: {e}"))
        })?;
        log::info!("Stopped browsing for {service_type}");
        Ok(())
    }

    async fn resolve(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> Result<ResolvedService, DiscoveryError> {
        let wait = async {
            loop {
                let changed = self.resolved.changed.notified();
                if let Some(service) = self.resolved.services().get(&descriptor.instance_name) {
                    return service.clone();
                }
                changed.await;
            }
        };
        tokio::time::timeout(self.resolve_timeout, wait)
            .await
            .map_err(|_| DiscoveryError::ResolveFailed {
                instance_name: descriptor.instance_name.clone(),
                reason: format!("no resolution within {:?}", self.resolve_timeout),
            })
    }
}

impl Drop for MdnsBackend {
    fn drop(&mut self) {
        if let Some(pump) = self
            .pump
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pump.abort();
        }
        // Best-effort shutdown of the daemon thread
        let _ = self.mdns.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mdns_backend_new() {
        // May fail where multicast sockets are unavailable
        match MdnsBackend::new() {
            Ok(_) => log::debug!("mDNS backend created successfully"),
            Err(e) => log::debug!("mDNS not available (expected in some environments): {e}"),
        }
    }

    #[tokio::test]
    async fn test_browse_start_and_stop() {
        let Ok(backend) = MdnsBackend::new() else {
            return;
        };
        let service_type = thread_discovery::MESHCOP_SERVICE_TYPE;
        let Ok(mut events) = backend.start_discovery(service_type).await else {
            return;
        };
        assert!(backend.pump.lock().unwrap().is_some());

        let _ = backend.stop_discovery(service_type).await;
        assert!(backend.pump.lock().unwrap().is_none());
        // The pump was aborted, so its sender is gone.
        let closed = tokio::time::timeout(Duration::from_secs(1), async {
            while events.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok());
    }
}
