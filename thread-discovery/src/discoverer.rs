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

//! Border Agent discoverer

use crate::attributes::discriminator_of;
use crate::{
    BackendEvent, BorderAgentInfo, BorderAgentListener, DiscoveryError, DiscoveryEvent,
    PushOutcome, ResolutionQueue, ServiceBackend, ServiceDescriptor, MESHCOP_SERVICE_TYPE,
};
use futures::stream::{BoxStream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Discoverer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// DNS-SD service type to browse
    pub service_type: String,
    /// Maximum pending resolutions before the oldest is dropped
    pub queue_capacity: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: MESHCOP_SERVICE_TYPE.to_string(),
            queue_capacity: 32,
        }
    }
}

/// Finds Border Agents through a [`ServiceBackend`]
///
/// `start()` takes the multicast lock, starts the OS browse and spawns the
/// resolver worker plus a dispatcher task. Browse events and resolver output
/// both flow through the dispatcher, which is the only place listeners are
/// called from. If the browse fails, discovery stops itself and listeners get
/// `on_discovery_failed`; it is not restarted automatically.
pub struct BorderAgentDiscoverer<B: ServiceBackend + ?Sized> {
    backend: Arc<B>,
    config: DiscoveryConfig,
    queue: ResolutionQueue,
    shared: Arc<Shared>,
    running: Option<Running>,
}

struct Running {
    cancel: CancellationToken,
    os_active: Arc<AtomicBool>,
    worker: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

struct Shared {
    listeners: RwLock<Vec<Arc<dyn BorderAgentListener>>>,
    events: broadcast::Sender<DiscoveryEvent>,
    agents: Mutex<HashMap<String, BorderAgentInfo>>,
    /// Instance names found and not lost since; resolver output for
    /// anything else is stale
    live: Mutex<HashSet<String>>,
}

impl Shared {
    fn agents(&self) -> std::sync::MutexGuard<'_, HashMap<String, BorderAgentInfo>> {
        self.agents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> Vec<Arc<dyn BorderAgentListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish_found(&self, info: BorderAgentInfo) {
        log::info!(
            "Found Border Agent {} for {} at {}",
            info.discriminator,
            info.network(),
            info.socket_addr()
        );
        self.agents()
            .insert(info.instance_name.clone(), info.clone());
        for listener in self.listeners() {
            listener.on_border_agent_found(&info);
        }
        let _ = self.events.send(DiscoveryEvent::Found(info));
    }

    fn publish_lost(&self, discriminator: String) {
        log::info!("Lost Border Agent {discriminator}");
        for listener in self.listeners() {
            listener.on_border_agent_lost(&discriminator);
        }
        let _ = self.events.send(DiscoveryEvent::Lost { discriminator });
    }

    fn publish_failed(&self, reason: String) {
        self.agents().clear();
        self.live().clear();
        for listener in self.listeners() {
            listener.on_discovery_failed(&reason);
        }
        let _ = self.events.send(DiscoveryEvent::Failed(reason));
    }
}

impl<B: ServiceBackend + ?Sized> BorderAgentDiscoverer<B> {
    /// Create a discoverer with default settings
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_config(backend, DiscoveryConfig::default())
    }

    /// Create a discoverer with explicit settings
    pub fn with_config(backend: Arc<B>, config: DiscoveryConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            queue: ResolutionQueue::new(config.queue_capacity),
            backend,
            config,
            shared: Arc::new(Shared {
                listeners: RwLock::new(Vec::new()),
                events,
                agents: Mutex::new(HashMap::new()),
                live: Mutex::new(HashSet::new()),
            }),
            running: None,
        }
    }

    /// Register a listener; it receives events from the next one on
    pub fn add_listener(&self, listener: Arc<dyn BorderAgentListener>) {
        self.shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Subscribe to discovery events
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.shared.events.subscribe()
    }

    /// Stream of discovery events
    pub fn event_stream(&self) -> BoxStream<'static, DiscoveryEvent> {
        let mut receiver = self.subscribe();
        async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Discovery event stream lagged, skipped {skipped} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }

    /// Agents resolved so far and not yet lost (snapshot)
    pub fn discovered_agents(&self) -> Vec<BorderAgentInfo> {
        self.shared.agents().values().cloned().collect()
    }

    /// Pending resolutions
    pub fn queue(&self) -> &ResolutionQueue {
        &self.queue
    }

    /// Whether discovery is running
    ///
    /// Turns false on its own after a browse failure.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.cancel.is_cancelled())
    }

    /// Start discovery
    ///
    /// Calling this while already running logs a warning and does nothing.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::MulticastLock` or `DiscoveryError::BrowseFailed`
    /// if the OS service cannot be started. The multicast lock is released
    /// again when the browse fails to start.
    pub async fn start(&mut self) -> Result<(), DiscoveryError> {
        if self.is_running() {
            log::warn!("Border Agent discovery already running");
            return Ok(());
        }
        if let Some(stale) = self.running.take() {
            // Stopped itself after a failure; reap the tasks.
            stale.join().await;
        }

        self.backend.acquire_multicast_lock().await?;
        let backend_rx = match self.backend.start_discovery(&self.config.service_type).await {
            Ok(rx) => rx,
            Err(e) => {
                log::error!("Failed to start Border Agent discovery: {e}");
                if let Err(release) = self.backend.release_multicast_lock().await {
                    log::warn!("{release}");
                }
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let os_active = Arc::new(AtomicBool::new(true));
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();

        let worker = self
            .queue
            .spawn_worker(self.backend.clone(), cancel.clone(), move |info| {
                let _ = resolved_tx.send(info);
            });

        let dispatcher = Dispatcher {
            backend: self.backend.clone(),
            service_type: self.config.service_type.clone(),
            queue: self.queue.clone(),
            shared: self.shared.clone(),
            cancel: cancel.clone(),
            os_active: os_active.clone(),
        };
        let dispatcher = tokio::spawn(dispatcher.run(backend_rx, resolved_rx));

        self.running = Some(Running {
            cancel,
            os_active,
            worker,
            dispatcher,
        });
        log::info!(
            "Started Border Agent discovery for {}",
            self.config.service_type
        );
        Ok(())
    }

    /// Stop discovery
    ///
    /// Cancels the OS browse, releases the multicast lock and clears pending
    /// resolutions. Calling this while stopped logs a warning and does nothing.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::StopBrowseFailed` or
    /// `DiscoveryError::MulticastLock` if the OS service reports an error. The
    /// discoverer is stopped either way.
    pub async fn stop(&mut self) -> Result<(), DiscoveryError> {
        let Some(running) = self.running.take() else {
            log::warn!("Border Agent discovery not running");
            return Ok(());
        };
        running.cancel.cancel();
        let os_active = running.os_active.clone();
        running.join().await;
        self.queue.clear();
        self.shared.agents().clear();
        self.shared.live().clear();

        let result =
            shutdown_backend(self.backend.as_ref(), &self.config.service_type, &os_active).await;
        log::info!("Stopped Border Agent discovery");
        result
    }
}

/// Dropping a running discoverer stops the OS browse and releases the
/// multicast lock on a spawned task; `stop()` does the same but reports
/// errors.
impl<B: ServiceBackend + ?Sized> Drop for BorderAgentDiscoverer<B> {
    fn drop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        let os_active = running.os_active;
        if !os_active.load(Ordering::Acquire) {
            return;
        }

        let backend = self.backend.clone();
        let service_type = self.config.service_type.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let _ = shutdown_backend(backend.as_ref(), &service_type, &os_active).await;
                });
            }
            Err(_) => log::warn!(
                "Border Agent discovery dropped outside a runtime, browse left running"
            ),
        }
    }
}

impl Running {
    async fn join(self) {
        for (name, task) in [("resolver", self.worker), ("dispatcher", self.dispatcher)] {
            if let Err(e) = task.await {
                log::warn!("Discovery {name} task ended abnormally: {e}");
            }
        }
    }
}

/// Stop the OS browse and release the lock, once
async fn shutdown_backend<B: ServiceBackend + ?Sized>(
    backend: &B,
    service_type: &str,
    os_active: &AtomicBool,
) -> Result<(), DiscoveryError> {
    if !os_active.swap(false, Ordering::AcqRel) {
        return Ok(());
    }
    let stopped = backend.stop_discovery(service_type).await;
    if let Err(e) = &stopped {
        log::error!("{e}");
    }
    let released = backend.release_multicast_lock().await;
    if let Err(e) = &released {
        log::error!("{e}");
    }
    stopped.and(released)
}

struct Dispatcher<B: ServiceBackend + ?Sized> {
    backend: Arc<B>,
    service_type: String,
    queue: ResolutionQueue,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    os_active: Arc<AtomicBool>,
}

impl<B: ServiceBackend + ?Sized> Dispatcher<B> {
    async fn run(
        self,
        mut backend_rx: mpsc::UnboundedReceiver<BackendEvent>,
        mut resolved_rx: mpsc::UnboundedReceiver<BorderAgentInfo>,
    ) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                event = backend_rx.recv() => match event {
                    Some(BackendEvent::ServiceFound(descriptor)) => self.on_service_found(descriptor),
                    Some(BackendEvent::ServiceLost(descriptor)) => self.on_service_lost(&descriptor),
                    Some(BackendEvent::DiscoveryFailed(reason)) => {
                        log::error!("Border Agent discovery failed: {reason}");
                        self.shut_down().await;
                        self.shared.publish_failed(reason);
                        return;
                    }
                    None => {
                        log::warn!("mDNS backend closed its event channel");
                        self.shut_down().await;
                        return;
                    }
                },
                Some(info) = resolved_rx.recv() => self.on_resolved(info),
            }
        }
    }

    fn on_service_found(&self, descriptor: ServiceDescriptor) {
        log::debug!("Service found: {}", descriptor.instance_name);
        self.shared
            .live()
            .insert(descriptor.instance_name.clone());
        match self.queue.push(descriptor) {
            PushOutcome::Queued | PushOutcome::Duplicate => {}
            PushOutcome::DroppedOldest(dropped) => log::warn!(
                "Resolution queue full, dropped {}",
                dropped.instance_name
            ),
        }
    }

    fn on_service_lost(&self, descriptor: &ServiceDescriptor) {
        log::debug!("Service lost: {}", descriptor.instance_name);
        self.queue.remove(&descriptor.instance_name);
        self.shared.live().remove(&descriptor.instance_name);
        let known = self.shared.agents().remove(&descriptor.instance_name);
        let discriminator = descriptor
            .txt
            .as_ref()
            .and_then(|txt| txt.discriminator())
            .or_else(|| known.map(|agent| agent.discriminator))
            .or_else(|| discriminator_of(descriptor));
        match discriminator {
            Some(discriminator) => self.shared.publish_lost(discriminator),
            None => log::debug!(
                "Ignoring loss of unidentified service {}",
                descriptor.instance_name
            ),
        }
    }

    fn on_resolved(&self, info: BorderAgentInfo) {
        if !self.shared.live().contains(&info.instance_name) {
            log::debug!(
                "Dropping resolution of {}, lost while resolving",
                info.instance_name
            );
            return;
        }
        self.shared.publish_found(info);
    }

    async fn shut_down(&self) {
        self.cancel.cancel();
        self.queue.clear();
        // Errors are already logged; nobody is waiting on this path.
        let _ = shutdown_backend(self.backend.as_ref(), &self.service_type, &self.os_active).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResolvedService;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Backend whose browse events are driven by the test
    #[derive(Default)]
    struct ScriptedBackend {
        sender: Mutex<Option<mpsc::UnboundedSender<BackendEvent>>>,
        services: Mutex<HashMap<String, ResolvedService>>,
        stops: AtomicUsize,
        releases: AtomicUsize,
    }

    impl ScriptedBackend {
        fn emit(&self, event: BackendEvent) {
            let sender = self.sender.lock().unwrap();
            sender.as_ref().unwrap().send(event).unwrap();
        }

        fn announce(&self, service: ResolvedService) {
            let desc = ServiceDescriptor::new(service.instance_name.clone(), MESHCOP_SERVICE_TYPE);
            self.services
                .lock()
                .unwrap()
                .insert(service.instance_name.clone(), service);
            self.emit(BackendEvent::ServiceFound(desc));
        }
    }

    #[async_trait]
    impl ServiceBackend for ScriptedBackend {
        async fn release_multicast_lock(&self) -> Result<(), DiscoveryError> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn start_discovery(
            &self,
            _service_type: &str,
        ) -> Result<mpsc::UnboundedReceiver<BackendEvent>, DiscoveryError> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.sender.lock().unwrap() = Some(tx);
            Ok(rx)
        }

        async fn stop_discovery(&self, _service_type: &str) -> Result<(), DiscoveryError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn resolve(
            &self,
            descriptor: &ServiceDescriptor,
        ) -> Result<ResolvedService, DiscoveryError> {
            self.services
                .lock()
                .unwrap()
                .get(&descriptor.instance_name)
                .cloned()
                .ok_or_else(|| DiscoveryError::ResolveFailed {
                    instance_name: descriptor.instance_name.clone(),
                    reason: "unknown".to_string(),
                })
        }
    }

    fn border_router(name: &str, host: &str) -> ResolvedService {
        ResolvedService::new(name, host.parse().unwrap(), 49154)
            .with_txt("nn", "Net1")
            .with_txt("xp", [0x11u8, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88])
    }

    async fn next_event(rx: &mut broadcast::Receiver<DiscoveryEvent>) -> DiscoveryEvent {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_found_then_lost_by_instance() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut discoverer = BorderAgentDiscoverer::new(backend.clone());
        let mut events = discoverer.subscribe();
        discoverer.start().await.unwrap();

        backend.announce(border_router("BR1", "10.0.0.1"));
        let DiscoveryEvent::Found(info) = next_event(&mut events).await else {
            panic!("expected Found");
        };
        assert_eq!(info.discriminator, "10.0.0.1");
        assert_eq!(discoverer.discovered_agents().len(), 1);

        // Loss events carry only the instance name.
        backend.emit(BackendEvent::ServiceLost(ServiceDescriptor::new(
            "BR1",
            MESHCOP_SERVICE_TYPE,
        )));
        assert_eq!(
            next_event(&mut events).await,
            DiscoveryEvent::Lost {
                discriminator: "10.0.0.1".to_string()
            }
        );
        assert!(discoverer.discovered_agents().is_empty());

        discoverer.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut discoverer = BorderAgentDiscoverer::new(backend.clone());

        discoverer.stop().await.unwrap();
        discoverer.start().await.unwrap();
        discoverer.start().await.unwrap();
        assert!(discoverer.is_running());
        discoverer.stop().await.unwrap();
        discoverer.stop().await.unwrap();

        assert!(!discoverer.is_running());
        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
        assert_eq!(backend.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_stops_browse_and_releases_lock() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut discoverer = BorderAgentDiscoverer::new(backend.clone());
        discoverer.start().await.unwrap();
        drop(discoverer);

        tokio::time::timeout(Duration::from_secs(1), async {
            while backend.releases.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("multicast lock not released");
        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_after_stop_does_nothing() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut discoverer = BorderAgentDiscoverer::new(backend.clone());
        discoverer.start().await.unwrap();
        discoverer.stop().await.unwrap();
        drop(discoverer);

        tokio::task::yield_now().await;
        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
        assert_eq!(backend.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_browse_failure_stops_discovery() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut discoverer = BorderAgentDiscoverer::new(backend.clone());
        let mut events = discoverer.subscribe();
        discoverer.start().await.unwrap();

        backend.emit(BackendEvent::DiscoveryFailed("socket closed".to_string()));
        assert_eq!(
            next_event(&mut events).await,
            DiscoveryEvent::Failed("socket closed".to_string())
        );
        assert!(!discoverer.is_running());
        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);

        // A later stop must not stop the OS browse a second time.
        discoverer.stop().await.unwrap();
        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
        assert_eq!(backend.releases.load(Ordering::SeqCst), 1);
    }
}
