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

//! Serialized service resolution
//!
//! Browse callbacks push descriptors here without blocking. One worker task
//! pops them and resolves them one at a time.

use crate::attributes::parse_border_agent;
use crate::{BorderAgentInfo, ServiceBackend, ServiceDescriptor};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Result of pushing a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Queued for resolution
    Queued,
    /// The same instance is already waiting
    Duplicate,
    /// Queued; the oldest pending entry was evicted to make room
    DroppedOldest(ServiceDescriptor),
}

/// Bounded FIFO of descriptors awaiting resolution
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct ResolutionQueue {
    inner: Arc<Inner>,
}

struct Inner {
    pending: Mutex<VecDeque<ServiceDescriptor>>,
    capacity: usize,
    notify: Notify,
    resolving: AtomicBool,
}

impl ResolutionQueue {
    /// Create a queue holding at most `capacity` pending entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                notify: Notify::new(),
                resolving: AtomicBool::new(false),
            }),
        }
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<ServiceDescriptor>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a descriptor; never blocks
    pub fn push(&self, descriptor: ServiceDescriptor) -> PushOutcome {
        let outcome = {
            let mut pending = self.pending();
            if pending
                .iter()
                .any(|d| d.instance_name == descriptor.instance_name)
            {
                return PushOutcome::Duplicate;
            }
            let evicted = if pending.len() >= self.inner.capacity {
                pending.pop_front()
            } else {
                None
            };
            pending.push_back(descriptor);
            evicted.map_or(PushOutcome::Queued, PushOutcome::DroppedOldest)
        };
        self.inner.notify.notify_one();
        outcome
    }

    /// Drop a pending entry by instance name; returns whether one was removed
    pub fn remove(&self, instance_name: &str) -> bool {
        let mut pending = self.pending();
        let before = pending.len();
        pending.retain(|d| d.instance_name != instance_name);
        pending.len() != before
    }

    /// Drop every pending entry
    pub fn clear(&self) {
        self.pending().clear();
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.pending().len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }

    /// Whether a resolve is in flight
    pub fn is_resolving(&self) -> bool {
        self.inner.resolving.load(Ordering::Acquire)
    }

    async fn next(&self) -> ServiceDescriptor {
        loop {
            let notified = self.inner.notify.notified();
            if let Some(descriptor) = self.pending().pop_front() {
                return descriptor;
            }
            notified.await;
        }
    }

    /// Spawn the resolver worker
    ///
    /// The worker resolves one descriptor at a time and hands identified
    /// agents to `on_found`. Resolve and parse failures are logged and
    /// skipped. On cancellation the worker clears the queue and exits; an
    /// in-flight resolve is abandoned.
    pub fn spawn_worker<B, F>(
        &self,
        backend: Arc<B>,
        cancel: CancellationToken,
        on_found: F,
    ) -> JoinHandle<()>
    where
        B: ServiceBackend + ?Sized,
        F: Fn(BorderAgentInfo) + Send + 'static,
    {
        let queue = self.clone();
        tokio::spawn(async move {
            loop {
                let descriptor = tokio::select! {
                    _ = cancel.cancelled() => break,
                    descriptor = queue.next() => descriptor,
                };

                if queue.inner.resolving.swap(true, Ordering::AcqRel) {
                    log::error!("Resolver already busy, skipping {}", descriptor.instance_name);
                    continue;
                }
                log::debug!("Resolving {}", descriptor.instance_name);
                let result = tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = backend.resolve(&descriptor) => Some(result),
                };
                queue.inner.resolving.store(false, Ordering::Release);

                match result {
                    None => break,
                    Some(Ok(service)) => match parse_border_agent(&service) {
                        Ok(Some(info)) => on_found(info),
                        Ok(None) => log::debug!(
                            "Skipping {}: missing network name or extended PAN ID",
                            service.instance_name
                        ),
                        Err(e) => log::warn!("Skipping {}: {e}", service.instance_name),
                    },
                    Some(Err(e)) => log::warn!("{e}"),
                }
            }
            queue.clear();
            log::debug!("Resolver worker stopped");
        })
    }
}
