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

//! mDNS service backend trait

use crate::{DiscoveryError, TxtRecords};
use async_trait::async_trait;
use core::net::IpAddr;
use tokio::sync::mpsc;

/// Raw service descriptor reported by the OS browse callback
///
/// Browse results usually carry only the instance name. Host and TXT records
/// are present when the backend already knows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Service instance name
    pub instance_name: String,
    /// Service type (e.g. `_meshcop._udp.local.`)
    pub service_type: String,
    /// Host address, if known
    pub host: Option<IpAddr>,
    /// TXT records, if known
    pub txt: Option<TxtRecords>,
}

impl ServiceDescriptor {
    /// Descriptor with only an instance name
    pub fn new(instance_name: impl Into<String>, service_type: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            service_type: service_type.into(),
            host: None,
            txt: None,
        }
    }

    /// Attach a host address
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = Some(host);
        self
    }

    /// Attach TXT records
    pub fn with_txt(mut self, txt: TxtRecords) -> Self {
        self.txt = Some(txt);
        self
    }
}

/// A fully resolved service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedService {
    /// Service instance name
    pub instance_name: String,
    /// Host address
    pub host: IpAddr,
    /// Port
    pub port: u16,
    /// TXT records
    pub txt: TxtRecords,
}

impl ResolvedService {
    /// Resolved service with empty TXT records
    pub fn new(instance_name: impl Into<String>, host: IpAddr, port: u16) -> Self {
        Self {
            instance_name: instance_name.into(),
            host,
            port,
            txt: TxtRecords::new(),
        }
    }

    /// Add a TXT entry
    pub fn with_txt(mut self, key: &str, value: impl Into<Vec<u8>>) -> Self {
        self.txt.insert(key, value);
        self
    }

    /// Browse-level descriptor for this service
    pub fn descriptor(&self, service_type: &str) -> ServiceDescriptor {
        ServiceDescriptor::new(self.instance_name.clone(), service_type)
            .with_host(self.host)
            .with_txt(self.txt.clone())
    }
}

/// Events delivered by the OS browse callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// A service instance appeared
    ServiceFound(ServiceDescriptor),
    /// A service instance went away
    ServiceLost(ServiceDescriptor),
    /// The browse itself failed; no further events follow
    DiscoveryFailed(String),
}

/// OS-level mDNS service contract
///
/// Implementations wrap a platform DNS-SD service. Browse callbacks are
/// delivered as [`BackendEvent`]s on the returned channel and must never block.
/// [`resolve`](Self::resolve) is not safe for concurrent use; callers go
/// through a [`ResolutionQueue`](crate::ResolutionQueue).
#[async_trait]
pub trait ServiceBackend: Send + Sync + 'static {
    /// Acquire the multicast lock needed to receive mDNS traffic
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::MulticastLock` if the lock cannot be taken.
    async fn acquire_multicast_lock(&self) -> Result<(), DiscoveryError> {
        Ok(())
    }

    /// Release the multicast lock
    async fn release_multicast_lock(&self) -> Result<(), DiscoveryError> {
        Ok(())
    }

    /// Start browsing for `service_type`
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::BrowseFailed` if browsing cannot be started.
    async fn start_discovery(
        &self,
        service_type: &str,
    ) -> Result<mpsc::UnboundedReceiver<BackendEvent>, DiscoveryError>;

    /// Stop browsing for `service_type`
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::StopBrowseFailed` if browsing cannot be stopped.
    async fn stop_discovery(&self, service_type: &str) -> Result<(), DiscoveryError>;

    /// Resolve one service to its host, port and TXT records
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::ResolveFailed` if the service cannot be resolved.
    async fn resolve(&self, descriptor: &ServiceDescriptor)
        -> Result<ResolvedService, DiscoveryError>;
}
