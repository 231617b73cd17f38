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

//! From a discovered Border Agent to a network credential
//!
//! ```text
//! BorderAgentInfo -> cache lookup -> hit with dataset: done
//!                                 -> hit without dataset: cached PSKc
//!                                 -> miss: password -> generatePSKc
//!                 -> petition / fetch / resign -> cache write
//! ```
//!
//! The cache never blocks commissioning: read errors count as a miss and
//! write errors are logged.

use crate::CommissioningConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use thread_commissioner::{
    Commissioner, CommissionerBackend, CommissioningError, SessionHandle,
};
use thread_common::{Pskc, ThreadNetworkCredential};
use thread_credentials::{BorderAgentRecord, CredentialStore};
use thread_crypto::JoinerId;
use thread_discovery::{BorderAgentInfo, ThreadNetworkInfo};
use tracing::{debug, info, warn};

/// Asks the user for a network's commissioning password
#[async_trait]
pub trait PasswordProvider: Send + Sync {
    /// Password for `network`, or `None` if the user declined
    async fn password(&self, network: &ThreadNetworkInfo) -> Option<String>;
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Commissioning(#[from] CommissioningError),

    /// No cached credential and no password given
    #[error("No password given for network {0}")]
    PasswordDeclined(ThreadNetworkInfo),
}

impl FlowError {
    /// Whether this was a joiner wait running out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Commissioning(e) if e.is_timeout())
    }
}

/// Where a credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Cache,
    Network,
}

/// Result of [`CommissioningFlow::fetch_credential`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCredential {
    pub credential: ThreadNetworkCredential,
    pub pskc: Pskc,
    pub source: CredentialSource,
}

/// Commissioning flow over a commissioner, a credential cache and a
/// password prompt
pub struct CommissioningFlow<B, S, P>
where
    B: CommissionerBackend + ?Sized,
    S: CredentialStore + ?Sized,
    P: PasswordProvider + ?Sized,
{
    commissioner: Commissioner<B>,
    store: Arc<S>,
    passwords: Arc<P>,
    config: CommissioningConfig,
}

impl<B, S, P> CommissioningFlow<B, S, P>
where
    B: CommissionerBackend + ?Sized,
    S: CredentialStore + ?Sized,
    P: PasswordProvider + ?Sized,
{
    pub fn new(
        backend: Arc<B>,
        store: Arc<S>,
        passwords: Arc<P>,
        config: CommissioningConfig,
    ) -> Self {
        let commissioner = Commissioner::new(backend).with_joiner_timeout(config.joiner_timeout());
        Self {
            commissioner,
            store,
            passwords,
            config,
        }
    }

    pub fn commissioner(&self) -> &Commissioner<B> {
        &self.commissioner
    }

    /// Cached record for `agent`: by discriminator, then by network identity
    ///
    /// A record under the agent's discriminator that belongs to another
    /// network is ignored.
    pub async fn cached_record(&self, agent: &BorderAgentInfo) -> Option<BorderAgentRecord> {
        match self.store.get(&agent.discriminator).await {
            Ok(Some(record)) if record.is_network(&agent.network_name, &agent.extended_pan_id) => {
                return Some(record)
            }
            Ok(Some(_)) => {
                warn!(
                    discriminator = %agent.discriminator,
                    "Cached record belongs to another network"
                );
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Credential cache lookup failed");
                return None;
            }
        }

        match self
            .store
            .get_by_identity(&agent.network_name, &agent.extended_pan_id)
            .await
        {
            Ok(records) => records.into_iter().next(),
            Err(e) => {
                warn!(error = %e, "Credential cache lookup failed");
                None
            }
        }
    }

    /// Network credential of `agent`'s Thread network
    ///
    /// Served from the cache when a dataset is stored; otherwise fetched
    /// from the Border Agent and written back to the cache.
    ///
    /// # Errors
    ///
    /// `PasswordDeclined` if a password was needed and not given, or the
    /// commissioning error of the session.
    pub async fn fetch_credential(
        &self,
        agent: &BorderAgentInfo,
    ) -> Result<FetchedCredential, FlowError> {
        let cached = self.cached_record(agent).await;
        if let Some(BorderAgentRecord {
            active_operational_dataset: Some(credential),
            pskc,
            ..
        }) = &cached
        {
            info!(discriminator = %agent.discriminator, "Credential served from cache");
            return Ok(FetchedCredential {
                credential: credential.clone(),
                pskc: *pskc,
                source: CredentialSource::Cache,
            });
        }

        let pskc = self.resolve_pskc(agent, cached.as_ref()).await?;
        let session = self
            .commissioner
            .fetch_credential(self.config.commissioner_config(pskc), agent.socket_addr())?;
        let credential = session.wait().await?;

        let record = BorderAgentRecord::new(
            agent.discriminator.clone(),
            agent.network_name.clone(),
            agent.extended_pan_id,
            pskc,
        )
        .with_dataset(credential.clone());
        self.store_record(&record, cached.as_ref()).await;

        Ok(FetchedCredential {
            credential,
            pskc,
            source: CredentialSource::Network,
        })
    }

    /// Start admitting a joiner through `agent`
    ///
    /// The returned handle reports progress and can cancel the session.
    ///
    /// # Errors
    ///
    /// `PasswordDeclined`, or `SessionActive` if a session is running.
    pub async fn commission_joiner(
        &self,
        agent: &BorderAgentInfo,
        joiner: Option<JoinerId>,
    ) -> Result<SessionHandle<JoinerId>, FlowError> {
        let cached = self.cached_record(agent).await;
        let pskc = self.resolve_pskc(agent, cached.as_ref()).await?;
        Ok(self.commissioner.commission_joiner(
            self.config.commissioner_config(pskc),
            agent.socket_addr(),
            joiner,
        )?)
    }

    /// PSKc from the cache, the discovery record, or the user's password
    async fn resolve_pskc(
        &self,
        agent: &BorderAgentInfo,
        cached: Option<&BorderAgentRecord>,
    ) -> Result<Pskc, FlowError> {
        if let Some(record) = cached {
            debug!(discriminator = %record.discriminator, "Using cached PSKc");
            return Ok(record.pskc);
        }
        if let Some(pskc) = agent.pskc {
            return Ok(pskc);
        }

        let network = agent.network();
        let Some(password) = self.passwords.password(&network).await else {
            return Err(FlowError::PasswordDeclined(network));
        };
        Ok(self
            .commissioner
            .generate_pskc(&password, &agent.network_name, &agent.extended_pan_id)
            .await?)
    }

    /// Write back a fetched credential
    ///
    /// Replaces the record the credential was looked up under when it had
    /// the same discriminator; otherwise inserts without overwriting.
    async fn store_record(&self, record: &BorderAgentRecord, cached: Option<&BorderAgentRecord>) {
        let replaces_cached =
            cached.is_some_and(|cached| cached.discriminator == record.discriminator);
        let result = if replaces_cached {
            self.store.replace(record).await
        } else {
            self.store.upsert_if_absent(record).await.map(|inserted| {
                if !inserted {
                    debug!(
                        discriminator = %record.discriminator,
                        "Keeping existing cached credential"
                    );
                }
            })
        };
        if let Err(e) = result {
            warn!(
                discriminator = %record.discriminator,
                error = %e,
                "Failed to cache credential"
            );
        }
    }
}
