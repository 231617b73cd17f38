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

//! Single-session commissioner worker

use crate::session::DEFAULT_JOINER_TIMEOUT;
use crate::{
    CommissionerBackend, CommissionerConfig, CommissioningError, CommissioningSession,
    CommissioningState, Stage,
};
use core::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thread_common::{ExtendedPanId, Pskc, ThreadNetworkCredential};
use thread_crypto::JoinerId;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owner of a native commissioner
///
/// Runs each session on its own task so callers stay responsive. Only one
/// session may use the native commissioner at a time; starting a second one
/// while the first is active fails with `SessionActive`.
pub struct Commissioner<B: CommissionerBackend + ?Sized> {
    backend: Arc<B>,
    active: Arc<Mutex<()>>,
    joiner_timeout: Duration,
}

impl<B: CommissionerBackend + ?Sized> Clone for Commissioner<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            active: self.active.clone(),
            joiner_timeout: self.joiner_timeout,
        }
    }
}

impl<B: CommissionerBackend + ?Sized> Commissioner<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            active: Arc::new(Mutex::new(())),
            joiner_timeout: DEFAULT_JOINER_TIMEOUT,
        }
    }

    /// Set how long `commission_joiner` waits for a joiner
    pub fn with_joiner_timeout(mut self, timeout: Duration) -> Self {
        self.joiner_timeout = timeout;
        self
    }

    /// Whether a session is running
    pub fn is_busy(&self) -> bool {
        self.active.try_lock().is_err()
    }

    /// Derive a network's PSKc through the native library
    ///
    /// # Errors
    ///
    /// Returns `Native` with stage `GeneratePskc` if the inputs are rejected.
    pub async fn generate_pskc(
        &self,
        passphrase: &str,
        network_name: &str,
        extended_pan_id: &ExtendedPanId,
    ) -> Result<Pskc, CommissioningError> {
        self.backend
            .generate_pskc(passphrase, network_name, extended_pan_id)
            .await
            .map_err(CommissioningError::native(Stage::GeneratePskc))
    }

    /// Start a session that fetches the Active Operational Dataset
    ///
    /// # Errors
    ///
    /// Returns `SessionActive` if another session is running.
    pub fn fetch_credential(
        &self,
        config: CommissionerConfig,
        target: SocketAddr,
    ) -> Result<SessionHandle<ThreadNetworkCredential>, CommissioningError> {
        self.spawn(move |mut session| async move {
            session.fetch_active_dataset(&config, target).await
        })
    }

    /// Start a session that admits a joiner
    ///
    /// # Errors
    ///
    /// Returns `SessionActive` if another session is running.
    pub fn commission_joiner(
        &self,
        config: CommissionerConfig,
        target: SocketAddr,
        joiner: Option<JoinerId>,
    ) -> Result<SessionHandle<JoinerId>, CommissioningError> {
        self.spawn(move |mut session| async move {
            session.commission_joiner(&config, target, joiner).await
        })
    }

    fn spawn<T, F, Fut>(&self, run: F) -> Result<SessionHandle<T>, CommissioningError>
    where
        T: Send + 'static,
        F: FnOnce(CommissioningSession<B>) -> Fut,
        Fut: core::future::Future<Output = Result<T, CommissioningError>> + Send + 'static,
    {
        let guard: OwnedMutexGuard<()> = self
            .active
            .clone()
            .try_lock_owned()
            .map_err(|_| CommissioningError::SessionActive)?;

        let cancel = CancellationToken::new();
        let session = CommissioningSession::new(self.backend.clone(), cancel.clone())
            .with_joiner_timeout(self.joiner_timeout);
        let state = session.subscribe();
        let work = run(session);
        let task = tokio::spawn(async move {
            let result = work.await;
            drop(guard);
            result
        });

        Ok(SessionHandle {
            state,
            cancel,
            task,
        })
    }
}

/// Handle to a running session
pub struct SessionHandle<T> {
    state: watch::Receiver<CommissioningState>,
    cancel: CancellationToken,
    task: JoinHandle<Result<T, CommissioningError>>,
}

impl<T> SessionHandle<T> {
    /// Latest state
    pub fn state(&self) -> CommissioningState {
        *self.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<CommissioningState> {
        self.state.clone()
    }

    /// Cancel the session; it resigns and ends with `Cancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this session
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the session to end
    ///
    /// # Errors
    ///
    /// The session's error, or `WorkerGone` if its task panicked.
    pub async fn wait(self) -> Result<T, CommissioningError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Commissioning task failed");
                Err(CommissioningError::WorkerGone)
            }
        }
    }
}
