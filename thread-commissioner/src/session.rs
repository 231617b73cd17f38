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

//! Commissioning session state machine
//!
//! A session petitions one Border Agent, does one piece of work (fetch the
//! active dataset, or admit a joiner) and resigns. Whatever the outcome,
//! `resign()` is called exactly once before the session method returns. If
//! the method's future is dropped part way, outstanding requests are
//! cancelled and the resign runs on a spawned task instead.

use crate::{
    CommissionerBackend, CommissionerConfig, CommissionerDataset, CommissionerEvent,
    CommissionerHandler, CommissioningError, CommissioningState, DatasetFlags, NativeError, Stage,
};
use core::future::Future;
use core::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thread_common::ThreadNetworkCredential;
use thread_crypto::{JoinerId, SteeringData};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Joiner wait ceiling when none is configured
pub const DEFAULT_JOINER_TIMEOUT: Duration = Duration::from_secs(200);

/// One petition/work/resign cycle against a Border Agent
pub struct CommissioningSession<B: CommissionerBackend + ?Sized> {
    backend: Arc<B>,
    cancel: CancellationToken,
    state: watch::Sender<CommissioningState>,
    history: Vec<CommissioningState>,
    handler: Option<CommissionerHandler>,
    events: Option<mpsc::UnboundedReceiver<CommissionerEvent>>,
    joiner_timeout: Duration,
    resigned: Arc<AtomicBool>,
}

impl<B: CommissionerBackend + ?Sized> CommissioningSession<B> {
    /// New idle session; `cancel` aborts it from another task
    pub fn new(backend: Arc<B>, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(CommissioningState::Idle);
        Self {
            backend,
            cancel,
            state,
            history: vec![CommissioningState::Idle],
            handler: None,
            events: None,
            joiner_timeout: DEFAULT_JOINER_TIMEOUT,
            resigned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the joiner wait ceiling
    pub fn with_joiner_timeout(mut self, timeout: Duration) -> Self {
        self.joiner_timeout = timeout;
        self
    }

    /// Current state
    pub fn state(&self) -> CommissioningState {
        *self.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<CommissioningState> {
        self.state.subscribe()
    }

    /// Every state entered so far, oldest first
    pub fn history(&self) -> &[CommissioningState] {
        &self.history
    }

    /// Outcome of a finished session
    pub fn outcome(&self) -> Option<CommissioningState> {
        self.history.iter().rev().copied().find(|s| s.is_outcome())
    }

    /// Whether `resign()` has been called
    pub fn is_resigned(&self) -> bool {
        self.resigned.load(Ordering::Acquire)
    }

    /// Petition `target` and read its Active Operational Dataset
    ///
    /// Goes straight from `Petitioned` to `Joined`; nothing is awaited from
    /// the network besides the dataset itself.
    ///
    /// # Errors
    ///
    /// `Native` with the failing stage, `Dataset` if the TLVs are malformed,
    /// `Cancelled`, or `InvalidState` if the session was already used.
    pub async fn fetch_active_dataset(
        &mut self,
        config: &CommissionerConfig,
        target: SocketAddr,
    ) -> Result<ThreadNetworkCredential, CommissioningError> {
        self.ensure_idle()?;
        let _guard = self.resign_guard();
        let result = self.fetch_inner(config, target).await;
        self.finish(result).await
    }

    /// Petition `target` and admit a joiner
    ///
    /// With `joiner` set, only that device passes the steering data and only
    /// its finalize completes the wait; otherwise any joiner does. Rejected
    /// finalizes are ignored.
    ///
    /// # Errors
    ///
    /// `TimedOut` when no joiner finalized in time, `Native` with the failing
    /// stage, `Cancelled`, or `InvalidState` if the session was already used.
    pub async fn commission_joiner(
        &mut self,
        config: &CommissionerConfig,
        target: SocketAddr,
        joiner: Option<JoinerId>,
    ) -> Result<JoinerId, CommissioningError> {
        self.ensure_idle()?;
        let _guard = self.resign_guard();
        let result = self.join_inner(config, target, joiner).await;
        self.finish(result).await
    }

    async fn fetch_inner(
        &mut self,
        config: &CommissionerConfig,
        target: SocketAddr,
    ) -> Result<ThreadNetworkCredential, CommissioningError> {
        self.initialize(config).await?;
        self.petition(target).await?;

        let backend = self.backend.clone();
        let tlvs = self
            .cancellable(backend.get_raw_active_dataset(DatasetFlags::all()))
            .await?
            .map_err(CommissioningError::native(Stage::GetDataset))?;
        let credential = ThreadNetworkCredential::from_tlvs(tlvs)?;
        info!(
            network_name = credential.network_name().unwrap_or_default(),
            "Fetched active operational dataset"
        );
        Ok(credential)
    }

    async fn join_inner(
        &mut self,
        config: &CommissionerConfig,
        target: SocketAddr,
        joiner: Option<JoinerId>,
    ) -> Result<JoinerId, CommissioningError> {
        self.initialize(config).await?;
        self.petition(target).await?;

        let steering = match &joiner {
            Some(id) => SteeringData::for_joiners([id]),
            None => SteeringData::allow_all(),
        };
        let dataset = CommissionerDataset::with_steering_data(steering);
        let backend = self.backend.clone();
        self.cancellable(backend.set_commissioner_dataset(&dataset))
            .await?
            .map_err(CommissioningError::native(Stage::SetDataset))?;

        self.transition(CommissioningState::AwaitingJoiner);
        self.wait_for_joiner(joiner).await
    }

    async fn initialize(&mut self, config: &CommissionerConfig) -> Result<(), CommissioningError> {
        self.transition(CommissioningState::Initializing);
        let (handler, events) = CommissionerHandler::new(config.log_sink.clone());
        self.handler = Some(handler.clone());
        self.events = Some(events);

        let backend = self.backend.clone();
        self.cancellable(backend.init(config, handler))
            .await?
            .map_err(CommissioningError::native(Stage::Init))
    }

    async fn petition(&mut self, target: SocketAddr) -> Result<(), CommissioningError> {
        self.transition(CommissioningState::Petitioning);
        let backend = self.backend.clone();
        self.cancellable(backend.petition(target.ip(), target.port()))
            .await?
            .map_err(CommissioningError::native(Stage::Petition))?;
        info!(border_agent = %target, "Petitioned as active commissioner");
        self.transition(CommissioningState::Petitioned);
        Ok(())
    }

    /// Wait for a joiner finalize, cancellation or the deadline
    async fn wait_for_joiner(
        &mut self,
        expected: Option<JoinerId>,
    ) -> Result<JoinerId, CommissioningError> {
        let Some(mut events) = self.events.take() else {
            return Err(CommissioningError::InvalidState(self.state()));
        };
        let deadline = Instant::now() + self.joiner_timeout;
        let result = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.backend.cancel_requests();
                    break Err(CommissioningError::Cancelled);
                }
                event = events.recv() => match event {
                    Some(CommissionerEvent::JoinerFinalize { joiner_id, accepted: true })
                        if expected.map_or(true, |id| id == joiner_id) =>
                    {
                        info!(%joiner_id, "Joiner finalized");
                        break Ok(joiner_id);
                    }
                    Some(CommissionerEvent::JoinerFinalize { joiner_id, accepted }) => {
                        warn!(%joiner_id, accepted, "Ignoring joiner finalize");
                    }
                    Some(event) => debug!(?event, "Commissioner event"),
                    None => break Err(CommissioningError::WorkerGone),
                },
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(timeout = ?self.joiner_timeout, "No joiner finalized in time");
                    break Err(CommissioningError::TimedOut(self.joiner_timeout));
                }
            }
        };
        self.events = Some(events);
        result
    }

    /// Run a native call unless the session is cancelled first
    ///
    /// On cancellation outstanding native requests are aborted.
    async fn cancellable<T>(
        &self,
        call: impl Future<Output = Result<T, NativeError>>,
    ) -> Result<Result<T, NativeError>, CommissioningError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.backend.cancel_requests();
                Err(CommissioningError::Cancelled)
            }
            result = call => Ok(result),
        }
    }

    fn resign_guard(&self) -> ResignGuard<B> {
        ResignGuard {
            backend: self.backend.clone(),
            resigned: self.resigned.clone(),
        }
    }

    fn ensure_idle(&self) -> Result<(), CommissioningError> {
        match self.state() {
            CommissioningState::Idle => Ok(()),
            state => Err(CommissioningError::InvalidState(state)),
        }
    }

    /// Record the outcome, then resign
    async fn finish<T>(
        &mut self,
        result: Result<T, CommissioningError>,
    ) -> Result<T, CommissioningError> {
        let outcome = match &result {
            Ok(_) => CommissioningState::Joined,
            Err(CommissioningError::TimedOut(_)) => CommissioningState::TimedOut,
            Err(CommissioningError::Cancelled) => CommissioningState::Cancelled,
            Err(e) => {
                warn!(error = %e, "Commissioning failed");
                CommissioningState::Failed
            }
        };
        self.transition(outcome);
        self.resign().await;
        result
    }

    /// Resign the commissioner role; later calls do nothing
    pub async fn resign(&mut self) {
        if self.resigned.swap(true, Ordering::AcqRel) {
            trace!("Already resigned");
            return;
        }
        if let Err(e) = self.backend.resign().await {
            warn!(error = %e, "Resign failed");
        }
        self.handler = None;
        self.events = None;
        self.transition(CommissioningState::Resigned);
    }

    fn transition(&mut self, next: CommissioningState) {
        let current = self.state();
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            error!("Invalid state transition {current} -> {next}");
            return;
        }
        trace!("STATE_TRANSITION: {current} -> {next}");
        self.history.push(next);
        self.state.send_replace(next);
    }
}

/// Resigns on a spawned task if a session method is dropped before it
/// resigned itself
struct ResignGuard<B: CommissionerBackend + ?Sized> {
    backend: Arc<B>,
    resigned: Arc<AtomicBool>,
}

impl<B: CommissionerBackend + ?Sized> Drop for ResignGuard<B> {
    fn drop(&mut self) {
        if self.resigned.swap(true, Ordering::AcqRel) {
            return;
        }
        warn!("Commissioning session dropped before resigning");
        self.backend.cancel_requests();

        let backend = self.backend.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = backend.resign().await {
                        warn!(error = %e, "Resign failed");
                    }
                });
            }
            Err(_) => error!("No runtime left to resign the dropped session on"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use async_trait::async_trait;
    use core::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thread_common::{DatasetBuilder, ExtendedPanId, Pskc};

    /// Succeeds at everything and counts resigns
    #[derive(Default)]
    struct HappyBackend {
        resigns: AtomicUsize,
        fail_petition: bool,
    }

    #[async_trait]
    impl CommissionerBackend for HappyBackend {
        async fn init(
            &self,
            _config: &CommissionerConfig,
            _handler: CommissionerHandler,
        ) -> Result<(), NativeError> {
            Ok(())
        }

        async fn petition(&self, _address: IpAddr, _port: u16) -> Result<(), NativeError> {
            if self.fail_petition {
                return Err(NativeError::new(ErrorCode::Rejected, "existing commissioner: other"));
            }
            Ok(())
        }

        async fn set_commissioner_dataset(
            &self,
            _dataset: &CommissionerDataset,
        ) -> Result<(), NativeError> {
            Ok(())
        }

        async fn get_raw_active_dataset(
            &self,
            _flags: DatasetFlags,
        ) -> Result<Vec<u8>, NativeError> {
            let credential = DatasetBuilder::new()
                .network_name("Net1")
                .extended_pan_id(ExtendedPanId::from(1u64))
                .build()
                .unwrap();
            Ok(credential.into_tlvs())
        }

        async fn resign(&self) -> Result<(), NativeError> {
            self.resigns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn cancel_requests(&self) {}
    }

    fn config() -> CommissionerConfig {
        CommissionerConfig::new(Pskc::from_bytes([1; 16]))
    }

    fn target() -> SocketAddr {
        "192.168.1.10:49154".parse().unwrap()
    }

    #[tokio::test]
    async fn test_fetch_walks_states_and_resigns_once() {
        let backend = Arc::new(HappyBackend::default());
        let mut session = CommissioningSession::new(backend.clone(), CancellationToken::new());
        let credential = session.fetch_active_dataset(&config(), target()).await.unwrap();

        assert_eq!(credential.network_name(), Some("Net1"));
        assert_eq!(
            session.history(),
            [
                CommissioningState::Idle,
                CommissioningState::Initializing,
                CommissioningState::Petitioning,
                CommissioningState::Petitioned,
                CommissioningState::Joined,
                CommissioningState::Resigned,
            ]
        );
        assert_eq!(session.outcome(), Some(CommissioningState::Joined));

        session.resign().await;
        assert_eq!(backend.resigns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_is_single_use() {
        let backend = Arc::new(HappyBackend::default());
        let mut session = CommissioningSession::new(backend.clone(), CancellationToken::new());
        session.fetch_active_dataset(&config(), target()).await.unwrap();
        assert!(matches!(
            session.fetch_active_dataset(&config(), target()).await,
            Err(CommissioningError::InvalidState(CommissioningState::Resigned))
        ));
        assert_eq!(backend.resigns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_petition_rejection_is_surfaced_verbatim() {
        let backend = Arc::new(HappyBackend {
            fail_petition: true,
            ..HappyBackend::default()
        });
        let mut session = CommissioningSession::new(backend.clone(), CancellationToken::new());
        let err = session
            .fetch_active_dataset(&config(), target())
            .await
            .unwrap_err();
        assert_eq!(err.native_code(), Some(ErrorCode::Rejected));
        assert!(err.to_string().contains("existing commissioner: other"));
        assert_eq!(session.outcome(), Some(CommissioningState::Failed));
        assert!(session.is_resigned());
        assert_eq!(backend.resigns.load(Ordering::SeqCst), 1);
    }
}
