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

//! Scriptable commissioner

use async_trait::async_trait;
use core::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thread_commissioner::{
    CommissionerBackend, CommissionerConfig, CommissionerDataset, CommissionerHandler,
    DatasetFlags, ErrorCode, NativeError,
};
use thread_common::{ExtendedPanId, Pskc};
use thread_crypto::JoinerId;
use tokio::task::JoinHandle;

/// A call made on the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init {
        id: String,
        domain_name: String,
        enable_ccm: bool,
        pskc: Pskc,
    },
    Petition {
        address: IpAddr,
        port: u16,
    },
    SetCommissionerDataset(CommissionerDataset),
    GetRawActiveDataset(DatasetFlags),
    Resign,
    CancelRequests,
    GeneratePskc {
        network_name: String,
        extended_pan_id: ExtendedPanId,
    },
}

/// Finalize to deliver once steering data is set
#[derive(Debug, Clone, Copy)]
struct ScriptedFinalize {
    after: Duration,
    joiner_id: JoinerId,
    accepted: bool,
}

/// In-memory native commissioner
///
/// Clones share state, so a test can keep one handle while the
/// [`Commissioner`](thread_commissioner::Commissioner) owns another.
#[derive(Clone, Default)]
pub struct MockCommissionerBackend {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    calls: Mutex<Vec<Call>>,
    handler: Mutex<Option<CommissionerHandler>>,

    init_error: Mutex<Option<NativeError>>,
    petition_error: Mutex<Option<NativeError>>,
    set_dataset_error: Mutex<Option<NativeError>>,
    get_dataset_error: Mutex<Option<NativeError>>,
    petition_delay: Mutex<Duration>,

    active_dataset: Mutex<Vec<u8>>,
    finalizes: Mutex<Vec<ScriptedFinalize>>,
    timers: Mutex<Vec<JoinHandle<()>>>,

    resigns: AtomicUsize,
    cancels: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockInner {
    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn scripted(&self, slot: &Mutex<Option<NativeError>>) -> Result<(), NativeError> {
        match lock(slot).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn abort_timers(&self) {
        for timer in lock(&self.timers).drain(..) {
            timer.abort();
        }
    }
}

impl MockCommissionerBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `init` fail
    pub fn fail_init(&self, error: NativeError) {
        *lock(&self.inner.init_error) = Some(error);
    }

    /// Make `petition` fail
    pub fn fail_petition(&self, error: NativeError) {
        *lock(&self.inner.petition_error) = Some(error);
    }

    /// Make `set_commissioner_dataset` fail
    pub fn fail_set_dataset(&self, error: NativeError) {
        *lock(&self.inner.set_dataset_error) = Some(error);
    }

    /// Make `get_raw_active_dataset` fail
    pub fn fail_get_dataset(&self, error: NativeError) {
        *lock(&self.inner.get_dataset_error) = Some(error);
    }

    /// TLVs returned by `get_raw_active_dataset`
    pub fn set_active_dataset(&self, tlvs: impl Into<Vec<u8>>) {
        *lock(&self.inner.active_dataset) = tlvs.into();
    }

    /// Delay every petition by `delay`
    pub fn set_petition_delay(&self, delay: Duration) {
        *lock(&self.inner.petition_delay) = delay;
    }

    /// Report a joiner finalize `after` the steering data is set
    pub fn finalize_joiner_after(&self, after: Duration, joiner_id: JoinerId, accepted: bool) {
        lock(&self.inner.finalizes).push(ScriptedFinalize {
            after,
            joiner_id,
            accepted,
        });
    }

    /// Handler registered by the last `init`
    pub fn handler(&self) -> Option<CommissionerHandler> {
        lock(&self.inner.handler).clone()
    }

    /// Every call so far, oldest first
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.inner.calls).clone()
    }

    pub fn resign_count(&self) -> usize {
        self.inner.resigns.load(Ordering::SeqCst)
    }

    pub fn cancel_count(&self) -> usize {
        self.inner.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommissionerBackend for MockCommissionerBackend {
    async fn init(
        &self,
        config: &CommissionerConfig,
        handler: CommissionerHandler,
    ) -> Result<(), NativeError> {
        self.inner.record(Call::Init {
            id: config.id.clone(),
            domain_name: config.domain_name.clone(),
            enable_ccm: config.enable_ccm,
            pskc: config.pskc,
        });
        self.inner.scripted(&self.inner.init_error)?;
        *lock(&self.inner.handler) = Some(handler);
        Ok(())
    }

    async fn petition(&self, address: IpAddr, port: u16) -> Result<(), NativeError> {
        self.inner.record(Call::Petition { address, port });
        let delay = *lock(&self.inner.petition_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.inner.scripted(&self.inner.petition_error)
    }

    async fn set_commissioner_dataset(
        &self,
        dataset: &CommissionerDataset,
    ) -> Result<(), NativeError> {
        self.inner
            .record(Call::SetCommissionerDataset(dataset.clone()));
        self.inner.scripted(&self.inner.set_dataset_error)?;

        let Some(handler) = self.handler() else {
            return Err(NativeError::new(ErrorCode::InvalidState, "not initialized"));
        };
        let finalizes: Vec<_> = lock(&self.inner.finalizes).drain(..).collect();
        let mut timers = lock(&self.inner.timers);
        for finalize in finalizes {
            let handler = handler.clone();
            timers.push(tokio::spawn(async move {
                tokio::time::sleep(finalize.after).await;
                handler.on_joiner_request(finalize.joiner_id);
                handler.on_joiner_connected(finalize.joiner_id, None);
                handler.on_joiner_finalize(finalize.joiner_id, finalize.accepted);
            }));
        }
        Ok(())
    }

    async fn get_raw_active_dataset(&self, flags: DatasetFlags) -> Result<Vec<u8>, NativeError> {
        self.inner.record(Call::GetRawActiveDataset(flags));
        self.inner.scripted(&self.inner.get_dataset_error)?;
        Ok(lock(&self.inner.active_dataset).clone())
    }

    async fn resign(&self) -> Result<(), NativeError> {
        self.inner.record(Call::Resign);
        self.inner.resigns.fetch_add(1, Ordering::SeqCst);
        self.inner.abort_timers();
        *lock(&self.inner.handler) = None;
        Ok(())
    }

    fn cancel_requests(&self) {
        self.inner.record(Call::CancelRequests);
        self.inner.cancels.fetch_add(1, Ordering::SeqCst);
        self.inner.abort_timers();
    }

    async fn generate_pskc(
        &self,
        passphrase: &str,
        network_name: &str,
        extended_pan_id: &ExtendedPanId,
    ) -> Result<Pskc, NativeError> {
        self.inner.record(Call::GeneratePskc {
            network_name: network_name.to_string(),
            extended_pan_id: *extended_pan_id,
        });
        thread_crypto::derive_pskc(passphrase, network_name, extended_pan_id)
            .map_err(|e| NativeError::new(ErrorCode::InvalidArgs, e.to_string()))
    }
}
