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

//! Commissioner callbacks as one event channel
//!
//! The native library reports joiner progress through a handler with many
//! callbacks, on its own threads. [`CommissionerHandler`] turns each callback
//! into a [`CommissionerEvent`] on a single channel that the session consumes.

use crate::NativeError;
use std::sync::Arc;
use thread_crypto::JoinerId;
use tokio::sync::mpsc;

/// Events reported by the native commissioner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommissionerEvent {
    /// A joiner asked to join
    JoinerRequest { joiner_id: JoinerId },

    /// DTLS session with a joiner finished; `error` is set on failure
    JoinerConnected {
        joiner_id: JoinerId,
        error: Option<NativeError>,
    },

    /// A joiner finished commissioning
    JoinerFinalize { joiner_id: JoinerId, accepted: bool },

    /// Result of a commissioner keep-alive
    KeepAliveResponse { error: Option<NativeError> },

    /// The network's active or pending dataset changed
    DatasetChanged,
}

/// Native log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Critical,
    Error,
    Warn,
    Info,
    Debug,
}

/// Receives native commissioner log lines
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, region: &str, message: &str);
}

/// Forwards native log lines to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, region: &str, message: &str) {
        match level {
            LogLevel::Critical | LogLevel::Error => {
                tracing::error!(target: "commissioner", region, "{message}")
            }
            LogLevel::Warn => tracing::warn!(target: "commissioner", region, "{message}"),
            LogLevel::Info => tracing::info!(target: "commissioner", region, "{message}"),
            LogLevel::Debug => tracing::debug!(target: "commissioner", region, "{message}"),
        }
    }
}

/// Callback surface handed to the native commissioner in `init`
///
/// Cheap to clone; every clone feeds the same session. Callbacks after the
/// session has ended are dropped.
#[derive(Clone)]
pub struct CommissionerHandler {
    events: mpsc::UnboundedSender<CommissionerEvent>,
    log_sink: Arc<dyn LogSink>,
}

impl CommissionerHandler {
    /// Create a handler and the receiving end of its events
    pub fn new(log_sink: Arc<dyn LogSink>) -> (Self, mpsc::UnboundedReceiver<CommissionerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events, log_sink }, rx)
    }

    fn send(&self, event: CommissionerEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("Commissioner event after session end");
        }
    }

    pub fn on_joiner_request(&self, joiner_id: JoinerId) {
        self.send(CommissionerEvent::JoinerRequest { joiner_id });
    }

    pub fn on_joiner_connected(&self, joiner_id: JoinerId, error: Option<NativeError>) {
        self.send(CommissionerEvent::JoinerConnected { joiner_id, error });
    }

    pub fn on_joiner_finalize(&self, joiner_id: JoinerId, accepted: bool) {
        self.send(CommissionerEvent::JoinerFinalize {
            joiner_id,
            accepted,
        });
    }

    pub fn on_keep_alive_response(&self, error: Option<NativeError>) {
        self.send(CommissionerEvent::KeepAliveResponse { error });
    }

    pub fn on_dataset_changed(&self) {
        self.send(CommissionerEvent::DatasetChanged);
    }

    /// Native log line; goes straight to the log sink, not the event channel
    pub fn log(&self, level: LogLevel, region: &str, message: &str) {
        self.log_sink.log(level, region, message);
    }
}

impl std::fmt::Debug for CommissionerHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommissionerHandler")
            .field("closed", &self.events.is_closed())
            .finish_non_exhaustive()
    }
}
