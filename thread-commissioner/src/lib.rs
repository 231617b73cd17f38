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

//! Thread commissioner sessions
//!
//! This crate drives a native Thread commissioner library, abstracted as
//! [`CommissionerBackend`], through one commissioning session at a time:
//!
//! 1. `init` with a [`CommissionerConfig`] carrying the network PSKc
//! 2. `petition` the Border Agent to become the active commissioner
//! 3. either read the Active Operational Dataset, or publish steering data
//!    and wait for a joiner to finalize
//! 4. `resign`, exactly once, whatever happened before
//!
//! [`CommissioningSession`] is the state machine. [`Commissioner`] runs
//! sessions on their own tasks and refuses to start a second one while the
//! first is active.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use thread_commissioner::{Commissioner, CommissionerBackend, CommissionerConfig};
//!
//! # async fn run(backend: Arc<dyn CommissionerBackend>) -> Result<(), Box<dyn std::error::Error>> {
//! let commissioner = Commissioner::new(backend);
//! let pskc = commissioner
//!     .generate_pskc("123456", "Net1", &0x1122334455667788u64.into())
//!     .await?;
//! let session = commissioner.fetch_credential(
//!     CommissionerConfig::new(pskc),
//!     "192.168.1.10:49154".parse()?,
//! )?;
//! let credential = session.wait().await?;
//! println!("{}", credential.to_hex());
//! # Ok(())
//! # }
//! ```

mod backend;
mod error;
mod event;
mod session;
mod state;
mod worker;

pub use backend::{
    CommissionerBackend, CommissionerConfig, CommissionerDataset, DatasetFlags,
    DEFAULT_COMMISSIONER_ID, DEFAULT_DOMAIN_NAME,
};
pub use error::{CommissioningError, ErrorCode, NativeError, Stage};
pub use event::{CommissionerEvent, CommissionerHandler, LogLevel, LogSink, TracingLogSink};
pub use session::{CommissioningSession, DEFAULT_JOINER_TIMEOUT};
pub use state::CommissioningState;
pub use worker::{Commissioner, SessionHandle};
