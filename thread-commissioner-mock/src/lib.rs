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

//! Mock native commissioner for testing commissioning sessions
//!
//! [`MockCommissionerBackend`] implements
//! [`CommissionerBackend`](thread_commissioner::CommissionerBackend) in
//! memory. Tests script failures, delays and joiner finalizes, then inspect
//! the [`Call`] log.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use thread_commissioner::{Commissioner, CommissionerConfig};
//! use thread_commissioner_mock::MockCommissionerBackend;
//! use thread_common::Pskc;
//! use thread_crypto::JoinerId;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = MockCommissionerBackend::new();
//! let joiner = JoinerId::from_bytes([0x12; 8]);
//! backend.finalize_joiner_after(Duration::from_millis(10), joiner, true);
//!
//! let commissioner = Commissioner::new(Arc::new(backend.clone()));
//! let session = commissioner.commission_joiner(
//!     CommissionerConfig::new(Pskc::from_bytes([1; 16])),
//!     "192.168.1.10:49154".parse()?,
//!     Some(joiner),
//! )?;
//! assert_eq!(session.wait().await?, joiner);
//! assert_eq!(backend.resign_count(), 1);
//! # Ok(())
//! # }
//! ```

mod backend;

pub use backend::{Call, MockCommissionerBackend};
