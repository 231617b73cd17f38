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

//! Thread Common Types
//!
//! Value types shared by the discovery, commissioning and credential layers:
//!
//! - [`ExtendedPanId`] and [`Pskc`]: fixed-size network identifiers and keys
//! - [`ThreadNetworkCredential`]: the Active Operational Dataset as returned
//!   by a Border Agent, kept as its encoded MeshCoP TLV blob
//! - [`tlv`]: the MeshCoP TLV framing used by the dataset

pub mod dataset;
pub mod error;
pub mod tlv;
pub mod types;

pub use dataset::{DatasetBuilder, ThreadNetworkCredential};
pub use error::{IdentifierError, TlvError};
pub use types::{ExtendedPanId, Pskc, EXTENDED_PAN_ID_LEN, MAX_NETWORK_NAME_LEN, PSKC_LEN};
