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

//! Thread Commissioning Cryptography - RustCrypto Implementation
//!
//! This crate provides the key material a commissioner needs before it can
//! talk to a Border Agent:
//!
//! - [`derive_pskc`]: PSKc from the commissioning password and the network
//!   identity (PBKDF2 with AES-CMAC-PRF-128, as in Thread 1.1 section 8.4.1.2.2)
//! - [`JoinerId`] and [`SteeringData`]: the bloom filter a commissioner
//!   publishes so that only the expected joiners attempt to join
//!
//! Everything here is pure: no I/O, no global state.

mod pskc;
mod steering;

pub use pskc::{derive_pskc, PskcError, PSKC_ITERATIONS};
pub use steering::{JoinerId, SteeringData, MAX_STEERING_DATA_LEN};
