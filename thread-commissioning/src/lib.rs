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

//! Thread commissioning
//!
//! Ties Border Agent discovery, the credential cache and the commissioner
//! together: [`CommissioningFlow`] turns a discovered [`BorderAgentInfo`]
//! into a network credential, asking for a password only when the cache has
//! nothing for the network. Also home of the `thread-commission` CLI.
//!
//! [`BorderAgentInfo`]: thread_discovery::BorderAgentInfo

pub mod config;
pub mod flow;
pub mod logging;

pub use config::{CommissioningConfig, ConfigError};
pub use flow::{
    CommissioningFlow, CredentialSource, FetchedCredential, FlowError, PasswordProvider,
};
