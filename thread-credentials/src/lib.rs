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

//! Persistent cache of Border Agent credentials
//!
//! Records are keyed by Border Agent discriminator and can also be looked up
//! by network identity (network name and extended PAN ID). The SQLite
//! implementation keeps its schema in embedded diesel migrations.

mod error;
mod record;
mod schema;
mod sqlite;
mod store;

pub use error::StoreError;
pub use record::BorderAgentRecord;
pub use sqlite::{DbPool, SqliteCredentialStore, MIGRATIONS};
pub use store::CredentialStore;
