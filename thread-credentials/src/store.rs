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

//! Credential store contract

use crate::{BorderAgentRecord, StoreError};
use async_trait::async_trait;
use thread_common::ExtendedPanId;

/// Cache of Border Agent credentials
///
/// A cache, not the source of truth: a miss is normal and callers fall back
/// to fetching the credential from the network. Storing is split in two so
/// an existing credential is never overwritten by accident:
///
/// - [`upsert_if_absent`](Self::upsert_if_absent) inserts only when the
///   discriminator is unknown and otherwise leaves the stored row untouched
/// - [`replace`](Self::replace) deletes and re-inserts in one transaction
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Record stored under `discriminator`
    async fn get(&self, discriminator: &str) -> Result<Option<BorderAgentRecord>, StoreError>;

    /// Every record for the network `(network_name, extended_pan_id)`
    async fn get_by_identity(
        &self,
        network_name: &str,
        extended_pan_id: &ExtendedPanId,
    ) -> Result<Vec<BorderAgentRecord>, StoreError>;

    /// Insert `record` unless its discriminator is already stored
    ///
    /// Returns whether the record was inserted.
    async fn upsert_if_absent(&self, record: &BorderAgentRecord) -> Result<bool, StoreError>;

    /// Store `record`, overwriting any record with the same discriminator
    async fn replace(&self, record: &BorderAgentRecord) -> Result<(), StoreError>;

    /// Delete the record stored under `discriminator`
    ///
    /// Returns whether a record was deleted.
    async fn delete(&self, discriminator: &str) -> Result<bool, StoreError>;

    /// Every record, ordered by discriminator
    async fn list_all(&self) -> Result<Vec<BorderAgentRecord>, StoreError>;
}
