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

//! Stored Border Agent credentials

use crate::schema::border_agent_table;
use crate::StoreError;
use diesel::prelude::*;
use thread_common::{ExtendedPanId, Pskc, ThreadNetworkCredential};

/// Credential of one Border Agent, keyed by discriminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderAgentRecord {
    pub discriminator: String,
    pub network_name: String,
    pub extended_pan_id: ExtendedPanId,
    pub pskc: Pskc,
    /// Set once the dataset has been fetched from the network
    pub active_operational_dataset: Option<ThreadNetworkCredential>,
}

impl BorderAgentRecord {
    pub fn new(
        discriminator: impl Into<String>,
        network_name: impl Into<String>,
        extended_pan_id: ExtendedPanId,
        pskc: Pskc,
    ) -> Self {
        Self {
            discriminator: discriminator.into(),
            network_name: network_name.into(),
            extended_pan_id,
            pskc,
            active_operational_dataset: None,
        }
    }

    pub fn with_dataset(mut self, dataset: ThreadNetworkCredential) -> Self {
        self.active_operational_dataset = Some(dataset);
        self
    }

    /// Whether this record belongs to the network `(network_name, extended_pan_id)`
    pub fn is_network(&self, network_name: &str, extended_pan_id: &ExtendedPanId) -> bool {
        self.network_name == network_name && self.extended_pan_id == *extended_pan_id
    }
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = border_agent_table)]
pub(crate) struct BorderAgentRow {
    pub discriminator: String,
    pub network_name: String,
    pub extended_pan_id: Vec<u8>,
    pub pskc: Vec<u8>,
    pub active_operational_dataset: Option<Vec<u8>>,
}

impl From<&BorderAgentRecord> for BorderAgentRow {
    fn from(record: &BorderAgentRecord) -> Self {
        Self {
            discriminator: record.discriminator.clone(),
            network_name: record.network_name.clone(),
            extended_pan_id: record.extended_pan_id.as_bytes().to_vec(),
            pskc: record.pskc.as_bytes().to_vec(),
            active_operational_dataset: record
                .active_operational_dataset
                .as_ref()
                .map(|dataset| dataset.as_tlvs().to_vec()),
        }
    }
}

impl TryFrom<BorderAgentRow> for BorderAgentRecord {
    type Error = StoreError;

    fn try_from(row: BorderAgentRow) -> Result<Self, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            discriminator: row.discriminator.clone(),
            reason,
        };
        let extended_pan_id =
            ExtendedPanId::from_slice(&row.extended_pan_id).map_err(|e| corrupt(e.to_string()))?;
        let pskc = Pskc::from_slice(&row.pskc).map_err(|e| corrupt(e.to_string()))?;
        let active_operational_dataset = row
            .active_operational_dataset
            .map(ThreadNetworkCredential::from_tlvs)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Self {
            discriminator: row.discriminator,
            network_name: row.network_name,
            extended_pan_id,
            pskc,
            active_operational_dataset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thread_common::DatasetBuilder;

    fn record() -> BorderAgentRecord {
        BorderAgentRecord::new(
            "B",
            "Net1",
            ExtendedPanId::from(0x1122_3344_5566_7788_u64),
            Pskc::from_bytes([4; 16]),
        )
    }

    #[test]
    fn test_row_conversion_keeps_every_field() {
        let dataset = DatasetBuilder::new()
            .network_name("Net1")
            .channel(0, 11)
            .build()
            .unwrap();
        let record = record().with_dataset(dataset);
        let row = BorderAgentRow::from(&record);
        assert_eq!(row.extended_pan_id, [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
        assert_eq!(BorderAgentRecord::try_from(row).unwrap(), record);
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let mut row = BorderAgentRow::from(&record());
        row.pskc.truncate(3);
        match BorderAgentRecord::try_from(row) {
            Err(StoreError::Corrupt { discriminator, .. }) => assert_eq!(discriminator, "B"),
            other => panic!("expected corrupt record, got {other:?}"),
        }
    }

    #[test]
    fn test_is_network() {
        let record = record();
        assert!(record.is_network("Net1", &ExtendedPanId::from(0x1122_3344_5566_7788_u64)));
        assert!(!record.is_network("Net2", &ExtendedPanId::from(0x1122_3344_5566_7788_u64)));
        assert!(!record.is_network("Net1", &ExtendedPanId::from(1u64)));
    }
}
