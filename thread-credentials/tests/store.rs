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

//! Credential store against a SQLite file

use std::sync::Arc;
use tempfile::TempDir;
use thread_common::{DatasetBuilder, ExtendedPanId, Pskc, ThreadNetworkCredential};
use thread_credentials::{BorderAgentRecord, CredentialStore, SqliteCredentialStore};

fn xpanid() -> ExtendedPanId {
    ExtendedPanId::from(0x1122_3344_5566_7788_u64)
}

fn record(discriminator: &str, pskc: u8) -> BorderAgentRecord {
    BorderAgentRecord::new(discriminator, "Net1", xpanid(), Pskc::from_bytes([pskc; 16]))
}

fn dataset(channel: u16) -> ThreadNetworkCredential {
    DatasetBuilder::new()
        .network_name("Net1")
        .extended_pan_id(xpanid())
        .channel(0, channel)
        .build()
        .unwrap()
}

fn open() -> (TempDir, SqliteCredentialStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteCredentialStore::open(dir.path().join("credentials.db")).unwrap();
    (dir, store)
}

#[tokio::test]
async fn test_get_on_empty_database_is_absent() {
    let (_dir, store) = open();
    assert_eq!(store.get("X").await.unwrap(), None);
    assert!(store.list_all().await.unwrap().is_empty());
    assert!(store
        .get_by_identity("Net1", &xpanid())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_upsert_does_not_overwrite() {
    let (_dir, store) = open();
    let original = record("A", 1).with_dataset(dataset(11));
    assert!(store.upsert_if_absent(&original).await.unwrap());

    let newer = record("A", 2).with_dataset(dataset(25));
    assert!(!store.upsert_if_absent(&newer).await.unwrap());

    let stored = store.get("A").await.unwrap().unwrap();
    assert_eq!(stored.pskc, Pskc::from_bytes([1; 16]));
    assert_eq!(
        stored.active_operational_dataset.and_then(|d| d.channel()),
        Some(11)
    );
}

#[tokio::test]
async fn test_replace_overwrites() {
    let (_dir, store) = open();
    store.upsert_if_absent(&record("A", 1)).await.unwrap();

    let newer = record("A", 2).with_dataset(dataset(25));
    store.replace(&newer).await.unwrap();
    assert_eq!(store.get("A").await.unwrap(), Some(newer.clone()));
    assert_eq!(store.list_all().await.unwrap(), [newer]);

    let fresh = record("B", 3);
    store.replace(&fresh).await.unwrap();
    assert_eq!(store.get("B").await.unwrap(), Some(fresh));
}

#[tokio::test]
async fn test_lookup_by_identity() {
    let (_dir, store) = open();
    store.upsert_if_absent(&record("B", 1)).await.unwrap();
    store.upsert_if_absent(&record("A", 1)).await.unwrap();
    let other_network = BorderAgentRecord::new(
        "C",
        "Net2",
        ExtendedPanId::from(2u64),
        Pskc::from_bytes([9; 16]),
    );
    store.upsert_if_absent(&other_network).await.unwrap();
    let same_name = BorderAgentRecord::new(
        "D",
        "Net1",
        ExtendedPanId::from(3u64),
        Pskc::from_bytes([9; 16]),
    );
    store.upsert_if_absent(&same_name).await.unwrap();

    let found: Vec<_> = store
        .get_by_identity("Net1", &xpanid())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.discriminator)
        .collect();
    assert_eq!(found, ["A", "B"]);
}

#[tokio::test]
async fn test_delete() {
    let (_dir, store) = open();
    store.upsert_if_absent(&record("A", 1)).await.unwrap();

    assert!(store.delete("A").await.unwrap());
    assert!(!store.delete("A").await.unwrap());
    assert_eq!(store.get("A").await.unwrap(), None);
    assert!(store.upsert_if_absent(&record("A", 2)).await.unwrap());
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.db");
    let record = record("A", 1).with_dataset(dataset(15));
    {
        let store = SqliteCredentialStore::open(&path).unwrap();
        store.upsert_if_absent(&record).await.unwrap();
    }
    let store = SqliteCredentialStore::open(&path).unwrap();
    assert_eq!(store.get("A").await.unwrap(), Some(record));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_insert_once() {
    let (_dir, store) = open();
    let store: Arc<dyn CredentialStore> = Arc::new(store);

    let tasks: Vec<_> = (0..8u8)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.upsert_if_absent(&record("A", i)).await.unwrap() })
        })
        .collect();
    let mut inserted = 0;
    for task in tasks {
        if task.await.unwrap() {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(store.list_all().await.unwrap().len(), 1);
}
