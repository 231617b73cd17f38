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

//! SQLite credential store

use crate::record::BorderAgentRow;
use crate::schema::border_agent_table::dsl::*;
use crate::{BorderAgentRecord, CredentialStore, StoreError};
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;
use thread_common::ExtendedPanId;
use tracing::{debug, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// SQLite connection pool
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Milliseconds a connection waits on a locked database
const BUSY_TIMEOUT_MS: u32 = 5000;

#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"))
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// [`CredentialStore`] backed by a SQLite file
///
/// Queries run on the blocking thread pool so async callers never wait on
/// database I/O. Clones share the connection pool.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: DbPool,
}

impl SqliteCredentialStore {
    /// Open (or create) the database at `path` and run pending migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, the pool
    /// cannot connect, or a migration fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let manager = ConnectionManager::<SqliteConnection>::new(path.to_string_lossy());
        let pool = Pool::builder()
            .connection_customizer(Box::new(ConnectionOptions))
            .build(manager)?;
        info!(path = %path.display(), "Opened credential store");
        Self::with_pool(pool)
    }

    /// Database that lives as long as the store
    ///
    /// Every SQLite in-memory connection is its own database, so the pool
    /// holds exactly one connection and never recycles it.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub fn in_memory() -> Result<Self, StoreError> {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Self::with_pool(pool)
    }

    fn with_pool(pool: DbPool) -> Result<Self, StoreError> {
        let mut conn = pool.get()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        debug!(count = applied.len(), "Ran credential store migrations");
        drop(conn);
        Ok(Self { pool })
    }

    async fn run_blocking<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

fn into_records(rows: Vec<BorderAgentRow>) -> Result<Vec<BorderAgentRecord>, StoreError> {
    rows.into_iter().map(BorderAgentRecord::try_from).collect()
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<BorderAgentRecord>, StoreError> {
        let key = key.to_string();
        let row = self
            .run_blocking(move |conn| {
                Ok(border_agent_table
                    .find(key)
                    .first::<BorderAgentRow>(conn)
                    .optional()?)
            })
            .await?;
        row.map(BorderAgentRecord::try_from).transpose()
    }

    async fn get_by_identity(
        &self,
        name: &str,
        xpanid: &ExtendedPanId,
    ) -> Result<Vec<BorderAgentRecord>, StoreError> {
        let name = name.to_string();
        let xpanid = xpanid.as_bytes().to_vec();
        let rows = self
            .run_blocking(move |conn| {
                Ok(border_agent_table
                    .filter(network_name.eq(name))
                    .filter(extended_pan_id.eq(xpanid))
                    .order(discriminator.asc())
                    .load::<BorderAgentRow>(conn)?)
            })
            .await?;
        into_records(rows)
    }

    async fn upsert_if_absent(&self, record: &BorderAgentRecord) -> Result<bool, StoreError> {
        let row = BorderAgentRow::from(record);
        let inserted = self
            .run_blocking(move |conn| {
                Ok(diesel::insert_or_ignore_into(border_agent_table)
                    .values(&row)
                    .execute(conn)?)
            })
            .await?;
        debug!(
            discriminator = %record.discriminator,
            inserted = inserted > 0,
            "Stored credential if absent"
        );
        Ok(inserted > 0)
    }

    async fn replace(&self, record: &BorderAgentRecord) -> Result<(), StoreError> {
        let row = BorderAgentRow::from(record);
        self.run_blocking(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                diesel::delete(border_agent_table.find(row.discriminator.as_str())).execute(conn)?;
                diesel::insert_into(border_agent_table)
                    .values(&row)
                    .execute(conn)?;
                Ok(())
            })
        })
        .await?;
        debug!(discriminator = %record.discriminator, "Replaced credential");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let key = key.to_string();
        let deleted = self
            .run_blocking(move |conn| {
                Ok(diesel::delete(border_agent_table.find(key)).execute(conn)?)
            })
            .await?;
        Ok(deleted > 0)
    }

    async fn list_all(&self) -> Result<Vec<BorderAgentRecord>, StoreError> {
        let rows = self
            .run_blocking(|conn| {
                Ok(border_agent_table
                    .order(discriminator.asc())
                    .load::<BorderAgentRow>(conn)?)
            })
            .await?;
        into_records(rows)
    }
}
