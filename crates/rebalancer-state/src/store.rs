//! StateStore — redb-backed persistence for the rebalancer.
//!
//! Provides typed CRUD over `Rebalance` resources and local record sets.
//! All values are JSON-serialized into redb's `&[u8]` value columns. The
//! store supports both on-disk and in-memory backends (the latter for
//! testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::StateResult;
use crate::tables::*;
use crate::types::*;

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder().create_with_backend(backend)?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write()?;
        txn.open_table(REBALANCES)?;
        txn.open_table(RECORD_SETS)?;
        txn.commit()?;
        Ok(())
    }

    // ── Rebalances ─────────────────────────────────────────────────

    /// Insert or replace a resource, status included.
    pub fn put_rebalance(&self, resource: &Rebalance) -> StateResult<()> {
        let key = resource.key().table_key();
        let value = serde_json::to_vec(resource)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(REBALANCES)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        debug!(%key, "rebalance stored");
        Ok(())
    }

    /// Create or update a resource's metadata and spec.
    ///
    /// The stored status is kept: status belongs to the controller, not to
    /// whoever applies the spec. Returns the resource as stored.
    pub fn apply_rebalance(&self, resource: &Rebalance) -> StateResult<Rebalance> {
        let key = resource.key().table_key();
        let mut stored = resource.clone();
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(REBALANCES)?;
            let existing = table
                .get(key.as_str())?
                .map(|guard| guard.value().to_vec());
            stored.status = match existing {
                Some(bytes) => {
                    let current: Rebalance = serde_json::from_slice(&bytes)?;
                    current.status
                }
                None => RebalanceStatus::default(),
            };
            let value = serde_json::to_vec(&stored)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        debug!(%key, "rebalance applied");
        Ok(stored)
    }

    /// Get a resource by key.
    pub fn get_rebalance(&self, key: &ResourceKey) -> StateResult<Option<Rebalance>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(REBALANCES)?;
        match table.get(key.table_key().as_str())? {
            Some(guard) => {
                let resource: Rebalance = serde_json::from_slice(guard.value())?;
                Ok(Some(resource))
            }
            None => Ok(None),
        }
    }

    /// List all resources, ordered by key.
    pub fn list_rebalances(&self) -> StateResult<Vec<Rebalance>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(REBALANCES)?;
        let mut results = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let resource: Rebalance = serde_json::from_slice(value.value())?;
            results.push(resource);
        }
        Ok(results)
    }

    /// Replace only the status of a resource.
    ///
    /// Returns false if the resource no longer exists; it is not recreated.
    pub fn update_status(&self, key: &ResourceKey, status: &RebalanceStatus) -> StateResult<bool> {
        let table_key = key.table_key();
        let txn = self.db.begin_write()?;
        let updated;
        {
            let mut table = txn.open_table(REBALANCES)?;
            let existing = table
                .get(table_key.as_str())?
                .map(|guard| guard.value().to_vec());
            updated = match existing {
                Some(bytes) => {
                    let mut resource: Rebalance = serde_json::from_slice(&bytes)?;
                    resource.status = status.clone();
                    let value = serde_json::to_vec(&resource)?;
                    table.insert(table_key.as_str(), value.as_slice())?;
                    true
                }
                None => false,
            };
        }
        txn.commit()?;
        debug!(key = %table_key, updated, "rebalance status written");
        Ok(updated)
    }

    /// Delete a resource by key. Returns true if it existed.
    pub fn delete_rebalance(&self, key: &ResourceKey) -> StateResult<bool> {
        let table_key = key.table_key();
        let txn = self.db.begin_write()?;
        let existed;
        {
            let mut table = txn.open_table(REBALANCES)?;
            existed = table.remove(table_key.as_str())?.is_some();
        }
        txn.commit()?;
        debug!(key = %table_key, existed, "rebalance deleted");
        Ok(existed)
    }

    // ── Record sets ────────────────────────────────────────────────

    /// Insert or update a record set within a zone.
    pub fn put_record_set(&self, zone: &str, record: &RecordSet) -> StateResult<()> {
        let key = record.table_key(zone);
        let value = serde_json::to_vec(record)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(RECORD_SETS)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        debug!(%key, weight = ?record.weight, "record set stored");
        Ok(())
    }

    /// List all record sets of a zone, ordered by name, type, identifier.
    pub fn list_record_sets(&self, zone: &str) -> StateResult<Vec<RecordSet>> {
        let prefix = format!("{zone}/");
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RECORD_SETS)?;
        let mut results = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            if key.value().starts_with(&prefix) {
                let record: RecordSet = serde_json::from_slice(value.value())?;
                results.push(record);
            }
        }
        Ok(results)
    }
}
