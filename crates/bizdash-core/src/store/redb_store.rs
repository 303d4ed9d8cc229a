//! # redb-backed Row Storage
//!
//! A disk-backed data store using the redb embedded database.
//!
//! Each dashboard table is its own redb table, keyed by the row `id` and
//! holding the row as JSON bytes. Every trait call runs in exactly one redb
//! transaction, so each call is atomic and durable on its own.

use super::{
    DataStore, apply_patch, carry_created_at, require_filter, require_id, stamp_new_row,
    store_err, validate_table,
};
use crate::query::{Predicate, QueryDescriptor};
use crate::{DashError, Row};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition, TableError,
};
use std::path::Path;

/// The redb table for a dashboard table: `id -> JSON row`.
fn rows_table(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

fn encode(row: &Row) -> Result<Vec<u8>, DashError> {
    serde_json::to_vec(row).map_err(|e| DashError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Row, DashError> {
    serde_json::from_slice(bytes).map_err(|e| DashError::Serialization(e.to_string()))
}

/// A disk-backed row store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DashError> {
        let db = Database::create(path.as_ref()).map_err(|e| DashError::Io(e.to_string()))?;
        Ok(Self { db })
    }

    /// Number of rows in `table` (0 when the table was never written).
    pub fn row_count(&self, table: &str) -> Result<u64, DashError> {
        validate_table(table)?;
        let read_txn = self.db.begin_read().map_err(store_err)?;
        match read_txn.open_table(rows_table(table)) {
            Ok(t) => t.len().map_err(store_err),
            Err(TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(store_err(e)),
        }
    }

    /// Every `(id, row)` of `table` matching `predicates`, in id order.
    fn scan(&self, table: &str, predicates: &[Predicate]) -> Result<Vec<(String, Row)>, DashError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let t = match read_txn.open_table(rows_table(table)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(store_err(e)),
        };

        let mut out = Vec::new();
        for entry in t.iter().map_err(store_err)? {
            let (key, value) = entry.map_err(store_err)?;
            let row = decode(value.value())?;
            if predicates.iter().all(|p| p.matches(&row)) {
                out.push((key.value().to_string(), row));
            }
        }
        Ok(out)
    }
}

impl DataStore for RedbStore {
    fn select(&self, query: &QueryDescriptor) -> Result<Vec<Row>, DashError> {
        validate_table(&query.table)?;
        let rows = self
            .scan(&query.table, &query.predicates)?
            .into_iter()
            .map(|(_, row)| row)
            .collect();
        Ok(query.finish(rows))
    }

    fn insert(&mut self, table: &str, row: Row) -> Result<Row, DashError> {
        validate_table(table)?;
        let (id, row) = stamp_new_row(row);
        let bytes = encode(&row)?;

        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut t = write_txn.open_table(rows_table(table)).map_err(store_err)?;
            if t.get(id.as_str()).map_err(store_err)?.is_some() {
                return Err(DashError::Conflict(format!("{}/{} already exists", table, id)));
            }
            t.insert(id.as_str(), bytes.as_slice()).map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)?;
        Ok(row)
    }

    fn update(
        &mut self,
        table: &str,
        predicates: &[Predicate],
        patch: Row,
    ) -> Result<Vec<Row>, DashError> {
        validate_table(table)?;
        require_filter(predicates, "update")?;
        let matches = self.scan(table, predicates)?;
        if matches.is_empty() {
            return Ok(Vec::new());
        }

        let mut updated = Vec::with_capacity(matches.len());
        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut t = write_txn.open_table(rows_table(table)).map_err(store_err)?;
            for (id, mut row) in matches {
                apply_patch(&mut row, &patch);
                let bytes = encode(&row)?;
                t.insert(id.as_str(), bytes.as_slice()).map_err(store_err)?;
                updated.push(row);
            }
        }
        write_txn.commit().map_err(store_err)?;
        Ok(updated)
    }

    fn delete(&mut self, table: &str, predicates: &[Predicate]) -> Result<Vec<Row>, DashError> {
        validate_table(table)?;
        require_filter(predicates, "delete")?;
        let matches = self.scan(table, predicates)?;
        if matches.is_empty() {
            return Ok(Vec::new());
        }

        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut t = write_txn.open_table(rows_table(table)).map_err(store_err)?;
            for (id, _) in &matches {
                t.remove(id.as_str()).map_err(store_err)?;
            }
        }
        write_txn.commit().map_err(store_err)?;
        Ok(matches.into_iter().map(|(_, row)| row).collect())
    }

    fn upsert(&mut self, table: &str, row: Row) -> Result<Row, DashError> {
        validate_table(table)?;
        let id = require_id(&row)?;

        let write_txn = self.db.begin_write().map_err(store_err)?;
        let row = {
            let mut t = write_txn.open_table(rows_table(table)).map_err(store_err)?;
            let existing = match t.get(id.as_str()).map_err(store_err)? {
                Some(guard) => Some(decode(guard.value())?),
                None => None,
            };
            let mut row = row;
            carry_created_at(existing.as_ref(), &mut row);
            let (_, row) = stamp_new_row(row);
            let bytes = encode(&row)?;
            t.insert(id.as_str(), bytes.as_slice()).map_err(store_err)?;
            row
        };
        write_txn.commit().map_err(store_err)?;
        Ok(row)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::tempdir;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("dash.redb");

        {
            let mut store = RedbStore::open(&path).expect("open db");
            let inserted = store.insert("products", row(json!({"sku": "A1", "status": "active"})));
            assert!(inserted.is_ok());
        }

        let store = RedbStore::open(&path).expect("open db");
        let rows = store
            .select(&QueryDescriptor::new("products").eq("sku", "A1"))
            .unwrap_or_default();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains_key("id"));
        assert!(rows[0].contains_key("created_at"));
    }

    #[test]
    fn unwritten_table_reads_empty() {
        let dir = tempdir().expect("temp dir");
        let store = RedbStore::open(dir.path().join("empty.redb")).expect("open db");
        assert!(
            store
                .select(&QueryDescriptor::new("catalogs"))
                .is_ok_and(|r| r.is_empty())
        );
        assert_eq!(store.row_count("catalogs").ok(), Some(0));
    }

    #[test]
    fn write_paths() {
        let dir = tempdir().expect("temp dir");
        let mut store = RedbStore::open(dir.path().join("w.redb")).expect("open db");

        for (id, status) in [("a", "active"), ("b", "inactive"), ("c", "active")] {
            assert!(
                store
                    .insert("products", row(json!({"id": id, "status": status})))
                    .is_ok()
            );
        }
        assert!(matches!(
            store.insert("products", row(json!({"id": "a"}))),
            Err(DashError::Conflict(_))
        ));

        let updated = store
            .update(
                "products",
                &[Predicate::eq("status", "inactive")],
                row(json!({"status": "seasonal"})),
            )
            .unwrap_or_default();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["id"], "b");

        let removed = store
            .delete("products", &[Predicate::eq("status", "active")])
            .unwrap_or_default();
        assert_eq!(removed.len(), 2);
        assert_eq!(store.row_count("products").ok(), Some(1));

        let before = store.get("products", "b").ok().flatten();
        let after = store
            .upsert("products", row(json!({"id": "b", "status": "active"})))
            .ok();
        assert_eq!(
            before.and_then(|r| r.get("created_at").cloned()),
            after.and_then(|r| r.get("created_at").cloned())
        );
    }
}
