//! # Data Store
//!
//! The row-oriented data collaborator: tables of JSON rows keyed by `id`,
//! with select-with-filter, insert, update-with-filter, delete-with-filter
//! and upsert.
//!
//! ## Backends
//!
//! - `MemoryStore`: `BTreeMap` tables (fast, volatile).
//! - `RedbStore`: one redb table per dashboard table (ACID, persistent).
//!
//! `StorageBackend` wraps either so the app can pick at startup.
//!
//! Every call is independent: there is no transaction spanning calls, and
//! concurrent writes to one row are last-write-wins.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::primitives::MAX_TABLE_NAME_LENGTH;
use crate::query::{CREATED_AT_COLUMN, Predicate, QueryDescriptor};
use crate::{DashError, Row};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

/// Column every row is keyed by.
pub const ID_COLUMN: &str = "id";

// =============================================================================
// DATA STORE TRAIT
// =============================================================================

/// Row-level access to named tables.
pub trait DataStore {
    /// Rows of `query.table` matching every predicate, ordered and limited
    /// per the descriptor. Rows come back in `id` order before ordering.
    fn select(&self, query: &QueryDescriptor) -> Result<Vec<Row>, DashError>;

    /// Insert a new row. A missing `id` gets a fresh UUID and a missing
    /// `created_at` gets the current time. An existing `id` is a conflict.
    fn insert(&mut self, table: &str, row: Row) -> Result<Row, DashError>;

    /// Merge `patch` into every row matching `predicates`. The `id` column is
    /// never patched. An empty predicate list is refused.
    fn update(
        &mut self,
        table: &str,
        predicates: &[Predicate],
        patch: Row,
    ) -> Result<Vec<Row>, DashError>;

    /// Remove every row matching `predicates` and return them. An empty
    /// predicate list is refused.
    fn delete(&mut self, table: &str, predicates: &[Predicate]) -> Result<Vec<Row>, DashError>;

    /// Insert, or replace the row with the same `id`.
    fn upsert(&mut self, table: &str, row: Row) -> Result<Row, DashError>;

    /// The row of `table` with this `id`.
    fn get(&self, table: &str, id: &str) -> Result<Option<Row>, DashError> {
        let query = QueryDescriptor::new(table).eq(ID_COLUMN, id).limit(1);
        Ok(self.select(&query)?.into_iter().next())
    }
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Table names are `[a-z0-9_]`, non-empty and at most 63 bytes.
pub fn validate_table(name: &str) -> Result<(), DashError> {
    let well_formed = !name.is_empty()
        && name.len() <= MAX_TABLE_NAME_LENGTH
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if well_formed {
        Ok(())
    } else {
        Err(DashError::InvalidTable(name.to_string()))
    }
}

/// The `id` of a row as a key string. Numeric ids are accepted.
#[must_use]
pub fn row_id(row: &Row) -> Option<String> {
    match row.get(ID_COLUMN)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Fill in `id` and `created_at` the way the hosted service defaults them.
pub(crate) fn stamp_new_row(mut row: Row) -> (String, Row) {
    let id = row_id(&row).unwrap_or_else(|| {
        let id = Uuid::new_v4().to_string();
        row.insert(ID_COLUMN.to_string(), Value::String(id.clone()));
        id
    });
    if !row.contains_key(CREATED_AT_COLUMN) {
        row.insert(
            CREATED_AT_COLUMN.to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
    (id, row)
}

/// Upserts need an explicit id to know what to replace.
pub(crate) fn require_id(row: &Row) -> Result<String, DashError> {
    row_id(row).ok_or_else(|| DashError::Validation("upsert requires an 'id'".to_string()))
}

/// An upsert without `created_at` keeps the replaced row's timestamp.
pub(crate) fn carry_created_at(existing: Option<&Row>, row: &mut Row) {
    if row.contains_key(CREATED_AT_COLUMN) {
        return;
    }
    if let Some(ts) = existing.and_then(|r| r.get(CREATED_AT_COLUMN)) {
        row.insert(CREATED_AT_COLUMN.to_string(), ts.clone());
    }
}

pub(crate) fn require_filter(predicates: &[Predicate], op: &str) -> Result<(), DashError> {
    if predicates.is_empty() {
        return Err(DashError::Validation(format!("{} requires a filter", op)));
    }
    Ok(())
}

pub(crate) fn apply_patch(row: &mut Row, patch: &Row) {
    for (column, value) in patch {
        if column != ID_COLUMN {
            row.insert(column.clone(), value.clone());
        }
    }
}

pub(crate) fn store_err(e: impl std::fmt::Display) -> DashError {
    DashError::Store(e.to_string())
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// The store chosen at startup.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory tables (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed tables using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open by backend name: `"redb"` opens `path`, anything else is in-memory.
    pub fn open(backend: &str, path: impl AsRef<Path>) -> Result<Self, DashError> {
        match backend {
            "redb" => Ok(Self::Persistent(RedbStore::open(path)?)),
            "memory" => Ok(Self::default()),
            other => Err(DashError::Config(format!(
                "unknown backend '{}', expected 'memory' or 'redb'",
                other
            ))),
        }
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    fn inner(&self) -> &dyn DataStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn DataStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
        }
    }
}

impl DataStore for StorageBackend {
    fn select(&self, query: &QueryDescriptor) -> Result<Vec<Row>, DashError> {
        self.inner().select(query)
    }

    fn insert(&mut self, table: &str, row: Row) -> Result<Row, DashError> {
        self.inner_mut().insert(table, row)
    }

    fn update(
        &mut self,
        table: &str,
        predicates: &[Predicate],
        patch: Row,
    ) -> Result<Vec<Row>, DashError> {
        self.inner_mut().update(table, predicates, patch)
    }

    fn delete(&mut self, table: &str, predicates: &[Predicate]) -> Result<Vec<Row>, DashError> {
        self.inner_mut().delete(table, predicates)
    }

    fn upsert(&mut self, table: &str, row: Row) -> Result<Row, DashError> {
        self.inner_mut().upsert(table, row)
    }
}

// =============================================================================
// TESTS
// =============================================================================
