//! In-memory tables.

use super::{
    DataStore, apply_patch, carry_created_at, require_filter, require_id, stamp_new_row,
    validate_table,
};
use crate::query::{Predicate, QueryDescriptor};
use crate::{DashError, Row};
use std::collections::BTreeMap;

/// `table -> id -> row`, all in `BTreeMap`s so iteration is in id order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, BTreeMap<String, Row>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in `table` (0 for an unknown table).
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(BTreeMap::len).unwrap_or(0)
    }

    fn matching_ids(&self, table: &str, predicates: &[Predicate]) -> Vec<String> {
        self.tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|(_, row)| predicates.iter().all(|p| p.matches(row)))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl DataStore for MemoryStore {
    fn select(&self, query: &QueryDescriptor) -> Result<Vec<Row>, DashError> {
        validate_table(&query.table)?;
        let rows = self
            .tables
            .get(&query.table)
            .map(|rows| rows.values().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        Ok(query.finish(rows))
    }

    fn insert(&mut self, table: &str, row: Row) -> Result<Row, DashError> {
        validate_table(table)?;
        let (id, row) = stamp_new_row(row);
        let rows = self.tables.entry(table.to_string()).or_default();
        if rows.contains_key(&id) {
            return Err(DashError::Conflict(format!("{}/{} already exists", table, id)));
        }
        rows.insert(id, row.clone());
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
        let ids = self.matching_ids(table, predicates);
        let mut updated = Vec::with_capacity(ids.len());
        if let Some(rows) = self.tables.get_mut(table) {
            for id in ids {
                if let Some(row) = rows.get_mut(&id) {
                    apply_patch(row, &patch);
                    updated.push(row.clone());
                }
            }
        }
        Ok(updated)
    }

    fn delete(&mut self, table: &str, predicates: &[Predicate]) -> Result<Vec<Row>, DashError> {
        validate_table(table)?;
        require_filter(predicates, "delete")?;
        let ids = self.matching_ids(table, predicates);
        let Some(rows) = self.tables.get_mut(table) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| rows.remove(id)).collect())
    }

    fn upsert(&mut self, table: &str, row: Row) -> Result<Row, DashError> {
        validate_table(table)?;
        let id = require_id(&row)?;
        let rows = self.tables.entry(table.to_string()).or_default();
        let mut row = row;
        carry_created_at(rows.get(&id), &mut row);
        let (id, row) = stamp_new_row(row);
        rows.insert(id, row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        for (id, status) in [("b", "active"), ("a", "inactive"), ("c", "active")] {
            let _ = store.insert("products", row(json!({"id": id, "status": status})));
        }
        store
    }

    #[test]
    fn select_filters_in_id_order() {
        let store = seeded();
        let rows = store
            .select(&QueryDescriptor::new("products").eq("status", "active"))
            .unwrap_or_default();
        let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn unknown_table_selects_nothing() {
        let store = MemoryStore::new();
        let rows = store.select(&QueryDescriptor::new("ghosts"));
        assert!(rows.is_ok_and(|r| r.is_empty()));
    }

    #[test]
    fn duplicate_insert_conflicts() {
        let mut store = seeded();
        let result = store.insert("products", row(json!({"id": "a"})));
        assert!(matches!(result, Err(DashError::Conflict(_))));
    }

    #[test]
    fn update_never_touches_id() {
        let mut store = seeded();
        let updated = store
            .update(
                "products",
                &[Predicate::eq("id", "a")],
                row(json!({"id": "zzz", "status": "seasonal"})),
            )
            .unwrap_or_default();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["id"], "a");
        assert_eq!(updated[0]["status"], "seasonal");
    }

    #[test]
    fn unfiltered_update_and_delete_are_refused() {
        let mut store = seeded();
        assert!(matches!(
            store.update("products", &[], Row::new()),
            Err(DashError::Validation(_))
        ));
        assert!(matches!(
            store.delete("products", &[]),
            Err(DashError::Validation(_))
        ));
        assert_eq!(store.row_count("products"), 3);
    }

    #[test]
    fn delete_returns_removed_rows() {
        let mut store = seeded();
        let removed = store
            .delete("products", &[Predicate::eq("status", "active")])
            .unwrap_or_default();
        assert_eq!(removed.len(), 2);
        assert_eq!(store.row_count("products"), 1);
    }

    #[test]
    fn upsert_replaces_and_requires_id() {
        let mut store = seeded();
        let _ = store.upsert("products", row(json!({"id": "a", "status": "active"})));
        assert_eq!(
            store.get("products", "a").ok().flatten().map(|r| r["status"].clone()),
            Some(json!("active"))
        );
        assert!(matches!(
            store.upsert("products", row(json!({"status": "x"}))),
            Err(DashError::Validation(_))
        ));
    }
}
