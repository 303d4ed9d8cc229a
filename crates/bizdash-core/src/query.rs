//! # Query Module
//!
//! Structured row queries for the data collaborator, and the catalog filter
//! builder that produces them.
//!
//! - A `QueryDescriptor` names a table, a list of predicates (AND-combined),
//!   an optional ordering and an optional limit.
//! - `build_query` maps a `CatalogFilter` onto a product query. It is pure:
//!   the evaluation instant is an argument.

use crate::catalog::{CatalogFilter, CatalogType};
use crate::primitives::{AGED_STOCK_MONTHS, NONE_SENTINEL, PRODUCTS_TABLE};
use crate::Row;
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Product column holding the collection id.
pub const COLLECTION_COLUMN: &str = "collection";
/// Product column holding the category id.
pub const CATEGORY_COLUMN: &str = "category";
/// Product column holding the subcategory id.
pub const SUBCATEGORY_COLUMN: &str = "subcategory";
/// Product column holding the lifecycle status.
pub const STATUS_COLUMN: &str = "status";
/// Column holding the row creation timestamp (RFC 3339).
pub const CREATED_AT_COLUMN: &str = "created_at";

// =============================================================================
// PREDICATES
// =============================================================================

/// One row-level condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// `column = value`.
    Eq { column: String, value: Value },
    /// `column IN (values)`.
    In { column: String, values: Vec<Value> },
    /// `column < threshold`, the column being an RFC 3339 timestamp.
    OlderThan {
        column: String,
        threshold: DateTime<Utc>,
    },
}

impl Predicate {
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn one_of<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn older_than(column: impl Into<String>, threshold: DateTime<Utc>) -> Self {
        Self::OlderThan {
            column: column.into(),
            threshold,
        }
    }

    /// The column this predicate reads.
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } | Self::In { column, .. } | Self::OlderThan { column, .. } => {
                column
            }
        }
    }

    /// Does `row` satisfy this predicate? A missing column never matches.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let Some(cell) = row.get(self.column()) else {
            return false;
        };
        match self {
            Self::Eq { value, .. } => loose_eq(cell, value),
            Self::In { values, .. } => values.iter().any(|v| loose_eq(cell, v)),
            Self::OlderThan { threshold, .. } => cell
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|ts| ts.with_timezone(&Utc) < *threshold)
                .unwrap_or(false),
        }
    }
}

/// Equality that treats `1` and `"1"` alike; query strings carry no types.
fn loose_eq(cell: &Value, wanted: &Value) -> bool {
    if cell == wanted {
        return true;
    }
    match (scalar_text(cell), scalar_text(wanted)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// QUERY DESCRIPTOR
// =============================================================================

/// Ordering applied after filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

/// A select against one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub table: String,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl QueryDescriptor {
    /// Select every row of `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::eq(column, value))
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            descending,
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// No predicates: every row of the table.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.predicates.is_empty()
    }

    /// All predicates hold for `row`.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }

    /// Apply ordering and limit to already-filtered rows.
    ///
    /// The sort is stable, so rows with equal keys keep the store's order.
    #[must_use]
    pub fn finish(&self, mut rows: Vec<Row>) -> Vec<Row> {
        if let Some(order) = &self.order_by {
            rows.sort_by(|a, b| {
                let (a, b) = (a.get(&order.column), b.get(&order.column));
                let ord = compare_cells(a, b);
                // Missing cells stay last in both directions.
                if order.descending && a.is_some() && b.is_some() {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }
}

/// Missing cells sort last; numbers numerically; everything else as text.
fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(x), Some(y)) => scalar_text(x)
            .unwrap_or_default()
            .cmp(&scalar_text(y).unwrap_or_default()),
    }
}

// =============================================================================
// CATALOG FILTER BUILDER
// =============================================================================

/// The cut-off for aged stock: six calendar months before `now`.
#[must_use]
pub fn aged_stock_threshold(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(AGED_STOCK_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Compose the product query for `filter`, evaluated at `now`.
///
/// Clauses are AND-combined. The `"none"` collection sentinel is dropped
/// before the collection clause is considered.
#[must_use]
pub fn build_query(filter: &CatalogFilter, now: DateTime<Utc>) -> QueryDescriptor {
    let mut query = QueryDescriptor::new(PRODUCTS_TABLE);

    let collections: Vec<&String> = filter
        .collections
        .iter()
        .filter(|c| c.as_str() != NONE_SENTINEL)
        .collect();
    if !collections.is_empty() {
        query = query.filter(Predicate::one_of(
            COLLECTION_COLUMN,
            collections.into_iter().cloned(),
        ));
    }

    if !filter.categories.is_empty() {
        query = query.filter(Predicate::one_of(
            CATEGORY_COLUMN,
            filter.categories.iter().cloned(),
        ));
    }

    if !filter.subcategories.is_empty() {
        query = query.filter(Predicate::one_of(
            SUBCATEGORY_COLUMN,
            filter.subcategories.iter().cloned(),
        ));
    }

    match filter.catalog_type {
        CatalogType::AgedStock => query.filter(Predicate::older_than(
            CREATED_AT_COLUMN,
            aged_stock_threshold(now),
        )),
        CatalogType::DeadStock => query.eq(STATUS_COLUMN, "inactive"),
        CatalogType::Seasonal => query.eq(STATUS_COLUMN, "seasonal"),
        CatalogType::Standard => query.eq(STATUS_COLUMN, "active"),
    }
}

// =============================================================================
// TESTS
// =============================================================================
