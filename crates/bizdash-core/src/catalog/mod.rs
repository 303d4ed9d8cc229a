//! # Catalog Module
//!
//! Saved catalogs and the products they resolve to.
//!
//! A catalog is a name plus an immutable `CatalogFilter`. The filter is
//! turned into a product query by [`crate::query::build_query`]; the
//! functions in [`repo`] persist catalogs and run that query against a
//! `DataStore`.

pub mod repo;

pub use repo::{
    ListedCatalogs, ResolvedProducts, create_catalog, delete_catalog, get_catalog, list_catalogs,
    resolve_products,
};

use crate::primitives::{MAX_CATALOG_NAME_LENGTH, MAX_FILTER_IDS};
use crate::{ActorId, CatalogId, DashError, Row};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

// =============================================================================
// FILTER
// =============================================================================

/// Which stock a catalog draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogType {
    /// Active products.
    #[default]
    Standard,
    /// Products created more than six calendar months ago.
    AgedStock,
    /// Inactive products.
    DeadStock,
    /// Seasonal products.
    Seasonal,
}

/// The selection a catalog is built from. Empty lists do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub subcategories: Vec<String>,
    #[serde(rename = "type", default)]
    pub catalog_type: CatalogType,
}

impl CatalogFilter {
    /// Reject oversized or blank id lists.
    pub fn validate(&self) -> Result<(), DashError> {
        for (field, ids) in [
            ("collections", &self.collections),
            ("categories", &self.categories),
            ("subcategories", &self.subcategories),
        ] {
            if ids.len() > MAX_FILTER_IDS {
                return Err(DashError::Validation(format!(
                    "{} has {} entries (max {})",
                    field,
                    ids.len(),
                    MAX_FILTER_IDS
                )));
            }
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(DashError::Validation(format!(
                    "{} contains a blank id",
                    field
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// A saved catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub id: CatalogId,
    pub name: String,
    #[serde(flatten)]
    pub filter: CatalogFilter,
    pub created_by: ActorId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Catalog {
    pub fn from_row(row: &Row) -> Result<Self, DashError> {
        serde_json::from_value(Value::Object(row.clone()))
            .map_err(|e| DashError::Serialization(format!("catalog row: {}", e)))
    }

    pub fn to_row(&self) -> Result<Row, DashError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(row)) => Ok(row),
            Ok(_) => Err(DashError::Serialization(
                "catalog did not serialize to an object".to_string(),
            )),
            Err(e) => Err(DashError::Serialization(e.to_string())),
        }
    }
}

/// What a user submits to create a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalog {
    pub name: String,
    #[serde(flatten)]
    pub filter: CatalogFilter,
}

impl NewCatalog {
    #[must_use]
    pub fn new(name: impl Into<String>, filter: CatalogFilter) -> Self {
        Self {
            name: name.into(),
            filter,
        }
    }

    /// Name is required and bounded; the filter lists are bounded.
    pub fn validate(&self) -> Result<(), DashError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DashError::Validation("catalog name is required".to_string()));
        }
        if name.chars().count() > MAX_CATALOG_NAME_LENGTH {
            return Err(DashError::Validation(format!(
                "catalog name is longer than {} characters",
                MAX_CATALOG_NAME_LENGTH
            )));
        }
        self.filter.validate()
    }
}

// =============================================================================
// PRODUCT
// =============================================================================

/// A product as the catalog pipeline sees it. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub mrp: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Product {
    /// Parse a `products` row. `mrp` may be a JSON number or a numeric string.
    pub fn from_row(row: &Row) -> Result<Self, DashError> {
        let text = |column: &str| -> Option<String> {
            match row.get(column)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };
        let required = |column: &str| {
            text(column)
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| DashError::Validation(format!("product is missing '{}'", column)))
        };

        let mrp_text = required("mrp")?;
        let mrp = Decimal::from_str(&mrp_text)
            .or_else(|_| Decimal::from_scientific(&mrp_text))
            .map_err(|_| DashError::Validation(format!("product mrp '{}' is not a number", mrp_text)))?;

        Ok(Self {
            id: required("id")?,
            sku: required("sku")?,
            name: required("name")?,
            category: text("category").unwrap_or_default(),
            mrp,
            collection: text("collection"),
            subcategory: text("subcategory"),
            status: text("status"),
            created_at: text("created_at"),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn filter_deserializes_with_defaults() {
        let filter: CatalogFilter =
            serde_json::from_value(json!({"collections": ["none"], "type": "dead_stock"}))
                .expect("filter");
        assert_eq!(filter.collections, vec!["none".to_string()]);
        assert!(filter.categories.is_empty());
        assert_eq!(filter.catalog_type, CatalogType::DeadStock);

        let empty: CatalogFilter = serde_json::from_value(json!({})).expect("filter");
        assert_eq!(empty, CatalogFilter::default());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let parsed = serde_json::from_value::<CatalogFilter>(json!({"type": "clearance"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn new_catalog_requires_a_name() {
        let blank = NewCatalog::new("   ", CatalogFilter::default());
        assert!(matches!(blank.validate(), Err(DashError::Validation(_))));
        let long = NewCatalog::new("x".repeat(MAX_CATALOG_NAME_LENGTH + 1), CatalogFilter::default());
        assert!(long.validate().is_err());
        assert!(NewCatalog::new("Summer", CatalogFilter::default()).validate().is_ok());
    }

    #[test]
    fn oversized_filter_is_rejected() {
        let filter = CatalogFilter {
            categories: vec!["c".to_string(); MAX_FILTER_IDS + 1],
            ..CatalogFilter::default()
        };
        assert!(filter.validate().is_err());
        let blank = CatalogFilter {
            subcategories: vec![String::new()],
            ..CatalogFilter::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn catalog_row_flattens_filter() {
        let catalog = Catalog {
            id: CatalogId::new_v4(),
            name: "Winter".to_string(),
            filter: CatalogFilter {
                categories: vec!["coats".to_string()],
                catalog_type: CatalogType::Seasonal,
                ..CatalogFilter::default()
            },
            created_by: ActorId(uuid::Uuid::new_v4()),
            is_active: true,
            created_at: Utc::now(),
        };
        let row = catalog.to_row().expect("row");
        assert_eq!(row.get("type"), Some(&json!("seasonal")));
        assert_eq!(row.get("categories"), Some(&json!(["coats"])));
        assert_eq!(Catalog::from_row(&row).expect("parse"), catalog);
    }

    #[test]
    fn product_mrp_accepts_numbers_and_strings() {
        let a = Product::from_row(&row(json!({
            "id": "p1", "sku": "A1", "name": "Widget", "category": "Misc", "mrp": 19.5
        })))
        .expect("product");
        assert_eq!(a.mrp, Decimal::new(195, 1));

        let b = Product::from_row(&row(json!({
            "id": 7, "sku": "B2", "name": "Gadget", "mrp": "250"
        })))
        .expect("product");
        assert_eq!(b.id, "7");
        assert_eq!(b.category, "");
        assert_eq!(b.mrp, Decimal::new(250, 0));
    }

    #[test]
    fn product_without_price_is_rejected() {
        let missing = Product::from_row(&row(json!({"id": "p", "sku": "S", "name": "N"})));
        assert!(matches!(missing, Err(DashError::Validation(_))));
        let garbage = Product::from_row(&row(json!({
            "id": "p", "sku": "S", "name": "N", "mrp": "cheap"
        })));
        assert!(garbage.is_err());
    }
}
