//! Catalog persistence and product resolution over any `DataStore`.

use super::{Catalog, CatalogFilter, NewCatalog, Product};
use crate::primitives::CATALOGS_TABLE;
use crate::query::{CREATED_AT_COLUMN, Predicate, QueryDescriptor, build_query};
use crate::store::{DataStore, ID_COLUMN};
use crate::{ActorId, CatalogId, DashError};
use chrono::{DateTime, Utc};

/// Products matched by a filter, plus how many rows could not be parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedProducts {
    pub products: Vec<Product>,
    pub skipped: usize,
}

/// Saved catalogs, plus how many stored rows were not valid catalogs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListedCatalogs {
    pub catalogs: Vec<Catalog>,
    pub skipped: usize,
}

/// Validate and save a new catalog owned by `created_by`.
pub fn create_catalog<S: DataStore + ?Sized>(
    store: &mut S,
    new: NewCatalog,
    created_by: ActorId,
    now: DateTime<Utc>,
) -> Result<Catalog, DashError> {
    new.validate()?;
    let catalog = Catalog {
        id: CatalogId::new_v4(),
        name: new.name.trim().to_string(),
        filter: new.filter,
        created_by,
        is_active: true,
        created_at: now,
    };
    let saved = store.insert(CATALOGS_TABLE, catalog.to_row()?)?;
    Catalog::from_row(&saved)
}

/// Every saved catalog, oldest first.
///
/// A row that does not parse as a catalog is counted and left out, so one
/// broken row never hides the others.
pub fn list_catalogs<S: DataStore + ?Sized>(store: &S) -> Result<ListedCatalogs, DashError> {
    let query = QueryDescriptor::new(CATALOGS_TABLE).order_by(CREATED_AT_COLUMN, false);
    let mut listed = ListedCatalogs::default();
    for row in &store.select(&query)? {
        match Catalog::from_row(row) {
            Ok(catalog) => listed.catalogs.push(catalog),
            Err(_) => listed.skipped += 1,
        }
    }
    Ok(listed)
}

pub fn get_catalog<S: DataStore + ?Sized>(store: &S, id: CatalogId) -> Result<Catalog, DashError> {
    store
        .get(CATALOGS_TABLE, &id.to_string())?
        .ok_or_else(|| DashError::NotFound(format!("catalog {}", id)))
        .and_then(|row| Catalog::from_row(&row))
}

/// Delete a catalog. Deleting a missing catalog is `NotFound`.
pub fn delete_catalog<S: DataStore + ?Sized>(
    store: &mut S,
    id: CatalogId,
) -> Result<Catalog, DashError> {
    let removed = store.delete(CATALOGS_TABLE, &[Predicate::eq(ID_COLUMN, id.to_string())])?;
    removed
        .first()
        .ok_or_else(|| DashError::NotFound(format!("catalog {}", id)))
        .and_then(Catalog::from_row)
}

/// Run the filter's product query, ordered by product name.
///
/// Rows that do not parse as products are counted, not fatal. An
/// unrestricted query returns every product.
pub fn resolve_products<S: DataStore + ?Sized>(
    store: &S,
    filter: &CatalogFilter,
    now: DateTime<Utc>,
) -> Result<ResolvedProducts, DashError> {
    filter.validate()?;
    let query = build_query(filter, now).order_by("name", false);
    let rows = store.select(&query)?;

    let mut resolved = ResolvedProducts::default();
    for row in &rows {
        match Product::from_row(row) {
            Ok(product) => resolved.products.push(product),
            Err(_) => resolved.skipped += 1,
        }
    }
    Ok(resolved)
}
