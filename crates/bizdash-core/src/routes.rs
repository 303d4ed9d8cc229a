//! # Route Permission Table
//!
//! One declarative `path -> (resource, action)` table for every guarded page.
//!
//! Paths are `/`-separated; a segment starting with `:` matches any single
//! segment (`/products/:id/edit`). Exact paths win over patterns; among
//! patterns the first declared wins. A path absent from the table carries no
//! restriction.

use crate::{Action, DashError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The permission a guarded path requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredPermission {
    pub resource: String,
    pub action: Action,
}

impl RequiredPermission {
    #[must_use]
    pub fn new(resource: impl Into<String>, action: Action) -> Self {
        Self {
            resource: resource.into(),
            action,
        }
    }
}

/// One line of the table, as declared in code or configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    pub resource: String,
    pub action: Action,
}

impl RouteEntry {
    #[must_use]
    pub fn new(path: impl Into<String>, resource: impl Into<String>, action: Action) -> Self {
        Self {
            path: path.into(),
            resource: resource.into(),
            action,
        }
    }

    fn is_pattern(&self) -> bool {
        self.path.split('/').any(|s| s.starts_with(':'))
    }
}

/// The table shipped with the dashboard.
const DEFAULT_ROUTES: &[(&str, &str, Action)] = &[
    ("/customers", "customers", Action::View),
    ("/customers/new", "customers", Action::Create),
    ("/customers/:id/edit", "customers", Action::Edit),
    ("/products", "products", Action::View),
    ("/products/new", "products", Action::Create),
    ("/products/:id/edit", "products", Action::Edit),
    ("/inventory", "inventory", Action::View),
    ("/inventory/adjust", "inventory", Action::Edit),
    ("/orders", "orders", Action::View),
    ("/orders/new", "orders", Action::Create),
    ("/payments", "payments", Action::View),
    ("/payments/new", "payments", Action::Create),
    ("/catalogs", "catalogs", Action::View),
    ("/catalogs/new", "catalogs", Action::Create),
    ("/catalogs/:id", "catalogs", Action::View),
    ("/marketing", "marketing", Action::View),
    ("/marketing/campaigns/new", "marketing", Action::Create),
    ("/roles", "roles", Action::View),
    ("/roles/:role/edit", "roles", Action::Edit),
    ("/users", "users", Action::View),
];

// =============================================================================
// ROUTE TABLE
// =============================================================================

/// Lookup structure over the declared routes. Built once, read-only after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    exact: BTreeMap<String, RequiredPermission>,
    patterns: Vec<(Vec<String>, RequiredPermission)>,
}

impl RouteTable {
    /// Build a table, rejecting malformed or duplicated paths.
    pub fn new(entries: Vec<RouteEntry>) -> Result<Self, DashError> {
        let mut exact = BTreeMap::new();
        let mut patterns: Vec<(Vec<String>, RequiredPermission)> = Vec::new();
        let mut seen = BTreeSet::new();

        for entry in &entries {
            if !entry.path.starts_with('/') {
                return Err(DashError::Config(format!(
                    "route '{}' must start with '/'",
                    entry.path
                )));
            }
            if entry.resource.trim().is_empty() {
                return Err(DashError::Config(format!(
                    "route '{}' has an empty resource",
                    entry.path
                )));
            }
            let normalized = normalize(&entry.path);
            // `:id` and `:slug` in the same position are the same route.
            let shape: Vec<&str> = normalized
                .split('/')
                .map(|s| if s.starts_with(':') { ":" } else { s })
                .collect();
            if !seen.insert(shape.join("/")) {
                return Err(DashError::Config(format!(
                    "route '{}' is declared more than once",
                    entry.path
                )));
            }

            let required = RequiredPermission::new(entry.resource.clone(), entry.action);
            if entry.is_pattern() {
                patterns.push((split(&normalized), required));
            } else {
                exact.insert(normalized, required);
            }
        }

        Ok(Self {
            entries,
            exact,
            patterns,
        })
    }

    /// The table shipped with the dashboard.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = DEFAULT_ROUTES
            .iter()
            .map(|(path, resource, action)| RouteEntry::new(*path, *resource, *action))
            .collect();
        // The built-in table is checked by `builtin_table_is_valid`.
        Self::new(entries).unwrap_or_else(|_| Self::empty())
    }

    /// A table with no guarded paths.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            exact: BTreeMap::new(),
            patterns: Vec::new(),
        }
    }

    /// The permission required for `path`, or `None` when unrestricted.
    ///
    /// Query strings, fragments and a trailing `/` are ignored.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&RequiredPermission> {
        let normalized = normalize(path);
        if let Some(required) = self.exact.get(&normalized) {
            return Some(required);
        }
        let segments = split(&normalized);
        self.patterns
            .iter()
            .find(|(pattern, _)| matches_pattern(pattern, &segments))
            .map(|(_, required)| required)
    }

    /// Declared entries, in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Strip query/fragment and trailing slashes; collapse repeated slashes.
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn split(normalized: &str) -> Vec<String> {
    normalized
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn matches_pattern(pattern: &[String], segments: &[String]) -> bool {
    pattern.len() == segments.len()
        && pattern
            .iter()
            .zip(segments)
            .all(|(p, s)| p.starts_with(':') || p == s)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_valid() {
        let entries = DEFAULT_ROUTES
            .iter()
            .map(|(p, r, a)| RouteEntry::new(*p, *r, *a))
            .collect();
        let table = RouteTable::new(entries);
        assert!(table.is_ok());
        assert_eq!(RouteTable::builtin().len(), DEFAULT_ROUTES.len());
    }

    #[test]
    fn exact_lookup() {
        let table = RouteTable::builtin();
        assert_eq!(
            table.lookup("/products/new"),
            Some(&RequiredPermission::new("products", Action::Create))
        );
    }

    #[test]
    fn pattern_lookup() {
        let table = RouteTable::builtin();
        assert_eq!(
            table.lookup("/products/9f1c/edit"),
            Some(&RequiredPermission::new("products", Action::Edit))
        );
        assert_eq!(
            table.lookup("/catalogs/abc"),
            Some(&RequiredPermission::new("catalogs", Action::View))
        );
    }

    #[test]
    fn exact_beats_pattern() {
        let table = RouteTable::builtin();
        assert_eq!(
            table.lookup("/catalogs/new"),
            Some(&RequiredPermission::new("catalogs", Action::Create))
        );
    }

    #[test]
    fn unknown_path_is_unrestricted() {
        let table = RouteTable::builtin();
        assert!(table.lookup("/dashboard").is_none());
        assert!(table.lookup("/").is_none());
        assert!(table.lookup("/products/1/edit/extra").is_none());
    }

    #[test]
    fn query_and_trailing_slash_ignored() {
        let table = RouteTable::builtin();
        assert_eq!(
            table.lookup("/customers/?page=2"),
            Some(&RequiredPermission::new("customers", Action::View))
        );
        assert_eq!(
            table.lookup("//customers//new#top"),
            Some(&RequiredPermission::new("customers", Action::Create))
        );
    }

    #[test]
    fn duplicate_path_rejected() {
        let result = RouteTable::new(vec![
            RouteEntry::new("/products", "products", Action::View),
            RouteEntry::new("/products/", "products", Action::Edit),
        ]);
        assert!(matches!(result, Err(DashError::Config(_))));
    }

    #[test]
    fn equivalent_patterns_rejected() {
        let result = RouteTable::new(vec![
            RouteEntry::new("/products/:id", "products", Action::View),
            RouteEntry::new("/products/:sku", "products", Action::Edit),
        ]);
        assert!(matches!(result, Err(DashError::Config(_))));
    }

    #[test]
    fn relative_path_rejected() {
        let result = RouteTable::new(vec![RouteEntry::new("products", "products", Action::View)]);
        assert!(matches!(result, Err(DashError::Config(_))));
    }
}
