//! # Permission Resolution
//!
//! Answers "can this actor perform this action on this resource".
//!
//! - A grant is one row per resource carrying four flags
//!   (`can_view`, `can_create`, `can_edit`, `can_delete`).
//! - A `GrantSet` holds at most one grant per resource.
//! - `has_permission` is fail-closed: no session, no grant, or a blank
//!   resource all answer `false`. It never errors.

use crate::{Action, DashError, Role, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resources known to the dashboard, in sidebar order.
pub const RESOURCES: [&str; 10] = [
    "dashboard",
    "customers",
    "products",
    "inventory",
    "orders",
    "payments",
    "catalogs",
    "marketing",
    "roles",
    "users",
];

// =============================================================================
// PERMISSION GRANT
// =============================================================================

/// A stored permission for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub resource: String,
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl PermissionGrant {
    /// A grant with every flag off.
    #[must_use]
    pub fn none(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            can_view: false,
            can_create: false,
            can_edit: false,
            can_delete: false,
        }
    }

    /// A grant with every flag on.
    #[must_use]
    pub fn full(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            can_view: true,
            can_create: true,
            can_edit: true,
            can_delete: true,
        }
    }

    /// A grant allowing only `view`.
    #[must_use]
    pub fn view_only(resource: impl Into<String>) -> Self {
        Self {
            can_view: true,
            ..Self::none(resource)
        }
    }

    /// Builder-style flag setter.
    #[must_use]
    pub fn with(mut self, action: Action, allowed: bool) -> Self {
        match action {
            Action::View => self.can_view = allowed,
            Action::Create => self.can_create = allowed,
            Action::Edit => self.can_edit = allowed,
            Action::Delete => self.can_delete = allowed,
        }
        self
    }

    /// The flag corresponding to `action`.
    #[must_use]
    pub const fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Create => self.can_create,
            Action::Edit => self.can_edit,
            Action::Delete => self.can_delete,
        }
    }

    /// Parse a `role_permissions` row. Extra columns are ignored.
    pub fn from_row(row: &Row) -> Result<Self, DashError> {
        serde_json::from_value(serde_json::Value::Object(row.clone()))
            .map_err(|e| DashError::Serialization(format!("permission row: {}", e)))
    }

    /// Render as a `role_permissions` row for `role`.
    #[must_use]
    pub fn to_row(&self, role: Role) -> Row {
        let mut row = Row::new();
        row.insert("role".to_string(), role.as_str().into());
        row.insert("resource".to_string(), self.resource.clone().into());
        row.insert("can_view".to_string(), self.can_view.into());
        row.insert("can_create".to_string(), self.can_create.into());
        row.insert("can_edit".to_string(), self.can_edit.into());
        row.insert("can_delete".to_string(), self.can_delete.into());
        row
    }
}

// =============================================================================
// GRANT SET
// =============================================================================

/// The grants of one actor, keyed by resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GrantSet {
    grants: BTreeMap<String, PermissionGrant>,
}

impl GrantSet {
    /// An empty set. Everything is denied.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set, rejecting a second grant for the same resource.
    pub fn new(grants: impl IntoIterator<Item = PermissionGrant>) -> Result<Self, DashError> {
        let mut map = BTreeMap::new();
        for grant in grants {
            if map.contains_key(&grant.resource) {
                return Err(DashError::Conflict(format!(
                    "duplicate grant for resource '{}'",
                    grant.resource
                )));
            }
            map.insert(grant.resource.clone(), grant);
        }
        Ok(Self { grants: map })
    }

    /// Build a set from `role_permissions` rows.
    pub fn from_rows(rows: &[Row]) -> Result<Self, DashError> {
        let grants = rows
            .iter()
            .map(PermissionGrant::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(grants)
    }

    /// The grant for `resource`, if one exists.
    #[must_use]
    pub fn get(&self, resource: &str) -> Option<&PermissionGrant> {
        self.grants.get(resource)
    }

    /// Same as [`has_permission`] over this set.
    #[must_use]
    pub fn allows(&self, resource: &str, action: Action) -> bool {
        has_permission(Some(self), resource, action)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionGrant> {
        self.grants.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Can the holder of `grants` perform `action` on `resource`?
///
/// `None` stands for "no session". Fail-closed on every missing piece.
#[must_use]
pub fn has_permission(grants: Option<&GrantSet>, resource: &str, action: Action) -> bool {
    let Some(grants) = grants else {
        return false;
    };
    if resource.trim().is_empty() {
        return false;
    }
    grants
        .get(resource)
        .map(|grant| grant.allows(action))
        .unwrap_or(false)
}

// =============================================================================
// ROLE DEFAULTS
// =============================================================================

/// The grants seeded for `role` on a fresh install.
#[must_use]
pub fn default_grants(role: Role) -> Vec<PermissionGrant> {
    match role {
        Role::Owner => RESOURCES.iter().map(|r| PermissionGrant::full(*r)).collect(),
        Role::CatalogBuilder => vec![
            PermissionGrant::view_only("dashboard"),
            PermissionGrant::view_only("products"),
            PermissionGrant::full("catalogs"),
            PermissionGrant::view_only("marketing"),
        ],
        Role::SalesManager => vec![
            PermissionGrant::view_only("dashboard"),
            PermissionGrant::full("customers"),
            PermissionGrant::view_only("products"),
            PermissionGrant::view_only("catalogs"),
            PermissionGrant::full("orders").with(Action::Delete, false),
        ],
        Role::BusinessManager => RESOURCES
            .iter()
            .map(|r| {
                let grant = PermissionGrant::view_only(*r);
                if matches!(*r, "products" | "inventory" | "payments") {
                    grant.with(Action::Edit, true)
                } else {
                    grant
                }
            })
            .collect(),
        Role::ItAdmin => vec![
            PermissionGrant::view_only("dashboard"),
            PermissionGrant::full("users"),
            PermissionGrant::full("roles"),
        ],
    }
}

// =============================================================================
// TESTS
// =============================================================================
