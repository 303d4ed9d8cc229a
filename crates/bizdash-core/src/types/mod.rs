//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the bizdash core:
//! - Identifiers (`ActorId`, `CatalogId`)
//! - Roles and actions (`Role`, `Action`)
//! - The authenticated user (`Actor`)
//! - Rows exchanged with the data collaborator (`Row`)
//! - Error types (`DashError`)
//!
//! ## Determinism Guarantees
//!
//! All enums implement `Ord` so they can key `BTreeMap`/`BTreeSet`, and
//! their string forms are stable (they are what the data collaborator stores).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A row as exchanged with the data collaborator: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identity of an authenticated user, as issued by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub Uuid);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a saved catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(pub Uuid);

impl CatalogId {
    /// Fresh random id.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CatalogId {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| DashError::Validation(format!("invalid catalog id '{}'", s)))
    }
}

// =============================================================================
// ROLE
// =============================================================================

/// The business role of an actor.
///
/// Roles only select which grants get loaded for a session; the permission
/// check itself never looks at the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    CatalogBuilder,
    SalesManager,
    BusinessManager,
    ItAdmin,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 5] = [
        Role::Owner,
        Role::CatalogBuilder,
        Role::SalesManager,
        Role::BusinessManager,
        Role::ItAdmin,
    ];

    /// The stored (snake_case) name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::CatalogBuilder => "catalog_builder",
            Role::SalesManager => "sales_manager",
            Role::BusinessManager => "business_manager",
            Role::ItAdmin => "it_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| DashError::Validation(format!("unknown role '{}'", s)))
    }
}

// =============================================================================
// ACTION
// =============================================================================

/// What an actor wants to do with a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| DashError::Validation(format!("unknown action '{}'", s)))
    }
}

// =============================================================================
// ACTOR
// =============================================================================

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub email: String,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn new(id: ActorId, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            role,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the bizdash core.
///
/// - No silent failures
/// - Use `Result<T, DashError>` for fallible operations
/// - Permission checks never produce one of these; they answer `false`
#[derive(Debug, Error)]
pub enum DashError {
    /// A required field is missing or malformed. Raised before any store call.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A row with the same id already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The table name is not acceptable to the data collaborator.
    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    /// The data collaborator rejected the operation.
    #[error("Store error: {0}")]
    Store(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration is inconsistent (e.g. a duplicated route).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Producing an export artifact failed.
    #[error("Export error: {0}")]
    Export(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().ok(), Some(role));
        }
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&Role::SalesManager).ok();
        assert_eq!(json.as_deref(), Some("\"sales_manager\""));
    }

    #[test]
    fn action_parse_trims() {
        assert_eq!(" edit ".parse::<Action>().ok(), Some(Action::Edit));
        assert!("approve".parse::<Action>().is_err());
    }

    #[test]
    fn catalog_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<CatalogId>().is_err());
        let id = CatalogId::new_v4();
        assert_eq!(id.to_string().parse::<CatalogId>().ok(), Some(id));
    }
}
