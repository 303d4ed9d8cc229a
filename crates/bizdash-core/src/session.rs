//! # Session Module
//!
//! The authenticated actor plus the grants loaded for it.
//!
//! A `Session` is an explicit value handed to whoever needs to ask permission
//! questions. Grants are loaded once when the session opens and replaced
//! whenever the identity changes; there is no other cache.

use crate::permission::{GrantSet, has_permission};
use crate::primitives::{ROLE_PERMISSIONS_TABLE, USERS_TABLE};
use crate::query::QueryDescriptor;
use crate::store::{DataStore, ID_COLUMN};
use crate::{Action, Actor, ActorId, DashError, Role, Row};
use serde::Serialize;
use uuid::Uuid;

/// An actor and the grants in force for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    actor: Actor,
    grants: GrantSet,
}

impl Session {
    #[must_use]
    pub fn new(actor: Actor, grants: GrantSet) -> Self {
        Self { actor, grants }
    }

    #[must_use]
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    #[must_use]
    pub fn actor_id(&self) -> ActorId {
        self.actor.id
    }

    #[must_use]
    pub fn grants(&self) -> &GrantSet {
        &self.grants
    }

    /// Permission check against this session's grants.
    #[must_use]
    pub fn can(&self, resource: &str, action: Action) -> bool {
        has_permission(Some(&self.grants), resource, action)
    }

    /// Replace the identity. The grants always travel with it.
    pub fn switch_identity(&mut self, actor: Actor, grants: GrantSet) {
        self.actor = actor;
        self.grants = grants;
    }
}

/// Permission check for an optional session (`None` = signed out).
#[must_use]
pub fn session_can(session: Option<&Session>, resource: &str, action: Action) -> bool {
    has_permission(session.map(Session::grants), resource, action)
}

// =============================================================================
// LOADING FROM THE STORE
// =============================================================================

/// The `users` row with this email, as an actor.
///
/// Both sides compare after trimming and lowercasing, so rows stored with
/// mixed case still match. No match is `NotFound`.
pub fn find_actor<S: DataStore + ?Sized>(store: &S, email: &str) -> Result<Actor, DashError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(DashError::Validation("email is required".to_string()));
    }
    let rows = store.select(&QueryDescriptor::new(USERS_TABLE))?;
    let found = rows.iter().find(|row| {
        row.get("email")
            .and_then(|v| v.as_str())
            .is_some_and(|stored| normalize_email(stored) == email)
    });
    match found {
        Some(row) => actor_from_row(row),
        None => Err(DashError::NotFound(format!("user {}", email))),
    }
}

/// The comparable form of an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parse a `users` row (`id`, `email`, `role`).
pub fn actor_from_row(row: &Row) -> Result<Actor, DashError> {
    let text = |column: &str| {
        row.get(column)
            .and_then(|v| v.as_str())
            .ok_or_else(|| DashError::Serialization(format!("user row has no '{}'", column)))
    };
    let id = Uuid::parse_str(text(ID_COLUMN)?)
        .map_err(|e| DashError::Serialization(format!("user id: {}", e)))?;
    let role: Role = text("role")?.parse()?;
    Ok(Actor::new(ActorId(id), text("email")?, role))
}

/// The `role_permissions` rows of `role`, as a grant set.
///
/// A role with no rows gets the empty set. Two rows for one resource are a
/// `Conflict`; the caller decides what a broken role is allowed to do.
pub fn load_grants<S: DataStore + ?Sized>(store: &S, role: Role) -> Result<GrantSet, DashError> {
    let rows = store.select(&QueryDescriptor::new(ROLE_PERMISSIONS_TABLE).eq("role", role.as_str()))?;
    GrantSet::from_rows(&rows)
}

// =============================================================================
// TESTS
// =============================================================================
