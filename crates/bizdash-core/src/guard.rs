//! # Route Guard
//!
//! Decides, for every navigation, whether the requested page renders.
//!
//! 1. No session: redirect to the sign-in route.
//! 2. Path not in the route table: render.
//! 3. Path guarded and the session lacks the permission: redirect to the
//!    default route with an "access denied" notice.
//! 4. Otherwise: render.
//!
//! The guard is a two-state machine per navigation: `Checking` until the
//! decision is made, then `Resolved`. A new path or a new identity puts it
//! back into `Checking`.

use crate::primitives::{DEFAULT_ROUTE, SIGN_IN_ROUTE};
use crate::routes::{RequiredPermission, RouteTable};
use crate::session::Session;
use crate::ActorId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Message shown to the user alongside a denial.
pub const ACCESS_DENIED_MESSAGE: &str = "You don't have permission to access this page";

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

impl Notice {
    #[must_use]
    pub fn access_denied() -> Self {
        Self {
            level: NoticeLevel::Error,
            message: ACCESS_DENIED_MESSAGE.to_string(),
        }
    }
}

/// What the page should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardOutcome {
    Render,
    Redirect {
        to: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        notice: Option<Notice>,
        /// The permission that was missing, when the redirect is a denial.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        required: Option<RequiredPermission>,
    },
}

impl GuardOutcome {
    #[must_use]
    pub fn is_render(&self) -> bool {
        matches!(self, GuardOutcome::Render)
    }
}

/// Guard state for the current navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Resolved(GuardOutcome),
}

// =============================================================================
// ROUTE GUARD
// =============================================================================

/// Route guard over a shared route table.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    table: Arc<RouteTable>,
    sign_in_route: String,
    default_route: String,
    state: GuardState,
    last: Option<(String, Option<ActorId>)>,
}

impl RouteGuard {
    /// A guard using the built-in sign-in and default routes.
    #[must_use]
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self::with_routes(table, SIGN_IN_ROUTE, DEFAULT_ROUTE)
    }

    #[must_use]
    pub fn with_routes(
        table: Arc<RouteTable>,
        sign_in_route: impl Into<String>,
        default_route: impl Into<String>,
    ) -> Self {
        Self {
            table,
            sign_in_route: sign_in_route.into(),
            default_route: default_route.into(),
            state: GuardState::Checking,
            last: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &GuardState {
        &self.state
    }

    #[must_use]
    pub fn sign_in_route(&self) -> &str {
        &self.sign_in_route
    }

    #[must_use]
    pub fn default_route(&self) -> &str {
        &self.default_route
    }

    /// Decide for `path` without touching the state machine.
    #[must_use]
    pub fn check(&self, path: &str, session: Option<&Session>) -> GuardOutcome {
        let Some(session) = session else {
            return GuardOutcome::Redirect {
                to: self.sign_in_route.clone(),
                notice: None,
                required: None,
            };
        };

        let Some(required) = self.table.lookup(path) else {
            return GuardOutcome::Render;
        };

        if session.can(&required.resource, required.action) {
            return GuardOutcome::Render;
        }

        // A denied default route would bounce forever; send the actor out instead.
        let to = if self.table.lookup(&self.default_route) == Some(required)
            && same_route(path, &self.default_route)
        {
            self.sign_in_route.clone()
        } else {
            self.default_route.clone()
        };

        GuardOutcome::Redirect {
            to,
            notice: Some(Notice::access_denied()),
            required: Some(required.clone()),
        }
    }

    /// Run the state machine for a navigation event.
    ///
    /// Re-evaluates when the path or identity differs from the last
    /// navigation; otherwise returns the resolved outcome unchanged.
    pub fn navigate(&mut self, path: &str, session: Option<&Session>) -> GuardOutcome {
        let key = (path.to_string(), session.map(Session::actor_id));
        if self.last.as_ref() == Some(&key)
            && let GuardState::Resolved(outcome) = &self.state
        {
            return outcome.clone();
        }

        self.state = GuardState::Checking;
        self.last = Some(key);
        let outcome = self.check(path, session);
        self.state = GuardState::Resolved(outcome.clone());
        outcome
    }

    /// Force the next `navigate` to re-check (e.g. after grants were edited).
    pub fn invalidate(&mut self) {
        self.state = GuardState::Checking;
    }
}

fn same_route(a: &str, b: &str) -> bool {
    fn bare(s: &str) -> &str {
        s.split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
    }
    bare(a) == bare(b)
}

// =============================================================================
// TESTS
// =============================================================================
