//! # Authentication Module
//!
//! Two layers of identity for the bizdash HTTP API.
//!
//! 1. **API key** (service level). If a key is configured, every request
//!    except `/health` must carry it:
//!    ```text
//!    Authorization: Bearer <your-api-key>
//!    ```
//! 2. **Session token** (user level). `POST /auth/sign-in` returns a token;
//!    permission-gated endpoints read it from the `x-session-token` header.

use super::AppState;
use super::error::ApiError;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use bizdash_core::{
    Action, DashError, DataStore, GrantSet, Session, find_actor, load_grants,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the session token.
pub const SESSION_HEADER: &str = "x-session-token";

/// The configured API key, shared with the middleware.
pub type ApiKey = Arc<String>;

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// Constant-time key comparison.
///
/// Both keys are padded to the same length so `ct_eq` always runs over the
/// same number of bytes; the length check happens after.
fn keys_match(provided: &str, expected: &str) -> bool {
    let provided_bytes = provided.as_bytes();
    let expected_bytes = expected.as_bytes();

    let max_len = provided_bytes.len().max(expected_bytes.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided_bytes.len()].copy_from_slice(provided_bytes);
    padded_expected[..expected_bytes.len()].copy_from_slice(expected_bytes);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided_bytes.len() == expected_bytes.len()
}

/// API key authentication middleware.
///
/// Only installed when a key is configured:
/// - `/health` is always allowed (for load balancer health checks)
/// - All other endpoints require `Authorization: Bearer <key>` (or the raw key)
pub async fn api_key_auth_middleware(
    State(expected): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(header_value) => {
            let provided_key = header_value.strip_prefix("Bearer ").unwrap_or(header_value);

            if keys_match(provided_key, &expected) {
                Ok(next.run(request).await)
            } else {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "invalid_api_key",
                    "Authentication failed: invalid API key"
                );
                Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
            }
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// SESSIONS
// =============================================================================

/// The session token sent with the request, if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Open a session for the user with this email.
///
/// Grants are read once, here. A role whose grant rows contradict each
/// other gets no grants at all.
pub fn open_session<S: DataStore + ?Sized>(store: &S, email: &str) -> Result<Session, DashError> {
    let actor = find_actor(store, email)?;
    let grants = match load_grants(store, actor.role) {
        Ok(grants) => grants,
        Err(DashError::Conflict(detail)) => {
            tracing::warn!(
                event = "grant_conflict",
                role = %actor.role,
                "Conflicting grants, denying everything: {}",
                detail
            );
            GrantSet::empty()
        }
        Err(e) => return Err(e),
    };
    Ok(Session::new(actor, grants))
}

/// The session behind the request's token, if it is open.
pub async fn current_session(state: &AppState, headers: &HeaderMap) -> Option<(String, Session)> {
    let token = session_token(headers)?;
    let sessions = state.sessions.read().await;
    sessions
        .get(token)
        .map(|entry| (token.to_string(), entry.session.clone()))
}

/// Require an open session allowed to perform `action` on `resource`.
///
/// No session is 401 (go sign in); a session without the grant is 403
/// (go to the default route).
pub async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    resource: &str,
    action: Action,
) -> Result<Session, ApiError> {
    let Some((_, session)) = current_session(state, headers).await else {
        tracing::warn!(
            event = "auth_failure",
            reason = "no_session",
            resource,
            action = %action,
            "Request without an open session"
        );
        return Err(ApiError::unauthenticated(state.sign_in_route()));
    };

    require(state, &session, resource, action)?;
    Ok(session)
}

/// Check one more permission on an already authorized session.
pub fn require(
    state: &AppState,
    session: &Session,
    resource: &str,
    action: Action,
) -> Result<(), ApiError> {
    if session.can(resource, action) {
        return Ok(());
    }
    tracing::warn!(
        event = "permission_denied",
        actor = %session.actor_id(),
        role = %session.actor().role,
        resource,
        action = %action,
        "Permission denied"
    );
    Err(ApiError::denied(state.default_route()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use bizdash_core::primitives::{ROLE_PERMISSIONS_TABLE, USERS_TABLE};
    use bizdash_core::{MemoryStore, PermissionGrant, Role, Row};
    use serde_json::json;

    #[test]
    fn key_comparison() {
        assert!(keys_match("secret", "secret"));
        assert!(!keys_match("secret", "secret2"));
        assert!(!keys_match("", "secret"));
        assert!(!keys_match("Secret", "secret"));
    }

    #[test]
    fn blank_session_header_is_ignored() {
        let mut headers = HeaderMap::new();
        assert!(session_token(&headers).is_none());
        headers.insert(SESSION_HEADER, HeaderValue::from_static("  "));
        assert!(session_token(&headers).is_none());
        headers.insert(SESSION_HEADER, HeaderValue::from_static(" abc "));
        assert_eq!(session_token(&headers), Some("abc"));
    }

    #[test]
    fn conflicting_grants_open_a_deny_all_session() {
        let mut store = MemoryStore::new();
        let mut user = Row::new();
        user.insert("id".into(), json!(uuid::Uuid::new_v4().to_string()));
        user.insert("email".into(), json!("ann@example.com"));
        user.insert("role".into(), json!("catalog_builder"));
        store.insert(USERS_TABLE, user).expect("user");
        for grant in [
            PermissionGrant::full("catalogs"),
            PermissionGrant::view_only("catalogs"),
        ] {
            store
                .insert(ROLE_PERMISSIONS_TABLE, grant.to_row(Role::CatalogBuilder))
                .expect("grant");
        }

        let session = open_session(&store, "ann@example.com").expect("session");
        assert!(session.grants().is_empty());
        assert!(!session.can("catalogs", Action::View));
    }
}
