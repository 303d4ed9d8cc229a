//! # API Errors
//!
//! One error type for every handler, rendered as `ErrorResponse` JSON.
//!
//! | Error              | Status | Extra fields               |
//! |--------------------|--------|----------------------------|
//! | validation         | 422    |                            |
//! | unauthenticated    | 401    | `redirect_to` (sign-in)    |
//! | denied             | 403    | `notice`, `redirect_to`    |
//! | not found          | 404    |                            |
//! | conflict           | 409    |                            |
//! | anything else      | 500    | generic message only       |
//!
//! Internal failures are logged server-side; the client never sees the
//! underlying message.

use super::types::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bizdash_core::{DashError, Notice};

/// Structured API error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
                notice: None,
                redirect_to: None,
            },
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation", message)
    }

    /// No (or an unknown) session token. The client goes to sign in.
    pub fn unauthenticated(sign_in_route: &str) -> Self {
        let mut err = Self::new(StatusCode::UNAUTHORIZED, "unauthenticated", "Sign in required");
        err.body.redirect_to = Some(sign_in_route.to_string());
        err
    }

    /// The session lacks the permission. The client shows the notice and
    /// goes to the default route.
    pub fn denied(default_route: &str) -> Self {
        let notice = Notice::access_denied();
        let mut err = Self::new(StatusCode::FORBIDDEN, "permission_denied", notice.message.clone());
        err.body.notice = Some(notice);
        err.body.redirect_to = Some(default_route.to_string());
        err
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    /// 500 with a generic body; `detail` only goes to the log.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(event = "internal_error", "{}", detail);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "Internal server error",
        )
    }
}

impl From<DashError> for ApiError {
    fn from(err: DashError) -> Self {
        match err {
            DashError::Validation(msg) => Self::validation(msg),
            DashError::InvalidTable(name) => {
                Self::validation(format!("invalid table name '{}'", name))
            }
            DashError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            DashError::Conflict(msg) => Self::conflict(msg),
            other => Self::internal(other),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        let status = |e: DashError| ApiError::from(e).status.as_u16();
        assert_eq!(status(DashError::Validation("x".into())), 422);
        assert_eq!(status(DashError::InvalidTable("X".into())), 422);
        assert_eq!(status(DashError::NotFound("catalog".into())), 404);
        assert_eq!(status(DashError::Conflict("dup".into())), 409);
        assert_eq!(status(DashError::Store("disk".into())), 500);
        assert_eq!(status(DashError::Export("pdf".into())), 500);
    }

    #[test]
    fn internal_errors_hide_detail() {
        let err = ApiError::from(DashError::Store("table products is corrupt".into()));
        assert_eq!(err.body.message, "Internal server error");
        assert!(err.body.redirect_to.is_none());
    }

    #[test]
    fn denial_carries_notice_and_redirect() {
        let err = ApiError::denied("/dashboard");
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.body.redirect_to.as_deref(), Some("/dashboard"));
        assert_eq!(
            err.body.notice.map(|n| n.message),
            Some(bizdash_core::guard::ACCESS_DENIED_MESSAGE.to_string())
        );
    }

    #[test]
    fn unauthenticated_points_at_sign_in() {
        let err = ApiError::unauthenticated("/login");
        assert_eq!(err.status.as_u16(), 401);
        assert_eq!(err.body.redirect_to.as_deref(), Some("/login"));
        assert!(err.body.notice.is_none());
    }
}
