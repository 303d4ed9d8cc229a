//! # Middleware Module
//!
//! Rate limiting for the bizdash HTTP API. The limit comes from
//! `[server] rate_limit` or `BIZDASH_RATE_LIMIT` (requests per second).

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Global rate limiter type alias.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// A global limiter allowing `requests_per_second`, or `None` when the limit
/// is 0 (limiting disabled).
pub fn create_rate_limiter(requests_per_second: u32) -> Option<GlobalRateLimiter> {
    NonZeroU32::new(requests_per_second)
        .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))))
}

/// Rate limiting middleware.
///
/// Returns 429 Too Many Requests once the global budget is spent.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(
                event = "rate_limited",
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
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
    fn test_create_rate_limiter() {
        let limiter = create_rate_limiter(50).expect("limiter");
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_zero_disables_limiting() {
        assert!(create_rate_limiter(0).is_none());
    }

    #[test]
    fn test_budget_runs_out() {
        let limiter = create_rate_limiter(1).expect("limiter");
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
