//! # bizdash HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /auth/sign-in`, `POST /auth/sign-out`, `GET /auth/me` - Sessions
//! - `GET /permissions/check` - Ask one permission question
//! - `POST /navigate` - Run the route guard for a page
//! - `GET /routes` - The route-permission table
//! - `GET|POST|PUT /tables/{table}`, `PATCH|DELETE /tables/{table}/{id}` -
//!   Permission-gated table access for the dashboard forms
//! - `/catalogs/...` - Catalog builder, preview, export and share
//!
//! ## Security Configuration
//!
//! Read from [`Config`] (file + `BIZDASH_*` environment overrides):
//! - `cors_origins`: allowed origins, `["*"]` for all (default: localhost only)
//! - `rate_limit`: requests per second (default: 100, 0 to disable)
//! - `api_key`: if set, requires Bearer token authentication

mod auth;
mod error;
mod handlers;
mod middleware;
mod types;

pub use auth::{SESSION_HEADER, authorize, current_session, open_session, session_token};
pub use error::ApiError;
pub use middleware::create_rate_limiter;
// Re-export handlers and types for integration tests (via `bizdash::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    catalog_create_handler, catalog_delete_handler, catalog_export_handler,
    catalog_list_handler, catalog_preview_handler, catalog_products_handler,
    catalog_share_handler, health_handler, me_handler, navigate_handler, permission_check_handler,
    routes_handler, sign_in_handler, sign_out_handler, table_create_handler,
    table_delete_handler, table_list_handler, table_patch_handler, table_upsert_handler,
};
#[allow(unused_imports)]
pub use types::{
    CatalogListResponse, ErrorResponse, ExportQuery, HealthResponse, NavigateRequest,
    PermissionQuery, PermissionResponse, ProductsResponse, RoutesResponse, RowsResponse,
    SessionResponse, ShareRequest, ShareResponse, SignInRequest, SignOutResponse,
};

use crate::config::Config;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use bizdash_core::{DashError, RouteGuard, RouteTable, Session, StorageBackend};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// An open session and the route guard tracking its navigation.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub session: Session,
    pub guard: RouteGuard,
}

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The data collaborator.
    pub store: Arc<RwLock<StorageBackend>>,
    /// Open sessions by token.
    pub sessions: Arc<RwLock<BTreeMap<String, SessionEntry>>>,
    /// The route-permission table, built once at startup.
    pub routes: Arc<RouteTable>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build state over `store`. Fails if the configured route table is invalid.
    pub fn new(store: StorageBackend, config: Config) -> Result<Self, DashError> {
        let routes = Arc::new(config.route_table()?);
        Ok(Self {
            store: Arc::new(RwLock::new(store)),
            sessions: Arc::new(RwLock::new(BTreeMap::new())),
            routes,
            config: Arc::new(config),
        })
    }

    /// A fresh guard over the shared route table.
    #[must_use]
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::with_routes(
            Arc::clone(&self.routes),
            self.sign_in_route(),
            self.default_route(),
        )
    }

    #[must_use]
    pub fn sign_in_route(&self) -> &str {
        &self.config.navigation.sign_in_route
    }

    #[must_use]
    pub fn default_route(&self) -> &str {
        &self.config.navigation.default_route
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

fn allowed_headers() -> [HeaderName; 3] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(SESSION_HEADER),
    ]
}

/// Build the CORS layer from `cors_origins`.
///
/// - `["*"]`: allows all origins (development mode - use with caution!)
/// - unset: localhost only (restrictive default)
/// - otherwise: the listed origins; invalid entries are skipped
fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    match origins {
        Some([only]) if only == "*" => {
            tracing::warn!(
                "CORS: Allowing ALL origins (cors_origins = [\"*\"]). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(ALLOWED_METHODS)
                    .allow_headers(allowed_headers())
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = [
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:5173".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:5173".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(allowed_headers())
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Body limit - 2 MiB per request
/// 4. Rate Limiting - protects against floods (if enabled)
/// 5. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    let cors = build_cors_layer(config.server.cors_origins.as_deref());

    let rate_limiter = create_rate_limiter(config.server.rate_limit);
    if rate_limiter.is_some() {
        tracing::info!(
            "Rate limiting enabled: {} requests/second",
            config.server.rate_limit
        );
    } else {
        tracing::info!("Rate limiting disabled");
    }

    let api_key = config.api_key().map(|k| Arc::new(k.to_string()));
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - endpoints are reachable without a key. \
             Set BIZDASH_API_KEY or [server] api_key to enable it."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/auth/sign-in", post(handlers::sign_in_handler))
        .route("/auth/sign-out", post(handlers::sign_out_handler))
        .route("/auth/me", get(handlers::me_handler))
        .route(
            "/permissions/check",
            get(handlers::permission_check_handler),
        )
        .route("/navigate", post(handlers::navigate_handler))
        .route("/routes", get(handlers::routes_handler))
        .route(
            "/tables/{table}",
            get(handlers::table_list_handler)
                .post(handlers::table_create_handler)
                .put(handlers::table_upsert_handler),
        )
        .route(
            "/tables/{table}/{id}",
            patch(handlers::table_patch_handler).delete(handlers::table_delete_handler),
        )
        .route(
            "/catalogs",
            get(handlers::catalog_list_handler).post(handlers::catalog_create_handler),
        )
        .route("/catalogs/preview", post(handlers::catalog_preview_handler))
        .route(
            "/catalogs/{id}",
            axum::routing::delete(handlers::catalog_delete_handler),
        )
        .route(
            "/catalogs/{id}/products",
            get(handlers::catalog_products_handler),
        )
        .route("/catalogs/{id}/export", get(handlers::catalog_export_handler))
        .route("/catalogs/{id}/share", post(handlers::catalog_share_handler));

    // Authentication is innermost - runs last on request
    if let Some(key) = api_key {
        router = router.layer(axum_middleware::from_fn_with_state(
            key,
            auth::api_key_auth_middleware,
        ));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(store: StorageBackend, config: Config) -> Result<(), DashError> {
    let addr = config.bind_addr();
    let state = AppState::new(store, config)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DashError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("bizdash HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DashError::Io(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

// =============================================================================
// TESTS
// =============================================================================
