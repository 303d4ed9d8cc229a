//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use bizdash_core::{
    Actor, Catalog, ListedCatalogs, Notice, PermissionGrant, Product, ResolvedProducts, RouteEntry,
    Row, Session,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx response produced by a handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    /// Where the client should navigate next, for auth and permission errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
}

/// The open session: its token, who it is and what it may do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub actor: Actor,
    pub grants: Vec<PermissionGrant>,
}

impl SessionResponse {
    pub fn new(token: impl Into<String>, session: &Session) -> Self {
        Self {
            token: token.into(),
            actor: session.actor().clone(),
            grants: session.grants().iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignOutResponse {
    pub signed_out: bool,
}

// =============================================================================
// PERMISSIONS & NAVIGATION
// =============================================================================

/// Query string of `GET /permissions/check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionQuery {
    pub resource: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub resource: String,
    pub action: String,
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateRequest {
    pub path: String,
}

/// The route-permission table plus the two fixed destinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesResponse {
    pub sign_in_route: String,
    pub default_route: String,
    pub routes: Vec<RouteEntry>,
}

// =============================================================================
// TABLES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowsResponse {
    pub table: String,
    pub count: usize,
    pub rows: Vec<Row>,
}

impl RowsResponse {
    pub fn new(table: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            table: table.into(),
            count: rows.len(),
            rows,
        }
    }
}

// =============================================================================
// CATALOGS
// =============================================================================

/// Saved catalogs. `skipped` counts stored rows that were not valid
/// catalogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogListResponse {
    pub count: usize,
    #[serde(default)]
    pub skipped: usize,
    pub catalogs: Vec<Catalog>,
}

impl From<ListedCatalogs> for CatalogListResponse {
    fn from(listed: ListedCatalogs) -> Self {
        Self {
            count: listed.catalogs.len(),
            skipped: listed.skipped,
            catalogs: listed.catalogs,
        }
    }
}

/// Products a filter selects. `skipped` counts rows that were not valid
/// products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub count: usize,
    pub skipped: usize,
    pub products: Vec<Product>,
}

impl From<ResolvedProducts> for ProductsResponse {
    fn from(resolved: ResolvedProducts) -> Self {
        Self {
            count: resolved.products.len(),
            skipped: resolved.skipped,
            products: resolved.products,
        }
    }
}

/// Query string of `GET /catalogs/{id}/export`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRequest {
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    pub url: String,
    pub product_count: usize,
}
