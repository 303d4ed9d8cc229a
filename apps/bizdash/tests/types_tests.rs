//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use bizdash::api::{
    ErrorResponse, ExportQuery, HealthResponse, PermissionQuery, ProductsResponse, RowsResponse,
    SessionResponse,
};
use bizdash_core::{
    Actor, ActorId, GrantSet, PermissionGrant, ResolvedProducts, Role, Row, Session,
};
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"healthy","version":"1.0.0"}"#;
    let health: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, "1.0.0");
}

// =============================================================================
// ERROR RESPONSE TESTS
// =============================================================================

#[test]
fn test_error_response_omits_empty_fields() {
    let error = ErrorResponse {
        code: "not_found".to_string(),
        message: "catalog not found".to_string(),
        notice: None,
        redirect_to: None,
    };

    let json = serde_json::to_string(&error).unwrap();
    assert_eq!(json, r#"{"code":"not_found","message":"catalog not found"}"#);
}

#[test]
fn test_error_response_deserializes_without_optionals() {
    let error: ErrorResponse =
        serde_json::from_str(r#"{"code":"validation","message":"bad"}"#).unwrap();
    assert!(error.notice.is_none());
    assert!(error.redirect_to.is_none());
}

// =============================================================================
// SESSION RESPONSE TESTS
// =============================================================================

#[test]
fn test_session_response_lists_grants_by_resource() {
    let actor = Actor::new(ActorId(Uuid::new_v4()), "sam@example.com", Role::SalesManager);
    let grants = GrantSet::new([
        PermissionGrant::view_only("products"),
        PermissionGrant::full("customers"),
    ])
    .unwrap();
    let session = Session::new(actor, grants);

    let response = SessionResponse::new("tok", &session);
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["token"], "tok");
    assert_eq!(value["actor"]["role"], "sales_manager");
    assert_eq!(value["grants"][0]["resource"], "customers");
    assert_eq!(value["grants"][1]["resource"], "products");
    assert_eq!(value["grants"][1]["can_create"], false);
}

// =============================================================================
// QUERY STRING TYPES
// =============================================================================

#[test]
fn test_permission_query_fields() {
    let query: PermissionQuery =
        serde_json::from_value(json!({"resource": "orders", "action": "edit"})).unwrap();
    assert_eq!(query.resource, "orders");
    assert_eq!(query.action, "edit");
}

#[test]
fn test_export_query_format_is_optional() {
    let query: ExportQuery = serde_json::from_str("{}").unwrap();
    assert!(query.format.is_none());
}

// =============================================================================
// LIST RESPONSES
// =============================================================================

#[test]
fn test_rows_response_counts_rows() {
    let mut row = Row::new();
    row.insert("id".to_string(), json!("c1"));
    let response = RowsResponse::new("customers", vec![row.clone(), row]);
    assert_eq!(response.count, 2);
    assert_eq!(response.table, "customers");
}

#[test]
fn test_products_response_from_resolved() {
    let response = ProductsResponse::from(ResolvedProducts {
        products: Vec::new(),
        skipped: 3,
    });
    assert_eq!(response.count, 0);
    assert_eq!(response.skipped, 3);
}
