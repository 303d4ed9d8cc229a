//! # API Endpoint Handlers
//!
//! Every data endpoint asks the permission resolver first: the table name
//! (or `catalogs`) is the resource, the HTTP method picks the action.

use super::{
    AppState, SessionEntry,
    auth::{authorize, current_session, open_session, require, session_token},
    error::ApiError,
    types::{
        CatalogListResponse, ExportQuery, HealthResponse, NavigateRequest, PermissionQuery,
        PermissionResponse, ProductsResponse, RoutesResponse, RowsResponse, SessionResponse,
        ShareRequest, ShareResponse, SignInRequest, SignOutResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use bizdash_core::{
    Action, CatalogFilter, CatalogId, DashError, DataStore, ExportFormat, GuardOutcome,
    NewCatalog, Predicate, QueryDescriptor, Row,
    catalog::{create_catalog, delete_catalog, get_catalog, list_catalogs, resolve_products},
    export_as,
    primitives::{CATALOGS_TABLE, ROLE_PERMISSIONS_TABLE},
    session_can, share_link,
    store::{ID_COLUMN, row_id, validate_table},
};
use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Header carrying the export digest.
const CHECKSUM_HEADER: &str = "x-content-checksum";

/// The resource guarding a table. Grants are edited under `roles`.
fn table_resource(table: &str) -> &str {
    if table == ROLE_PERMISSIONS_TABLE {
        "roles"
    } else {
        table
    }
}

/// Saved catalogs are only created or changed through `/catalogs`, which
/// validates them and keeps their filter fixed. Deleting by id stays open.
fn ensure_table_writable(table: &str) -> Result<(), ApiError> {
    if table == CATALOGS_TABLE {
        return Err(ApiError::validation(
            "catalogs are written through /catalogs, not /tables/catalogs",
        ));
    }
    Ok(())
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// SESSION HANDLERS
// =============================================================================

/// Open a session for a known user. Grants are loaded here and only here.
pub async fn sign_in_handler(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = {
        let store = state.store.read().await;
        match open_session(&*store, &request.email) {
            Ok(session) => session,
            Err(DashError::NotFound(_)) => {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "unknown_user",
                    "Sign-in for an unknown email"
                );
                return Err(ApiError::unauthenticated(state.sign_in_route()));
            }
            Err(e) => return Err(e.into()),
        }
    };

    let token = Uuid::new_v4().simple().to_string();
    let response = SessionResponse::new(token.as_str(), &session);
    tracing::info!(
        event = "sign_in",
        actor = %session.actor_id(),
        role = %session.actor().role,
        grants = session.grants().len(),
        "Session opened"
    );

    let guard = state.guard();
    state
        .sessions
        .write()
        .await
        .insert(token, SessionEntry { session, guard });

    Ok((StatusCode::OK, Json(response)))
}

/// Close the session named by the token header.
pub async fn sign_out_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let Some(token) = session_token(&headers) else {
        return Err(ApiError::unauthenticated(state.sign_in_route()));
    };
    let Some(entry) = state.sessions.write().await.remove(token) else {
        return Err(ApiError::unauthenticated(state.sign_in_route()));
    };

    tracing::info!(event = "sign_out", actor = %entry.session.actor_id(), "Session closed");
    Ok((StatusCode::OK, Json(SignOutResponse { signed_out: true })))
}

/// The current session's actor and grants.
pub async fn me_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    match current_session(&state, &headers).await {
        Some((token, session)) => Ok((StatusCode::OK, Json(SessionResponse::new(token, &session)))),
        None => Err(ApiError::unauthenticated(state.sign_in_route())),
    }
}

// =============================================================================
// PERMISSION & NAVIGATION HANDLERS
// =============================================================================

/// One permission question. Signed out is a plain `false`, not an error.
pub async fn permission_check_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PermissionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let action: Action = query.action.parse()?;
    let current = current_session(&state, &headers).await;
    let allowed = session_can(current.as_ref().map(|(_, s)| s), &query.resource, action);

    Ok((
        StatusCode::OK,
        Json(PermissionResponse {
            resource: query.resource,
            action: action.as_str().to_string(),
            allowed,
        }),
    ))
}

/// Run the route guard for a page the client is about to show.
///
/// Signed-in requests go through the session's own guard so repeated
/// navigations to the same path reuse the resolved outcome.
pub async fn navigate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NavigateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let path = request.path.trim();
    if !path.starts_with('/') {
        return Err(ApiError::validation("path must start with '/'"));
    }

    let outcome = {
        let mut sessions = state.sessions.write().await;
        let entry = match session_token(&headers) {
            Some(token) => sessions.get_mut(token),
            None => None,
        };
        match entry {
            Some(entry) => entry.guard.navigate(path, Some(&entry.session)),
            None => state.guard().check(path, None),
        }
    };

    if let GuardOutcome::Redirect {
        required: Some(required),
        to,
        ..
    } = &outcome
    {
        tracing::warn!(
            event = "permission_denied",
            path,
            resource = %required.resource,
            action = %required.action,
            redirect_to = %to,
            "Navigation denied"
        );
    }

    Ok((StatusCode::OK, Json(outcome)))
}

/// The route-permission table.
pub async fn routes_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = RoutesResponse {
        sign_in_route: state.sign_in_route().to_string(),
        default_route: state.default_route().to_string(),
        routes: state.routes.entries().to_vec(),
    };
    (StatusCode::OK, Json(response))
}

// =============================================================================
// TABLE HANDLERS
// =============================================================================

/// List rows. Every query parameter is an equality filter.
pub async fn table_list_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    validate_table(&table)?;
    authorize(&state, &headers, table_resource(&table), Action::View).await?;

    let query = params
        .into_iter()
        .fold(QueryDescriptor::new(table.as_str()), |q, (column, value)| {
            q.eq(column, value)
        });
    let rows = state.store.read().await.select(&query)?;

    Ok((StatusCode::OK, Json(RowsResponse::new(table, rows))))
}

pub async fn table_create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Json(row): Json<Row>,
) -> Result<impl IntoResponse, ApiError> {
    validate_table(&table)?;
    ensure_table_writable(&table)?;
    let session = authorize(&state, &headers, table_resource(&table), Action::Create).await?;

    let row = state.store.write().await.insert(&table, row)?;
    tracing::info!(event = "row_created", table = %table, actor = %session.actor_id());
    Ok((StatusCode::CREATED, Json(row)))
}

/// Insert or replace by `id`. Gated as a create; replacing an existing row
/// also needs edit.
pub async fn table_upsert_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Json(row): Json<Row>,
) -> Result<impl IntoResponse, ApiError> {
    validate_table(&table)?;
    ensure_table_writable(&table)?;
    let resource = table_resource(&table);
    let session = authorize(&state, &headers, resource, Action::Create).await?;

    // The write lock spans the existence check and the write.
    let mut store = state.store.write().await;
    let existing = match row_id(&row) {
        Some(id) => store.get(&table, &id)?,
        None => None,
    };
    if existing.is_some() {
        require(&state, &session, resource, Action::Edit)?;
    }
    let row = store.upsert(&table, row)?;
    tracing::info!(event = "row_upserted", table = %table, actor = %session.actor_id());
    Ok((StatusCode::OK, Json(row)))
}

pub async fn table_patch_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((table, id)): Path<(String, String)>,
    Json(patch): Json<Row>,
) -> Result<impl IntoResponse, ApiError> {
    validate_table(&table)?;
    ensure_table_writable(&table)?;
    let session = authorize(&state, &headers, table_resource(&table), Action::Edit).await?;

    let updated = state
        .store
        .write()
        .await
        .update(&table, &[Predicate::eq(ID_COLUMN, id.as_str())], patch)?;
    let Some(row) = updated.into_iter().next() else {
        return Err(ApiError::not_found(format!("{} row {} not found", table, id)));
    };

    tracing::info!(event = "row_updated", table = %table, id = %id, actor = %session.actor_id());
    Ok((StatusCode::OK, Json(row)))
}

pub async fn table_delete_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((table, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    validate_table(&table)?;
    let session = authorize(&state, &headers, table_resource(&table), Action::Delete).await?;

    let removed = state
        .store
        .write()
        .await
        .delete(&table, &[Predicate::eq(ID_COLUMN, id.as_str())])?;
    let Some(row) = removed.into_iter().next() else {
        return Err(ApiError::not_found(format!("{} row {} not found", table, id)));
    };

    tracing::info!(event = "row_deleted", table = %table, id = %id, actor = %session.actor_id());
    Ok((StatusCode::OK, Json(row)))
}

// =============================================================================
// CATALOG HANDLERS
// =============================================================================

pub async fn catalog_list_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers, CATALOGS_TABLE, Action::View).await?;
    let listed = list_catalogs(&*state.store.read().await)?;
    if listed.skipped > 0 {
        tracing::warn!(
            event = "catalog_rows_skipped",
            skipped = listed.skipped,
            "Catalog rows could not be parsed"
        );
    }
    Ok((StatusCode::OK, Json(CatalogListResponse::from(listed))))
}

pub async fn catalog_create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewCatalog>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authorize(&state, &headers, CATALOGS_TABLE, Action::Create).await?;

    let catalog = create_catalog(
        &mut *state.store.write().await,
        new,
        session.actor_id(),
        Utc::now(),
    )?;
    tracing::info!(
        event = "catalog_created",
        catalog = %catalog.id,
        actor = %session.actor_id(),
        catalog_type = ?catalog.filter.catalog_type,
        "Catalog saved"
    );
    Ok((StatusCode::CREATED, Json(catalog)))
}

pub async fn catalog_delete_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authorize(&state, &headers, CATALOGS_TABLE, Action::Delete).await?;
    let id: CatalogId = id.parse()?;

    let catalog = delete_catalog(&mut *state.store.write().await, id)?;
    tracing::info!(event = "catalog_deleted", catalog = %id, actor = %session.actor_id());
    Ok((StatusCode::OK, Json(catalog)))
}

/// The products an unsaved filter would select.
pub async fn catalog_preview_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(filter): Json<CatalogFilter>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers, CATALOGS_TABLE, Action::View).await?;
    let resolved = resolve_products(&*state.store.read().await, &filter, Utc::now())?;
    Ok((StatusCode::OK, Json(ProductsResponse::from(resolved))))
}

pub async fn catalog_products_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers, CATALOGS_TABLE, Action::View).await?;
    let id: CatalogId = id.parse()?;

    let store = state.store.read().await;
    let catalog = get_catalog(&*store, id)?;
    let resolved = resolve_products(&*store, &catalog.filter, Utc::now())?;
    Ok((StatusCode::OK, Json(ProductsResponse::from(resolved))))
}

/// Download the catalog as a PDF (default) or CSV attachment.
pub async fn catalog_export_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let session = authorize(&state, &headers, CATALOGS_TABLE, Action::View).await?;
    let id: CatalogId = id.parse()?;
    let format = match query.format.as_deref() {
        Some(raw) => raw.parse::<ExportFormat>()?,
        None => ExportFormat::Pdf,
    };

    let (catalog, resolved) = {
        let store = state.store.read().await;
        let catalog = get_catalog(&*store, id)?;
        let resolved = resolve_products(&*store, &catalog.filter, Utc::now())?;
        (catalog, resolved)
    };
    if resolved.skipped > 0 {
        tracing::warn!(
            event = "export_rows_skipped",
            catalog = %id,
            skipped = resolved.skipped,
            "Product rows could not be parsed"
        );
    }

    let artifact = export_as(format, &catalog.name, &resolved.products)?;
    tracing::info!(
        event = "catalog_exported",
        catalog = %id,
        actor = %session.actor_id(),
        format = %format,
        bytes = artifact.bytes.len(),
        checksum = %artifact.checksum,
        "Catalog exported"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.file_name),
            ),
            (HeaderName::from_static(CHECKSUM_HEADER), artifact.checksum),
        ],
        artifact.bytes,
    )
        .into_response())
}

/// WhatsApp click-to-chat link for the catalog.
pub async fn catalog_share_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<ShareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers, CATALOGS_TABLE, Action::View).await?;
    let id: CatalogId = id.parse()?;

    let store = state.store.read().await;
    let catalog = get_catalog(&*store, id)?;
    let resolved = resolve_products(&*store, &catalog.filter, Utc::now())?;
    let url = share_link(&request.phone, &catalog.name, &resolved.products)?;

    Ok((
        StatusCode::OK,
        Json(ShareResponse {
            url: url.to_string(),
            product_count: resolved.products.len(),
        }),
    ))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_permissions_table_is_guarded_as_roles() {
        assert_eq!(table_resource("role_permissions"), "roles");
        assert_eq!(table_resource("customers"), "customers");
    }

    #[test]
    fn catalogs_table_is_read_only() {
        assert!(ensure_table_writable("catalogs").is_err());
        assert!(ensure_table_writable("customers").is_ok());
        assert!(ensure_table_writable("role_permissions").is_ok());
    }
}
