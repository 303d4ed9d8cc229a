//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, open_session};
use crate::config::Config;
use bizdash_core::{
    Action, CatalogId, DashError, DataStore, ExportFormat, PermissionGrant, Role, Row,
    StorageBackend,
    catalog::{get_catalog, resolve_products},
    export_as, find_actor,
    permission::default_grants,
    primitives::{ROLE_PERMISSIONS_TABLE, USERS_TABLE},
    session::normalize_email,
    store::ID_COLUMN,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub database: PathBuf,
    pub backend: String,
    pub config: Option<PathBuf>,
    pub json_mode: bool,
    pub verbose: bool,
}

impl Context {
    /// Open the configured store.
    pub fn open_store(&self) -> Result<StorageBackend, DashError> {
        let store = StorageBackend::open(&self.backend, &self.database)?;
        if !store.is_persistent() {
            tracing::warn!("Using the in-memory backend: nothing will be kept after exit");
        }
        Ok(store)
    }

    pub fn load_config(&self) -> Result<Config, DashError> {
        Config::load_with_env(self.config.as_deref())
    }
}

/// Print `value` as pretty JSON.
fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Validate output path for security.
///
/// The parent directory must exist; it is canonicalized to resolve ".."
/// and symlinks before the file name is joined back on.
fn validate_output_path(path: &Path) -> Result<PathBuf, DashError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        DashError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(DashError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| DashError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Stable row id of a role's grant, so re-seeding replaces instead of
/// duplicating.
fn grant_row_id(role: Role, resource: &str) -> String {
    format!("{}:{}", role.as_str(), resource)
}

fn grant_row(role: Role, grant: &PermissionGrant) -> Row {
    let mut row = grant.to_row(role);
    row.insert(ID_COLUMN.to_string(), grant_row_id(role, &grant.resource).into());
    row
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    ctx: &Context,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), DashError> {
    let mut config = ctx.load_config()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let store = ctx.open_store()?;

    println!("bizdash server starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.bind_addr());
    println!("  Backend:  {}", ctx.backend);
    println!("  Database: {:?}", ctx.database);
    println!(
        "  Routes:   {}",
        if config.routes.is_empty() {
            "built-in".to_string()
        } else {
            format!("{} from config", config.routes.len())
        }
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(store, config).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Seed every role's default grants and, optionally, an owner account.
///
/// Existing grant rows are kept unless `force` is set.
pub fn cmd_init(ctx: &Context, owner_email: Option<&str>, force: bool) -> Result<(), DashError> {
    let mut store = ctx.open_store()?;
    let mut seeded = 0usize;
    let mut kept = 0usize;

    for role in Role::ALL {
        for grant in default_grants(role) {
            let id = grant_row_id(role, &grant.resource);
            if !force && store.get(ROLE_PERMISSIONS_TABLE, &id)?.is_some() {
                kept += 1;
                continue;
            }
            store.upsert(ROLE_PERMISSIONS_TABLE, grant_row(role, &grant))?;
            seeded += 1;
        }
    }

    let owner = match owner_email {
        Some(email) => Some(ensure_owner(&mut store, email)?),
        None => None,
    };

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "database": ctx.database.to_string_lossy(),
            "grants_seeded": seeded,
            "grants_kept": kept,
            "owner": owner,
        }));
        return Ok(());
    }

    println!("Seeded {} grants ({} already present) in {:?}", seeded, kept, ctx.database);
    if let Some(owner) = owner {
        println!("Owner account: {}", owner);
    }
    Ok(())
}

/// The owner row for `email`, created if missing. Returns the user id.
fn ensure_owner(store: &mut StorageBackend, email: &str) -> Result<String, DashError> {
    let email = normalize_email(email);
    if !email.contains('@') {
        return Err(DashError::Validation(format!(
            "'{}' is not an email address",
            email
        )));
    }

    match find_actor(&*store, &email) {
        Ok(actor) => {
            tracing::info!("User {} already exists ({})", email, actor.id);
            return Ok(actor.id.to_string());
        }
        Err(DashError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let mut row = Row::new();
    row.insert(ID_COLUMN.to_string(), Uuid::new_v4().to_string().into());
    row.insert("email".to_string(), email.into());
    row.insert("role".to_string(), Role::Owner.as_str().into());
    let saved = store.insert(USERS_TABLE, row)?;
    Ok(bizdash_core::store::row_id(&saved).unwrap_or_default())
}

// =============================================================================
// GRANT COMMAND
// =============================================================================

/// Replace one role's grant for one resource. Flags are
/// `[view, create, edit, delete]`.
pub fn cmd_grant(
    ctx: &Context,
    role: &str,
    resource: &str,
    flags: [bool; 4],
) -> Result<(), DashError> {
    let role: Role = role.parse()?;
    let resource = resource.trim();
    if resource.is_empty() {
        return Err(DashError::Validation("resource is required".to_string()));
    }

    let [can_view, can_create, can_edit, can_delete] = flags;
    let grant = PermissionGrant {
        resource: resource.to_string(),
        can_view,
        can_create,
        can_edit,
        can_delete,
    };

    let mut store = ctx.open_store()?;
    store.upsert(ROLE_PERMISSIONS_TABLE, grant_row(role, &grant))?;

    if ctx.json_mode {
        print_json(&serde_json::json!({ "role": role, "grant": grant }));
        return Ok(());
    }

    let allowed: Vec<&str> = Action::ALL
        .into_iter()
        .filter(|a| grant.allows(*a))
        .map(Action::as_str)
        .collect();
    println!(
        "{} on {}: {}",
        role,
        resource,
        if allowed.is_empty() {
            "no access".to_string()
        } else {
            allowed.join(", ")
        }
    );
    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Answer one permission question the way a fresh session would.
pub fn cmd_check(ctx: &Context, email: &str, resource: &str, action: &str) -> Result<(), DashError> {
    let action: Action = action.parse()?;
    let store = ctx.open_store()?;
    let session = open_session(&store, email)?;
    let allowed = session.can(resource, action);

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "email": session.actor().email,
            "role": session.actor().role,
            "resource": resource,
            "action": action,
            "allowed": allowed,
        }));
        return Ok(());
    }

    println!(
        "{} ({}) {} {} {}",
        session.actor().email,
        session.actor().role,
        if allowed { "MAY" } else { "may NOT" },
        action,
        resource
    );
    if ctx.verbose {
        for grant in session.grants().iter() {
            println!(
                "  {:<12} view={} create={} edit={} delete={}",
                grant.resource, grant.can_view, grant.can_create, grant.can_edit, grant.can_delete
            );
        }
    }
    Ok(())
}

// =============================================================================
// ROUTES COMMAND
// =============================================================================

/// Print the route-permission table in force.
pub fn cmd_routes(ctx: &Context) -> Result<(), DashError> {
    let config = ctx.load_config()?;
    let table = config.route_table()?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "sign_in_route": config.navigation.sign_in_route,
            "default_route": config.navigation.default_route,
            "routes": table.entries(),
        }));
        return Ok(());
    }

    println!("Route Permissions");
    println!("=================");
    println!("Sign-in route: {}", config.navigation.sign_in_route);
    println!("Default route: {}", config.navigation.default_route);
    println!();
    for entry in table.entries() {
        println!("{:<28} {:<12} {}", entry.path, entry.resource, entry.action);
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write a saved catalog to `output`.
pub fn cmd_export(
    ctx: &Context,
    catalog: &str,
    output: &Path,
    format: Option<&str>,
) -> Result<(), DashError> {
    let validated_output = validate_output_path(output)?;
    let id: CatalogId = catalog.parse()?;
    let format: ExportFormat = match format {
        Some(f) => f.parse()?,
        None => output
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
            .unwrap_or(ExportFormat::Pdf),
    };

    let store = ctx.open_store()?;
    let catalog = get_catalog(&store, id)?;
    let resolved = resolve_products(&store, &catalog.filter, Utc::now())?;
    if resolved.skipped > 0 {
        tracing::warn!("{} product rows could not be parsed and were skipped", resolved.skipped);
    }

    let artifact = export_as(format, &catalog.name, &resolved.products)?;
    std::fs::write(&validated_output, &artifact.bytes)
        .map_err(|e| DashError::Io(format!("Write file: {}", e)))?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "catalog": catalog.id,
            "format": format.to_string(),
            "products": resolved.products.len(),
            "bytes": artifact.bytes.len(),
            "checksum": artifact.checksum,
            "path": validated_output.to_string_lossy(),
        }));
        return Ok(());
    }

    println!("Checksum: {}", artifact.checksum);
    println!(
        "Exported {} products ({} bytes) to {:?}",
        resolved.products.len(),
        artifact.bytes.len(),
        validated_output
    );
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
