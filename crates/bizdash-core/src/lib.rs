//! # bizdash-core
//!
//! The authorization and catalog engine of the bizdash back office - THE LOGIC.
//!
//! Nearly every dashboard screen is a form bound to one table. The parts
//! with decision logic live here:
//!
//! - **Permissions**: per-resource grants, the fail-closed resolver, the
//!   route-permission table and the route guard.
//! - **Catalogs**: filter composition, the conditional product query, and
//!   export to PDF/CSV plus the WhatsApp hand-off link.
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - No floats: prices are `rust_decimal::Decimal`
//! - Deterministic: `BTreeMap` everywhere, stores iterate in `id` order
//! - Time is an argument (`now`), never read inside a decision

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod export;
pub mod guard;
pub mod messaging;
pub mod permission;
pub mod primitives;
pub mod query;
pub mod routes;
pub mod session;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Action, Actor, ActorId, CatalogId, DashError, Role, Row};

// =============================================================================
// RE-EXPORTS: Permissions
// =============================================================================

pub use guard::{GuardOutcome, GuardState, Notice, NoticeLevel, RouteGuard};
pub use permission::{GrantSet, PermissionGrant, default_grants, has_permission};
pub use routes::{RequiredPermission, RouteEntry, RouteTable};
pub use session::{Session, find_actor, load_grants, session_can};

// =============================================================================
// RE-EXPORTS: Catalog Pipeline
// =============================================================================

pub use catalog::{
    Catalog, CatalogFilter, CatalogType, ListedCatalogs, NewCatalog, Product, ResolvedProducts,
};
pub use export::{Artifact, ExportFormat, export, export_as, export_csv};
pub use messaging::share_link;
pub use query::{Predicate, QueryDescriptor, build_query};
pub use store::{DataStore, MemoryStore, RedbStore, StorageBackend};
