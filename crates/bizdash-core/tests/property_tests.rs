//! # Property-Based Tests
//!
//! Invariants of the permission resolver, the route guard and the catalog
//! filter builder, checked with proptest.

use bizdash_core::permission::RESOURCES;
use bizdash_core::query::{CATEGORY_COLUMN, COLLECTION_COLUMN, STATUS_COLUMN};
use bizdash_core::{
    Action, Actor, ActorId, CatalogFilter, CatalogType, GrantSet, GuardOutcome, PermissionGrant,
    Predicate, Role, RouteGuard, RouteTable, Session, build_query, has_permission,
};
use chrono::{DateTime, Utc};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

fn action() -> impl Strategy<Value = Action> {
    prop::sample::select(Action::ALL.to_vec())
}

fn grant(resource: String) -> impl Strategy<Value = PermissionGrant> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        move |(can_view, can_create, can_edit, can_delete)| PermissionGrant {
            resource: resource.clone(),
            can_view,
            can_create,
            can_edit,
            can_delete,
        },
    )
}

fn grant_set() -> impl Strategy<Value = GrantSet> {
    btree_map(prop::sample::select(RESOURCES.to_vec()), any::<[bool; 4]>(), 0..RESOURCES.len())
        .prop_map(|flags| {
            let grants = flags.into_iter().map(|(resource, [v, c, e, d])| PermissionGrant {
                resource: resource.to_string(),
                can_view: v,
                can_create: c,
                can_edit: e,
                can_delete: d,
            });
            GrantSet::new(grants).expect("distinct resources")
        })
}

fn id_list() -> impl Strategy<Value = Vec<String>> {
    vec("[a-z]{1,8}", 0..5)
}

fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|secs| DateTime::from_timestamp(secs, 0).expect("in range"))
}

// =============================================================================
// PERMISSION RESOLVER
// =============================================================================

proptest! {
    /// Without a grant for the resource, every action is denied.
    #[test]
    fn missing_grant_denies_every_action(set in grant_set(), action in action()) {
        for resource in RESOURCES {
            if set.get(resource).is_none() {
                prop_assert!(!has_permission(Some(&set), resource, action));
            }
        }
    }

    /// With a grant, the answer is exactly the flag for the action.
    #[test]
    fn answer_equals_flag(g in grant("customers".to_string()), action in action()) {
        let expected = g.allows(action);
        let set = GrantSet::new([g]).expect("single grant");
        prop_assert_eq!(has_permission(Some(&set), "customers", action), expected);
    }

    /// No session never allows anything.
    #[test]
    fn signed_out_never_allowed(resource in "[a-z_]{0,12}", action in action()) {
        prop_assert!(!has_permission(None, &resource, action));
    }

    /// Blank resources are denied even if a blank grant slipped in.
    #[test]
    fn blank_resource_denied(spaces in " {0,4}", action in action()) {
        let set = GrantSet::new([PermissionGrant::full(spaces.clone())]).expect("single grant");
        prop_assert!(!has_permission(Some(&set), &spaces, action));
    }
}

// =============================================================================
// ROUTE GUARD
// =============================================================================

proptest! {
    /// The guard renders exactly when the resolver allows the route's
    /// permission; otherwise it redirects to the default route.
    #[test]
    fn guard_agrees_with_resolver(set in grant_set()) {
        let table = Arc::new(RouteTable::builtin());
        let guard = RouteGuard::new(Arc::clone(&table));
        let session = Session::new(
            Actor::new(ActorId(Uuid::new_v4()), "p@example.com", Role::SalesManager),
            set.clone(),
        );
        for entry in table.entries() {
            let path = entry.path.replace(":id", "42").replace(":role", "owner");
            let allowed = has_permission(Some(&set), &entry.resource, entry.action);
            match guard.check(&path, Some(&session)) {
                GuardOutcome::Render => prop_assert!(allowed, "{} rendered", path),
                GuardOutcome::Redirect { to, notice, .. } => {
                    prop_assert!(!allowed, "{} redirected", path);
                    prop_assert_eq!(to, guard.default_route());
                    prop_assert!(notice.is_some());
                }
            }
        }
    }
}

// =============================================================================
// CATALOG FILTER BUILDER
// =============================================================================

proptest! {
    /// Empty lists produce only the type clause.
    #[test]
    fn empty_lists_only_type_clause(now in instant()) {
        let q = build_query(&CatalogFilter::default(), now);
        prop_assert_eq!(q.predicates, vec![Predicate::eq(STATUS_COLUMN, "active")]);
    }

    /// One clause per non-empty list, plus exactly one type clause.
    #[test]
    fn clause_count_matches_lists(
        collections in id_list(),
        categories in id_list(),
        subcategories in id_list(),
        now in instant(),
    ) {
        let filter = CatalogFilter {
            collections: collections.clone(),
            categories: categories.clone(),
            subcategories: subcategories.clone(),
            catalog_type: CatalogType::Seasonal,
        };
        let real_collections = collections.iter().filter(|c| c.as_str() != "none").count();
        let expected = usize::from(real_collections > 0)
            + usize::from(!categories.is_empty())
            + usize::from(!subcategories.is_empty())
            + 1;
        let q = build_query(&filter, now);
        prop_assert_eq!(q.predicates.len(), expected);
        prop_assert_eq!(
            q.predicates.last(),
            Some(&Predicate::eq(STATUS_COLUMN, "seasonal"))
        );
    }

    /// The sentinel never reaches the query.
    #[test]
    fn sentinel_never_in_collection_clause(extra in id_list(), now in instant()) {
        let mut collections = extra;
        collections.push("none".to_string());
        let filter = CatalogFilter { collections, ..CatalogFilter::default() };
        let q = build_query(&filter, now);
        for p in &q.predicates {
            if let Predicate::In { column, values } = p
                && column == COLLECTION_COLUMN
            {
                prop_assert!(!values.iter().any(|v| v == "none"));
            }
        }
    }

    /// The builder is pure: same input, same output.
    #[test]
    fn builder_is_deterministic(categories in id_list(), now in instant()) {
        let filter = CatalogFilter {
            categories,
            catalog_type: CatalogType::AgedStock,
            ..CatalogFilter::default()
        };
        prop_assert_eq!(build_query(&filter, now), build_query(&filter, now));
        let q = build_query(&filter, now);
        let has_category = q.predicates.iter().any(|p| p.column() == CATEGORY_COLUMN);
        prop_assert_eq!(has_category, !filter.categories.is_empty());
    }
}
