//! # Catalog Benchmarks
//!
//! Performance benchmarks for the catalog pipeline and the route guard.
//!
//! Run with: `cargo bench -p bizdash-core`

use bizdash_core::catalog::resolve_products;
use bizdash_core::primitives::PRODUCTS_TABLE;
use bizdash_core::{
    Actor, ActorId, CatalogFilter, CatalogType, DataStore, GrantSet, MemoryStore, Role,
    RouteGuard, RouteTable, Row, Session, default_grants, export, export_csv,
};
use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;
use uuid::Uuid;

const STATUSES: [&str; 3] = ["active", "inactive", "seasonal"];

/// A store holding `size` products spread over three statuses and ten categories.
fn create_catalog_store(size: usize) -> MemoryStore {
    let mut store = MemoryStore::new();
    for i in 0..size {
        let mut row = Row::new();
        row.insert("id".into(), json!(format!("p{:06}", i)));
        row.insert("sku".into(), json!(format!("SKU-{}", i)));
        row.insert("name".into(), json!(format!("Product {}", i)));
        row.insert("category".into(), json!(format!("cat-{}", i % 10)));
        row.insert("mrp".into(), json!(format!("{}.{:02}", i % 500, i % 100)));
        row.insert("status".into(), json!(STATUSES[i % STATUSES.len()]));
        row.insert(
            "created_at".into(),
            json!(format!("2025-{:02}-01T00:00:00Z", i % 12 + 1)),
        );
        store.insert(PRODUCTS_TABLE, row).expect("insert");
    }
    store
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_resolve_products(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_products");
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("date");

    for size in [100, 1000, 10000].iter() {
        let store = create_catalog_store(*size);
        let filter = CatalogFilter {
            categories: vec!["cat-1".to_string(), "cat-2".to_string()],
            catalog_type: CatalogType::AgedStock,
            ..CatalogFilter::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(resolve_products(&store, &filter, now)));
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("date");

    for size in [100, 1000].iter() {
        let store = create_catalog_store(*size);
        let products = resolve_products(&store, &CatalogFilter::default(), now)
            .expect("resolve")
            .products;

        group.bench_with_input(BenchmarkId::new("pdf", size), size, |b, _| {
            b.iter(|| black_box(export("Bench", &products)));
        });
        group.bench_with_input(BenchmarkId::new("csv", size), size, |b, _| {
            b.iter(|| black_box(export_csv("Bench", &products)));
        });
    }

    group.finish();
}

fn bench_guard(c: &mut Criterion) {
    let guard = RouteGuard::new(Arc::new(RouteTable::builtin()));
    let session = Session::new(
        Actor::new(ActorId(Uuid::new_v4()), "bench@example.com", Role::SalesManager),
        GrantSet::new(default_grants(Role::SalesManager)).expect("grants"),
    );

    c.bench_function("guard_check_pattern_route", |b| {
        b.iter(|| black_box(guard.check(black_box("/products/123/edit"), Some(&session))));
    });
}

criterion_group!(benches, bench_resolve_products, bench_export, bench_guard);
criterion_main!(benches);
