use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use learngraph::algo::{compute_importance, detect_cycles, find_learning_paths};
use learngraph::graph::{EdgeLabel, GraphStore, PropertyMap, VertexLabel};
use learngraph::query::QueryGateway;
use learngraph_algorithms::{Interrupt, PageRankConfig, PathSearchConfig};

/// A domain of `size` concepts wired as a chain with skip links every third
/// concept, and one learner studying all of them.
fn curriculum(size: usize) -> GraphStore {
    let mut store = GraphStore::new();
    let domain = store.upsert_vertex(VertexLabel::Domain, "mathematics", PropertyMap::new()).unwrap().id;
    let user = store.upsert_vertex(VertexLabel::User, "learner", PropertyMap::new()).unwrap().id;

    let concepts: Vec<_> = (0..size)
        .map(|i| {
            let id = store
                .upsert_vertex(VertexLabel::Concept, &format!("concept{}", i), PropertyMap::new())
                .unwrap()
                .id;
            store.upsert_edge(EdgeLabel::BelongsTo, id, domain, PropertyMap::new()).unwrap();
            store.upsert_edge(EdgeLabel::Studies, user, id, PropertyMap::new()).unwrap();
            id
        })
        .collect();

    for i in 0..size.saturating_sub(1) {
        store
            .upsert_edge(EdgeLabel::PrerequisiteOf, concepts[i], concepts[i + 1], PropertyMap::new())
            .unwrap();
        if i % 3 == 0 && i + 2 < size {
            store
                .upsert_edge(EdgeLabel::RelatedTo, concepts[i + 2], concepts[i], PropertyMap::new())
                .unwrap();
        }
    }
    store
}

/// Benchmark idempotent vertex upserts
fn bench_vertex_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("vertex_upsert");

    for size in [100, 1000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut store = GraphStore::new();
                for i in 0..size {
                    // every key is upserted twice; the second call is a lookup
                    let key = format!("user{}", i % (size / 2));
                    store.upsert_vertex(VertexLabel::User, &key, PropertyMap::new()).unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark concept importance over a domain
fn bench_importance(c: &mut Criterion) {
    let mut group = c.benchmark_group("importance");

    for size in [100, 1000, 10_000].iter() {
        let store = curriculum(*size);
        let config = PageRankConfig { damping_factor: 0.85, iterations: 20 };
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let ranked = compute_importance(&store, "mathematics", config, &Interrupt::new()).unwrap();
                criterion::black_box(ranked.len());
            });
        });
    }
    group.finish();
}

/// Benchmark bounded path and cycle enumeration
fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");
    let store = curriculum(1000);
    let search = PathSearchConfig::default();

    group.bench_function("learning_paths", |b| {
        b.iter(|| {
            let paths =
                find_learning_paths(&store, "learner", "concept0", "concept5", &search, &Interrupt::new()).unwrap();
            criterion::black_box(paths.len());
        });
    });

    group.bench_function("cycles", |b| {
        b.iter(|| {
            let cycles = detect_cycles(&store, "learner", 10, 8, &Interrupt::new()).unwrap();
            criterion::black_box(cycles.len());
        });
    });
    group.finish();
}

/// Benchmark query parsing plus execution
fn bench_query(c: &mut Criterion) {
    let store = curriculum(1000);
    let gateway = QueryGateway::default();
    let bindings = serde_json::Map::new();

    c.bench_function("query_out_values", |b| {
        b.iter(|| {
            let result = gateway
                .execute(&store, "g.V('learner').out('STUDIES').out('PREREQUISITE_OF').values('name').dedup()", &bindings)
                .unwrap();
            criterion::black_box(result.count);
        });
    });
}

criterion_group!(benches, bench_vertex_upsert, bench_importance, bench_traversal, bench_query);
criterion_main!(benches);
