//! Criterion benchmarks for the lexical search family over a synthetic
//! graph, mirroring the teacher's `[[bench]] name = "engram_bench"`
//! convention (`Cargo.toml.orig`).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use engram_graph::atoms::types::{Entity, KnowledgeGraph};
use engram_graph::index::Indices;
use engram_graph::search::{basic_search, fuzzy_search, ranked_search, EntityFilter, Pagination};

const WORDS: &[&str] = &[
    "pasta", "coffee", "mountain", "ocean", "library", "garden", "engine", "lantern", "compass",
    "harbor", "meadow", "ember", "glacier", "signal", "orbit",
];

fn synthetic_graph(n: usize) -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();
    for i in 0..n {
        let mut entity = Entity::new(format!("entity-{i}"), "person");
        for j in 0..5 {
            let word = WORDS[(i + j) % WORDS.len()];
            entity.add_observation(format!("loves {word} in the {word} season"));
        }
        graph.entities.push(entity);
    }
    graph
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    for &size in &[100usize, 500, 2000] {
        let graph = synthetic_graph(size);
        let mut indices = Indices::default();
        indices.rebuild(&graph);
        let filter = EntityFilter::default();
        let pagination = Pagination::default();

        group.bench_with_input(BenchmarkId::new("basic", size), &size, |b, _| {
            b.iter(|| basic_search(black_box(&graph), black_box(&indices), "pasta", &filter, &pagination))
        });

        group.bench_with_input(BenchmarkId::new("ranked", size), &size, |b, _| {
            b.iter(|| ranked_search(black_box(&graph), black_box(&indices), "pasta ocean", &filter, &pagination, 10))
        });

        group.bench_with_input(BenchmarkId::new("fuzzy", size), &size, |b, _| {
            b.iter(|| {
                fuzzy_search(
                    black_box(&graph),
                    black_box(&indices),
                    "pasto",
                    None,
                    200,
                    &filter,
                    &pagination,
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
