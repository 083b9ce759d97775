//! Benchmarks for the multiterminal cut solver
//!
//! Measures:
//! - Solve time on rings of cliques with one terminal per clique
//! - Scaling over worker pool sizes
//! - Solve time on random graphs with a fixed terminal count

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use std::collections::HashSet;

use multicut::{EdgeWeight, MulticutConfig, MulticutSolver, MutableGraph, NodeId};

/// Ring of unit cliques joined corner to corner.
fn ring_of_cliques(cliques: usize, size: usize) -> (usize, Vec<(NodeId, NodeId, EdgeWeight)>) {
    let mut edges = Vec::new();
    for k in 0..cliques {
        let base = (k * size) as NodeId;
        for i in 0..size as NodeId {
            for j in i + 1..size as NodeId {
                edges.push((base + i, base + j, 1));
            }
        }
        let next = ((k + 1) % cliques * size) as NodeId;
        edges.push((base, next, 1));
    }
    (cliques * size, edges)
}

fn random_graph(n: usize, m: usize, seed: u64) -> Vec<(NodeId, NodeId, EdgeWeight)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut edges = Vec::with_capacity(m);
    let mut edge_set = HashSet::new();
    while edges.len() < m {
        let u = rng.gen_range(0..n as NodeId);
        let v = rng.gen_range(0..n as NodeId);
        if u != v {
            let key = if u < v { (u, v) } else { (v, u) };
            if edge_set.insert(key) {
                edges.push((u, v, rng.gen_range(1..=8)));
            }
        }
    }
    edges
}

fn solver_with(threads: usize) -> MulticutSolver {
    let mut config = MulticutConfig::sequential();
    config.threads = threads;
    MulticutSolver::new(Arc::new(config))
}

fn bench_clique_rings(c: &mut Criterion) {
    let mut group = c.benchmark_group("clique_rings");
    for cliques in [3usize, 4, 5] {
        let (n, edges) = ring_of_cliques(cliques, 4);
        let terminals: Vec<NodeId> = (0..cliques).map(|k| (k * 4) as NodeId).collect();
        group.bench_with_input(BenchmarkId::from_parameter(cliques), &cliques, |b, _| {
            let solver = solver_with(1);
            b.iter(|| {
                let mut graph = MutableGraph::from_edges(n, &edges).unwrap();
                let result = solver.solve(&mut graph, &terminals).unwrap();
                black_box(result.value)
            });
        });
    }
    group.finish();
}

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    let (n, edges) = ring_of_cliques(5, 4);
    let terminals: Vec<NodeId> = (0..5).map(|k| (k * 4) as NodeId).collect();
    for threads in [1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &t| {
            let solver = solver_with(t);
            b.iter(|| {
                let mut graph = MutableGraph::from_edges(n, &edges).unwrap();
                let result = solver.solve(&mut graph, &terminals).unwrap();
                black_box(result.value)
            });
        });
    }
    group.finish();
}

fn bench_random_graphs(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_graphs");
    for n in [20usize, 40] {
        let edges = random_graph(n, 3 * n, 0xbeef);
        let terminals = [0 as NodeId, (n / 2) as NodeId, (n - 1) as NodeId];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            let solver = solver_with(1);
            b.iter(|| {
                let mut graph = MutableGraph::from_edges(n, &edges).unwrap();
                let result = solver.solve(&mut graph, &terminals).unwrap();
                black_box(result.value)
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_clique_rings,
    bench_thread_scaling,
    bench_random_graphs
);
criterion_main!(benches);
