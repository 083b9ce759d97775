//! End-to-end tests for the multiterminal cut solver

use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use multicut::{metis, EdgeWeight, MulticutConfig, MulticutSolver, MutableGraph, NodeId};

fn sequential_solver() -> MulticutSolver {
    MulticutSolver::new(Arc::new(MulticutConfig::sequential()))
}

fn parallel_solver(threads: usize) -> MulticutSolver {
    let mut config = MulticutConfig::sequential();
    config.threads = threads;
    MulticutSolver::new(Arc::new(config))
}

fn solve(edges: &[(NodeId, NodeId, EdgeWeight)], n: usize, terminals: &[NodeId]) -> EdgeWeight {
    let mut graph = MutableGraph::from_edges(n, edges).unwrap();
    let result = sequential_solver().solve(&mut graph, terminals).unwrap();
    assert!(result.exact);
    result.value
}

/// Exhaustive optimum over all block assignments of the free vertices;
/// usable for graphs of up to ~16 vertices.
fn brute_force(
    edges: &[(NodeId, NodeId, EdgeWeight)],
    n: usize,
    terminals: &[NodeId],
) -> EdgeWeight {
    let k = terminals.len();
    let mut block = vec![usize::MAX; n];
    for (i, &t) in terminals.iter().enumerate() {
        block[t as usize] = i;
    }
    let free: Vec<usize> = (0..n).filter(|&v| block[v] == usize::MAX).collect();
    let mut best = EdgeWeight::MAX;
    for assignment in 0..k.pow(free.len() as u32) {
        let mut rest = assignment;
        for &v in &free {
            block[v] = rest % k;
            rest /= k;
        }
        let cost = edges
            .iter()
            .filter(|&&(u, v, _)| block[u as usize] != block[v as usize])
            .map(|&(_, _, w)| w)
            .sum();
        best = best.min(cost);
    }
    best
}

fn unit_clique(n: usize) -> Vec<(NodeId, NodeId, EdgeWeight)> {
    let mut edges = Vec::new();
    for i in 0..n as NodeId {
        for j in i + 1..n as NodeId {
            edges.push((i, j, 1));
        }
    }
    edges
}

/// Four unit triangles in a ring, joined corner to corner.
fn triangle_ring() -> Vec<(NodeId, NodeId, EdgeWeight)> {
    let mut edges = Vec::new();
    for k in 0..4u32 {
        let base = 3 * k;
        edges.push((base, base + 1, 1));
        edges.push((base + 1, base + 2, 1));
        edges.push((base, base + 2, 1));
    }
    for k in 0..4u32 {
        edges.push((3 * k, (3 * k + 3) % 12, 1));
    }
    edges
}

#[test]
fn clique_two_terminals() {
    let edges = unit_clique(4);
    assert_eq!(solve(&edges, 4, &[0, 1]), 3);
    assert_eq!(brute_force(&edges, 4, &[0, 1]), 3);
}

#[test]
fn unit_path_of_length_ten() {
    let edges: Vec<_> = (0..9u32).map(|i| (i, i + 1, 1)).collect();
    assert_eq!(solve(&edges, 10, &[0, 9]), 1);
}

#[test]
fn ring_of_four_triangles() {
    let edges = triangle_ring();
    let terminals = [1, 4, 7, 10];
    assert_eq!(brute_force(&edges, 12, &terminals), 4);
    assert_eq!(solve(&edges, 12, &terminals), 4);
}

#[test]
fn disconnected_cliques_split_for_free() {
    let mut edges = unit_clique(4);
    for &(u, v, w) in &unit_clique(4) {
        edges.push((u + 4, v + 4, w));
    }
    assert_eq!(solve(&edges, 8, &[0, 4]), 0);
}

#[test]
fn small_metis_fixture_with_saved_cut() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/small.metis");
    let mut graph = metis::read_graph(path).unwrap();
    let n = graph.num_vertices();
    assert_eq!(n, 8);

    let mut config = MulticutConfig::sequential();
    config.save_cut = true;
    let solver = MulticutSolver::new(Arc::new(config));
    let result = solver.solve(&mut graph, &[0, (n - 1) as NodeId]).unwrap();
    assert_eq!(result.value, 2);
    assert!(result.exact);

    // The two cliques are the two blocks.
    for v in 0..4 {
        assert_eq!(graph.partition_index(v), 0, "vertex {v}");
    }
    for v in 4..8 {
        assert_eq!(graph.partition_index(v), 1, "vertex {v}");
    }
}

#[test]
fn nagamochi_kameda_example() {
    // 6-vertex weighted graph from the cactus-representation paper.
    let edges = [
        (0, 1, 3),
        (0, 4, 1),
        (0, 5, 1),
        (1, 2, 1),
        (1, 3, 1),
        (2, 3, 2),
        (2, 5, 1),
        (3, 4, 1),
        (4, 5, 2),
    ];
    assert_eq!(brute_force(&edges, 6, &[0, 3]), 4);
    assert_eq!(solve(&edges, 6, &[0, 3]), 4);
}

#[test]
fn single_terminal_costs_nothing() {
    let edges = unit_clique(4);
    assert_eq!(solve(&edges, 4, &[2]), 0);
}

#[test]
fn all_vertices_terminal_cuts_everything() {
    let edges = unit_clique(4);
    assert_eq!(solve(&edges, 4, &[0, 1, 2, 3]), 6);

    let weighted = [(0, 1, 5), (1, 2, 7), (2, 0, 2)];
    assert_eq!(solve(&weighted, 3, &[0, 1, 2]), 14);
}

#[test]
fn component_without_terminal_contributes_nothing() {
    let edges = [(0, 1, 1), (1, 2, 1), (3, 4, 100), (4, 5, 100)];
    assert_eq!(solve(&edges, 6, &[0, 2]), 1);
}

#[test]
fn zero_weight_edges_act_as_non_edges() {
    let edges = [(0, 1, 0), (1, 2, 4)];
    assert_eq!(solve(&edges, 3, &[0, 1]), 0);
    assert_eq!(solve(&edges, 3, &[0, 2]), 0);
    assert_eq!(solve(&edges, 3, &[1, 2]), 4);
}

#[test]
fn three_terminals_with_steiner_vertex() {
    // Star with a heavy center spoke: brute force confirms the optimum.
    let edges = [(0, 3, 2), (1, 3, 1), (2, 3, 1), (0, 1, 1)];
    let expected = brute_force(&edges, 4, &[0, 1, 2]);
    assert_eq!(solve(&edges, 4, &[0, 1, 2]), expected);
}

#[test]
fn parallel_matches_sequential() {
    let edges = triangle_ring();
    let terminals = [1u32, 4, 7, 10];
    let mut g1 = MutableGraph::from_edges(12, &edges).unwrap();
    let mut g2 = MutableGraph::from_edges(12, &edges).unwrap();
    let sequential = sequential_solver().solve(&mut g1, &terminals).unwrap();
    let parallel = parallel_solver(4).solve(&mut g2, &terminals).unwrap();
    assert_eq!(sequential.value, parallel.value);
}

#[test]
fn repeated_runs_agree_under_one_seed() {
    let edges = triangle_ring();
    let terminals = [0u32, 3, 6, 9];
    let mut config = MulticutConfig::sequential();
    config.seed = 99;
    config.threads = 2;
    let solver = MulticutSolver::new(Arc::new(config));
    let mut first = None;
    for _ in 0..3 {
        let mut g = MutableGraph::from_edges(12, &edges).unwrap();
        let value = solver.solve(&mut g, &terminals).unwrap().value;
        assert_eq!(*first.get_or_insert(value), value);
    }
}

#[test]
fn randomized_instances_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for case in 0..25 {
        let n = rng.gen_range(4..=9);
        let mut edges = Vec::new();
        for u in 0..n as NodeId {
            for v in u + 1..n as NodeId {
                if rng.gen_bool(0.55) {
                    edges.push((u, v, rng.gen_range(0..=5)));
                }
            }
        }
        let k = rng.gen_range(2..=3.min(n));
        let mut terminals: Vec<NodeId> = (0..n as NodeId).collect();
        for i in (1..terminals.len()).rev() {
            terminals.swap(i, rng.gen_range(0..=i));
        }
        terminals.truncate(k);

        let expected = brute_force(&edges, n, &terminals);
        let mut graph = MutableGraph::from_edges(n, &edges).unwrap();
        let result = sequential_solver().solve(&mut graph, &terminals).unwrap();
        assert_eq!(
            result.value, expected,
            "case {case}: n={n} edges={edges:?} terminals={terminals:?}"
        );
    }
}

#[test]
fn saved_cut_separates_every_terminal() {
    let edges = triangle_ring();
    let terminals = [1u32, 4, 7, 10];
    let mut config = MulticutConfig::sequential();
    config.save_cut = true;
    let solver = MulticutSolver::new(Arc::new(config));
    let mut graph = MutableGraph::from_edges(12, &edges).unwrap();
    let result = solver.solve(&mut graph, &terminals).unwrap();

    // Each terminal sits in its own block, labelled by input order.
    for (index, &t) in terminals.iter().enumerate() {
        assert_eq!(graph.partition_index(t), index as u32);
    }
    // The labelling really cuts no more than the reported value.
    let cross: EdgeWeight = edges
        .iter()
        .filter(|&&(u, v, _)| graph.partition_index(u) != graph.partition_index(v))
        .map(|&(_, _, w)| w)
        .sum();
    assert!(cross <= result.value);
    assert_eq!(result.value, 4);
}

#[test]
fn queue_orderings_all_reach_the_optimum() {
    use multicut::QueueKind;
    let edges = triangle_ring();
    let terminals = [1u32, 4, 7, 10];
    for kind in [
        QueueKind::SmallGraph,
        QueueKind::BoundSum,
        QueueKind::LowerBound,
        QueueKind::UpperBound,
        QueueKind::FewTerminals,
        QueueKind::BiggerDistance,
        QueueKind::LowerDistance,
        QueueKind::MostDeleted,
    ] {
        let mut config = MulticutConfig::sequential();
        config.queue_type = kind;
        let solver = MulticutSolver::new(Arc::new(config));
        let mut graph = MutableGraph::from_edges(12, &edges).unwrap();
        let result = solver.solve(&mut graph, &terminals).unwrap();
        assert_eq!(result.value, 4, "ordering {kind:?}");
    }
}

#[test]
fn bfs_block_contraction_keeps_separated_optimum() {
    // Wide separation between terminals: small BFS blocks stay strictly
    // inside each terminal's region and the optimum is unchanged.
    let edges: Vec<_> = (0..9u32).map(|i| (i, i + 1, 1)).collect();
    let mut config = MulticutConfig::sequential();
    config.bfs_size = 3;
    let solver = MulticutSolver::new(Arc::new(config));
    let mut graph = MutableGraph::from_edges(10, &edges).unwrap();
    assert_eq!(solver.solve(&mut graph, &[0, 9]).unwrap().value, 1);
}
