//! Graph invariant checker
//!
//! Walks the whole structure and verifies the reverse-edge, weight, and
//! bookkeeping invariants. Intended for debugging runs (see
//! `MulticutConfig::verify_graph`); a failure here is a solver bug and is
//! surfaced as a fatal [`MulticutError::Invariant`].

use std::collections::HashSet;

use super::{MutableGraph, NodeId};
use crate::error::{MulticutError, Result};

/// Check every structural invariant of `g`.
pub fn validate_graph(g: &MutableGraph) -> Result<()> {
    let n = g.num_vertices() as NodeId;
    let mut half_edges = 0usize;

    for v in g.nodes() {
        for original in g.contained_vertices(v) {
            if g.current_position(original) != v {
                return Err(MulticutError::Invariant(format!(
                    "position of original vertex {original} is {} but it is contained in {v}",
                    g.current_position(original)
                )));
            }
        }

        let mut weight = 0;
        let mut targets: HashSet<NodeId> = HashSet::new();
        half_edges += g.degree(v);

        for (e, he) in g.edges_of(v).iter().enumerate() {
            weight += he.weight;

            if he.target == v {
                return Err(MulticutError::Invariant(format!(
                    "self edge at vertex {v}"
                )));
            }
            if he.target >= n {
                return Err(MulticutError::Invariant(format!(
                    "edge {e} of vertex {v} points at {} but the graph has {n} vertices",
                    he.target
                )));
            }
            if !targets.insert(he.target) {
                return Err(MulticutError::Invariant(format!(
                    "double edge from {v} to {}",
                    he.target
                )));
            }

            let rev = he.reverse;
            if rev as usize >= g.degree(he.target) {
                return Err(MulticutError::Invariant(format!(
                    "reverse index {rev} of edge {v}-{e} out of range at {}",
                    he.target
                )));
            }
            if g.edge_target(he.target, rev) != v {
                return Err(MulticutError::Invariant(format!(
                    "edge {v}-{e} is not the target of its reverse {}-{rev}",
                    he.target
                )));
            }
            if g.edge_weight(he.target, rev) != he.weight {
                return Err(MulticutError::Invariant(format!(
                    "weight of edge {v}-{e} ({}) differs from its reverse {}-{rev} ({})",
                    he.weight,
                    he.target,
                    g.edge_weight(he.target, rev)
                )));
            }
            if g.reverse_edge(he.target, rev) != e as u32 {
                return Err(MulticutError::Invariant(format!(
                    "edge {v}-{e} is not the reverse of its reverse {}-{rev}",
                    he.target
                )));
            }
        }

        if weight != g.weighted_degree(v) {
            return Err(MulticutError::Invariant(format!(
                "weighted degree of vertex {v} is {} but its edges sum to {weight}",
                g.weighted_degree(v)
            )));
        }
    }

    if half_edges != g.num_half_edges() {
        return Err(MulticutError::Invariant(format!(
            "graph reports {} half-edges but {half_edges} exist",
            g.num_half_edges()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_triangle() {
        let g = MutableGraph::from_edges(3, &[(0, 1, 1), (1, 2, 2), (2, 0, 3)]).unwrap();
        assert!(validate_graph(&g).is_ok());
    }

    #[test]
    fn test_valid_after_contraction() {
        let mut g = MutableGraph::from_edges(
            5,
            &[(0, 1, 1), (1, 2, 2), (2, 3, 3), (3, 4, 4), (4, 0, 5), (1, 3, 6)],
        )
        .unwrap();
        g.contract_edge(1, 2).unwrap();
        validate_graph(&g).unwrap();
        g.contract_vertex_set(&[0, 1]).unwrap();
        validate_graph(&g).unwrap();
    }

    #[test]
    fn test_valid_after_removal() {
        let mut g =
            MutableGraph::from_edges(4, &[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 0, 1)]).unwrap();
        g.remove_edge(1, 2).unwrap();
        validate_graph(&g).unwrap();
    }
}
