//! Subproblem records for the branch-and-bound search
//!
//! A [`MulticutProblem`] describes one node of the search tree: a graph,
//! the terminals still to be separated, the mapping chain back to the
//! original identifier space, and the bound bookkeeping. The record is
//! immutable by convention once it enters the scheduler; the engine
//! builds fully-formed children before pushing them.

use std::sync::Arc;

use crate::graph::{EdgeWeight, MutableGraph, NodeId};

/// Sentinel for an upper bound that has not been computed yet
pub const UNBOUNDED_CUT: EdgeWeight = EdgeWeight::MAX;

/// A terminal of a subproblem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    /// Current vertex holding this terminal
    pub position: NodeId,
    /// Vertex id in the subproblem's original (pre-contraction)
    /// identifier space; `position` can always be re-resolved as
    /// `graph.current_position(original_id)`
    pub original_id: NodeId,
    /// Block label assigned by the driver (stable across the search)
    pub block: u32,
    /// Set when a previously computed max-flow involving this terminal is
    /// stale because the graph changed
    pub invalid_flow: bool,
}

impl Terminal {
    /// New terminal with stale-flow marking, as freshly created terminals
    /// have no flow computed yet.
    pub fn new(position: NodeId, original_id: NodeId, block: u32) -> Self {
        Self {
            position,
            original_id,
            block,
            invalid_flow: true,
        }
    }
}

/// One node of the branch-and-bound tree.
#[derive(Debug, Clone)]
pub struct MulticutProblem {
    /// Working graph; owned by whichever worker holds the problem
    pub graph: MutableGraph,
    /// Terminals still to be separated
    pub terminals: Vec<Terminal>,
    /// Ordered coarsening maps from the driver's identifier space down to
    /// this problem's original identifier space
    pub mappings: Vec<Arc<Vec<NodeId>>>,
    /// Lower bound on the total cut reachable through this branch,
    /// including `deleted_weight`
    pub lower_bound: EdgeWeight,
    /// Upper bound on the total cut reachable through this branch,
    /// including `deleted_weight`
    pub upper_bound: EdgeWeight,
    /// Weight of edges already committed as cut on the way here
    pub deleted_weight: EdgeWeight,
    /// Breadcrumb describing the branch decisions taken
    pub path: String,
    /// Block labels already decided for original vertices whose terminal
    /// has been fully separated; indexed by original identifier
    pub resolved: Vec<Option<u32>>,
}

impl MulticutProblem {
    /// Root problem over `graph` with the given terminals.
    pub fn new(graph: MutableGraph, terminals: Vec<Terminal>) -> Self {
        let original_n = graph.original_n();
        Self {
            graph,
            terminals,
            mappings: Vec::new(),
            lower_bound: 0,
            upper_bound: UNBOUNDED_CUT,
            deleted_weight: 0,
            path: String::new(),
            resolved: vec![None; original_n],
        }
    }

    /// Translate an identifier from the driver's space through the
    /// mapping chain into this problem's original identifier space.
    pub fn mapped(&self, id: NodeId) -> NodeId {
        let mut current = id;
        for map in &self.mappings {
            current = map[current as usize];
        }
        current
    }

    /// Current vertex holding driver-space identifier `id`.
    pub fn current_vertex(&self, id: NodeId) -> NodeId {
        self.graph.current_position(self.mapped(id))
    }

    /// Positions of all terminals, in terminal order.
    pub fn terminal_positions(&self) -> Vec<NodeId> {
        self.terminals.iter().map(|t| t.position).collect()
    }

    /// Re-resolve every terminal position after a contraction and mark
    /// the flows stale.
    pub fn refresh_terminal_positions(&mut self) {
        let Self {
            graph, terminals, ..
        } = self;
        for t in terminals.iter_mut() {
            let position = graph.current_position(t.original_id);
            if position != t.position {
                t.position = position;
                t.invalid_flow = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_problem_defaults() {
        let g = MutableGraph::from_edges(3, &[(0, 1, 1), (1, 2, 1)]).unwrap();
        let p = MulticutProblem::new(g, vec![Terminal::new(0, 0, 0), Terminal::new(2, 2, 1)]);
        assert_eq!(p.lower_bound, 0);
        assert_eq!(p.upper_bound, UNBOUNDED_CUT);
        assert_eq!(p.deleted_weight, 0);
        assert!(p.path.is_empty());
        assert!(p.terminals[0].invalid_flow);
        assert_eq!(p.resolved.len(), 3);
    }

    #[test]
    fn test_mapped_composes_left_to_right() {
        let g = MutableGraph::new(2);
        let mut p = MulticutProblem::new(g, Vec::new());
        p.mappings = vec![
            Arc::new(vec![2, 0, 1, 3]), // driver space -> intermediate
            Arc::new(vec![1, 0, 3, 2]), // intermediate -> original
        ];
        assert_eq!(p.mapped(0), 3);
        assert_eq!(p.mapped(1), 1);
        assert_eq!(p.mapped(2), 0);
        assert_eq!(p.mapped(3), 2);
    }

    #[test]
    fn test_refresh_terminal_positions() {
        let g = MutableGraph::from_edges(4, &[(0, 1, 1), (1, 2, 1), (2, 3, 1)]).unwrap();
        let mut p =
            MulticutProblem::new(g, vec![Terminal::new(0, 0, 0), Terminal::new(3, 3, 1)]);
        p.terminals[0].invalid_flow = false;
        p.terminals[1].invalid_flow = false;

        p.graph.contract_edge(0, 1).unwrap();
        p.refresh_terminal_positions();
        // Terminal 0 still sits at vertex 0; terminal 3 moved when the
        // last vertex slot was recycled.
        assert_eq!(p.terminals[0].position, 0);
        assert!(!p.terminals[0].invalid_flow);
        assert_eq!(p.terminals[1].position, p.graph.current_position(3));
        assert!(p.terminals[1].invalid_flow);
    }

    #[test]
    fn test_clone_shares_mappings() {
        let g = MutableGraph::new(3);
        let mut p = MulticutProblem::new(g, Vec::new());
        p.mappings = vec![Arc::new(vec![0, 1, 2])];
        let q = p.clone();
        assert!(Arc::ptr_eq(&p.mappings[0], &q.mappings[0]));
    }
}
