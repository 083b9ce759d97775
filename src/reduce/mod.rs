//! Graph reductions
//!
//! Two reductions run before the branch-and-bound search proper:
//!
//! - **Connected-component split**: components holding at least two
//!   terminals become independent subproblems over a fresh dense
//!   identifier space; components with at most one terminal contribute
//!   nothing to the cut and are resolved on the spot.
//! - **Isolating-block contraction**: a bounded BFS around each terminal
//!   claims a block of vertices (first terminal to reach a vertex wins)
//!   which is then contracted into the terminal, shrinking the branching
//!   graph.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::graph::{MutableGraph, NodeId};
use crate::problem::{MulticutProblem, Terminal};

/// Sentinel for identifiers outside an extracted component
pub const UNMAPPED: NodeId = NodeId::MAX;

/// One extracted component that still needs solving.
pub struct ComponentProblem {
    /// The subproblem over the component's dense identifier space
    pub problem: MulticutProblem,
    /// Component-local original id -> driver-space id
    pub reverse_map: Vec<NodeId>,
}

/// Result of splitting the input into connected components.
pub struct SplitResult {
    /// Components with at least two terminals, one subproblem each
    pub problems: Vec<ComponentProblem>,
    /// Block labels for driver-space vertices whose component was solved
    /// trivially (at most one terminal); `None` for vertices handed to a
    /// subproblem
    pub trivial_blocks: Vec<Option<u32>>,
}

/// Split `g` into connected components, extracting one subproblem per
/// component with at least two terminals. Terminal `i` of the input list
/// carries block label `i`.
pub fn split_connected_components(g: &MutableGraph, terminals: &[NodeId]) -> Result<SplitResult> {
    let n = g.num_vertices();
    let (component, num_components) = g.connected_components();

    let mut terminals_per_component = vec![0usize; num_components];
    for &t in terminals {
        terminals_per_component[component[t as usize] as usize] += 1;
    }

    // Map each trivially-solved vertex to the block of its component's
    // lone terminal, or block 0 for terminal-free components.
    let mut component_block = vec![0u32; num_components];
    for (block, &t) in terminals.iter().enumerate() {
        let c = component[t as usize] as usize;
        if terminals_per_component[c] == 1 {
            component_block[c] = block as u32;
        }
    }

    let mut problems = Vec::new();
    let mut trivial_blocks = vec![None; n];

    for c in 0..num_components {
        if terminals_per_component[c] < 2 {
            for v in 0..n {
                if component[v] as usize == c {
                    trivial_blocks[v] = Some(component_block[c]);
                }
            }
            continue;
        }

        // Dense local identifiers in ascending driver-id order.
        let mut mapping = vec![UNMAPPED; n];
        let mut reverse_map = Vec::new();
        for v in 0..n {
            if component[v] as usize == c {
                mapping[v] = reverse_map.len() as NodeId;
                reverse_map.push(v as NodeId);
            }
        }

        let mut subgraph = MutableGraph::new(reverse_map.len());
        for &v in &reverse_map {
            for he in g.edges_of(v) {
                if v < he.target {
                    subgraph.new_edge(mapping[v as usize], mapping[he.target as usize], he.weight)?;
                }
            }
        }

        let component_terminals: Vec<Terminal> = terminals
            .iter()
            .enumerate()
            .filter(|&(_, &t)| component[t as usize] as usize == c)
            .map(|(block, &t)| {
                let local = mapping[t as usize];
                Terminal::new(local, local, block as u32)
            })
            .collect();

        debug!(
            component = c,
            vertices = reverse_map.len(),
            terminals = component_terminals.len(),
            "extracted component subproblem"
        );

        let mut problem = MulticutProblem::new(subgraph, component_terminals);
        problem.mappings = vec![Arc::new(mapping)];
        problems.push(ComponentProblem {
            problem,
            reverse_map,
        });
    }

    Ok(SplitResult {
        problems,
        trivial_blocks,
    })
}

/// Contract a BFS block of up to `bfs_size` vertices around each terminal
/// into that terminal. Vertices are claimed by the first BFS that reaches
/// them, in terminal input order. Afterwards every partition index is
/// reset and terminal `i`'s vertex is tagged with index `i`.
pub fn contract_isolating_blocks(problem: &mut MulticutProblem, bfs_size: usize) -> Result<()> {
    if bfs_size == 0 {
        return Ok(());
    }

    let graph = &problem.graph;
    let mut claimed = vec![false; graph.num_vertices()];
    for t in &problem.terminals {
        claimed[t.position as usize] = true;
    }

    // Blocks are collected as original identifiers so they survive the
    // slot recycling done by earlier contractions.
    let mut blocks: Vec<Vec<NodeId>> = Vec::new();
    for t in &problem.terminals {
        let mut block = vec![original_of(graph, t.position)];
        let mut size = 1usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(t.position);

        'bfs: while size < bfs_size {
            let Some(v) = queue.pop_front() else {
                break;
            };
            for he in graph.edges_of(v) {
                if !claimed[he.target as usize] {
                    claimed[he.target as usize] = true;
                    queue.push_back(he.target);
                    block.push(original_of(graph, he.target));
                    size += 1;
                    if size >= bfs_size {
                        break 'bfs;
                    }
                }
            }
        }
        blocks.push(block);
    }

    for block in &blocks {
        if block.len() < 2 {
            continue;
        }
        let members: Vec<NodeId> = block
            .iter()
            .map(|&orig| problem.graph.current_position(orig))
            .collect();
        problem.graph.contract_vertex_set(&members)?;
    }

    for v in 0..problem.graph.num_vertices() as NodeId {
        problem.graph.set_partition_index(v, 0);
    }
    problem.refresh_terminal_positions();
    for (index, t) in problem.terminals.iter().enumerate() {
        problem.graph.set_partition_index(t.position, index as u32);
    }
    Ok(())
}

/// Any original identifier held by `v`, used as a stable handle for it.
fn original_of(graph: &MutableGraph, v: NodeId) -> NodeId {
    graph
        .contained_vertices(v)
        .iter()
        .next()
        .expect("every vertex contains at least one original id")
}
