//! # Multicut
//!
//! Parallel branch-and-bound solver for multi-terminal minimum cuts on
//! undirected graphs with non-negative integer edge weights: given
//! terminals `T`, find the minimum total edge weight whose removal
//! leaves every terminal in its own connected component.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use multicut::{MulticutConfig, MulticutSolver, MutableGraph};
//!
//! // A unit-weight K4; separating two terminals costs 3.
//! let mut graph = MutableGraph::from_edges(
//!     4,
//!     &[(0, 1, 1), (0, 2, 1), (0, 3, 1), (1, 2, 1), (1, 3, 1), (2, 3, 1)],
//! )
//! .unwrap();
//!
//! let solver = MulticutSolver::new(Arc::new(MulticutConfig::sequential()));
//! let result = solver.solve(&mut graph, &[0, 1]).unwrap();
//! assert_eq!(result.value, 3);
//! assert!(result.exact);
//! ```
//!
//! ## Architecture
//!
//! - [`graph`]: mutable contractible graph with reverse-edge tracking
//! - [`metis`]: METIS-style graph reader
//! - [`flow`]: max-flow oracle (s-t cuts, isolating cuts, star flows)
//! - [`reduce`]: connected-component split and isolating-block contraction
//! - [`problem`]: subproblem records of the search tree
//! - [`queue`]: per-thread priority scheduler with load-aware placement
//! - [`branch`]: branch-and-bound engine over the scheduler
//! - [`solver`]: top-level driver summing per-component optima
//!
//! ## Recovering the partition
//!
//! With [`MulticutConfig::save_cut`] set, the winning block of every
//! vertex (index of its terminal in the input list) is written to the
//! graph's partition indices:
//!
//! ```rust
//! use std::sync::Arc;
//! use multicut::{MulticutConfig, MulticutSolver, MutableGraph};
//!
//! let mut graph =
//!     MutableGraph::from_edges(3, &[(0, 1, 3), (1, 2, 1)]).unwrap();
//! let mut config = MulticutConfig::sequential();
//! config.save_cut = true;
//! let solver = MulticutSolver::new(Arc::new(config));
//!
//! let result = solver.solve(&mut graph, &[0, 2]).unwrap();
//! assert_eq!(result.value, 1);
//! assert_eq!(graph.partition_index(2), 1);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod branch;
pub mod config;
pub mod error;
pub mod flow;
pub mod graph;
pub mod metis;
pub mod problem;
pub mod queue;
pub mod reduce;
pub mod solver;

pub use branch::SolveStats;
pub use config::{MulticutConfig, QueueKind};
pub use error::{MulticutError, Result};
pub use flow::{FlowNetwork, IsolatingBound, IsolatingCut, StCut};
pub use graph::{EdgeId, EdgeWeight, GraphStats, HalfEdge, MutableGraph, NodeId};
pub use problem::{MulticutProblem, Terminal, UNBOUNDED_CUT};
pub use queue::PerThreadProblemQueue;
pub use solver::{MulticutResult, MulticutSolver};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Prelude module with the commonly used types
pub mod prelude {
    //! Import everything needed for a typical solve.

    pub use crate::{
        EdgeWeight, MulticutConfig, MulticutError, MulticutResult, MulticutSolver, MutableGraph,
        NodeId, QueueKind, Result,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_version_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "multicut");
    }

    #[test]
    fn test_prelude_workflow() {
        use crate::prelude::*;

        let mut graph = MutableGraph::from_edges(3, &[(0, 1, 2), (1, 2, 2)]).unwrap();
        let solver = MulticutSolver::new(Arc::new(MulticutConfig::sequential()));
        let result = solver.solve(&mut graph, &[0, 2]).unwrap();
        assert_eq!(result.value, 2);
        assert!(result.exact);
    }
}
