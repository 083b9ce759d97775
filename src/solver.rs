//! Top-level driver
//!
//! Validates the input, splits it into connected components, runs the
//! branch-and-bound engine on every component holding at least two
//! terminals, and sums the per-component optima. With `save_cut` set the
//! winning block labels are written back into the input graph's
//! partition indices.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::branch::{self, SolveStats};
use crate::config::MulticutConfig;
use crate::error::{MulticutError, Result};
use crate::graph::{EdgeWeight, MutableGraph, NodeId};
use crate::problem::UNBOUNDED_CUT;
use crate::reduce;

/// Result of a multi-terminal cut solve.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MulticutResult {
    /// Total weight of the best multiway cut found
    pub value: EdgeWeight,
    /// False when cancellation or queue shedding may have cost optimality
    pub exact: bool,
    /// Aggregated search counters over all components
    pub stats: SolveStats,
}

/// Multi-terminal minimum cut solver.
///
/// The solver is cheap to construct and holds only the configuration and
/// a cancellation flag; each [`solve`](Self::solve) call runs its own
/// worker pool to quiescence.
pub struct MulticutSolver {
    config: Arc<MulticutConfig>,
    cancel: Arc<AtomicBool>,
}

impl MulticutSolver {
    /// Create a solver with the given configuration.
    pub fn new(config: Arc<MulticutConfig>) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancellation flag; set it to make running workers drain their
    /// queues and return the best cut found so far, flagged approximate.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Compute the minimum multiway cut of `graph` for `terminals`.
    ///
    /// Terminal `i` of the input list defines block `i`; with `save_cut`
    /// set, every vertex's block is written to its partition index.
    pub fn solve(&self, graph: &mut MutableGraph, terminals: &[NodeId]) -> Result<MulticutResult> {
        let n = graph.num_vertices();
        if self.config.threads == 0 {
            return Err(MulticutError::InvalidInput(
                "worker pool needs at least one thread".into(),
            ));
        }
        if terminals.is_empty() {
            return Err(MulticutError::InvalidInput(
                "at least one terminal is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        for &t in terminals {
            if (t as usize) >= n {
                return Err(MulticutError::TerminalOutOfRange(t, n));
            }
            if !seen.insert(t) {
                return Err(MulticutError::DuplicateTerminal(t));
            }
        }

        // A single terminal has nothing to be separated from.
        if terminals.len() == 1 {
            if self.config.save_cut {
                for v in 0..n as NodeId {
                    graph.set_partition_index(v, 0);
                }
            }
            return Ok(MulticutResult {
                value: 0,
                exact: true,
                stats: SolveStats::default(),
            });
        }

        let split = reduce::split_connected_components(graph, terminals)?;
        info!(
            vertices = n,
            terminals = terminals.len(),
            components = split.problems.len(),
            "starting multiterminal cut search"
        );

        let mut labels: Vec<u32> = vec![0; n];
        for (v, block) in split.trivial_blocks.iter().enumerate() {
            if let Some(block) = block {
                labels[v] = *block;
            }
        }

        let mut total = 0;
        let mut exact = true;
        let mut stats = SolveStats::default();
        for component in split.problems {
            let mut problem = component.problem;
            reduce::contract_isolating_blocks(&mut problem, self.config.bfs_size)?;
            let outcome =
                branch::solve_component(problem, &self.config, Arc::clone(&self.cancel))?;
            if outcome.value == UNBOUNDED_CUT {
                // Cancelled before this component produced any cut.
                return Err(MulticutError::Cancelled);
            }
            total += outcome.value;
            exact &= outcome.exact;
            stats.problems += outcome.stats.problems;
            stats.branches += outcome.stats.branches;
            stats.prunes += outcome.stats.prunes;
            stats.leaves += outcome.stats.leaves;

            if self.config.save_cut {
                for (local, &driver) in component.reverse_map.iter().enumerate() {
                    labels[driver as usize] = outcome.labels[local];
                }
            }
        }

        if self.config.save_cut {
            for v in 0..n as NodeId {
                graph.set_partition_index(v, labels[v as usize]);
            }
        }
        if self.cancel.load(Ordering::SeqCst) {
            exact = false;
        }
        info!(value = total, exact, "multiterminal cut finished");
        Ok(MulticutResult {
            value: total,
            exact,
            stats,
        })
    }
}
