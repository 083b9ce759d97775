//! Solver configuration
//!
//! A [`MulticutConfig`] is built once by the caller and passed into the
//! solver by handle; there is no global configuration state.

use serde::{Deserialize, Serialize};

/// Ordering used by the per-thread problem queues.
///
/// Each variant is a strict weak ordering over pending subproblems; the
/// queue always pops the highest-priority problem first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    /// Fewer vertices first
    SmallGraph,
    /// Smaller upper + lower bound sum first
    BoundSum,
    /// Smaller lower bound first, ties by smaller upper bound
    #[default]
    LowerBound,
    /// Smaller upper bound first, ties by smaller lower bound
    UpperBound,
    /// Fewer terminals first, ties by the `LowerBound` rule
    FewTerminals,
    /// Larger upper − lower gap first
    BiggerDistance,
    /// Smaller upper − lower gap first
    LowerDistance,
    /// Larger already-deleted weight first
    MostDeleted,
}

impl QueueKind {
    /// Resolve a queue ordering from its configuration name.
    ///
    /// Unrecognized names fall back to [`QueueKind::LowerBound`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "small_graph" => QueueKind::SmallGraph,
            "bound_sum" => QueueKind::BoundSum,
            "lower_bound" => QueueKind::LowerBound,
            "upper_bound" => QueueKind::UpperBound,
            "few_terminals" => QueueKind::FewTerminals,
            "bigger_distance" => QueueKind::BiggerDistance,
            "lower_distance" => QueueKind::LowerDistance,
            "most_deleted" => QueueKind::MostDeleted,
            _ => QueueKind::LowerBound,
        }
    }
}

/// Configuration for a multi-terminal cut solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MulticutConfig {
    /// Worker pool size (>= 1)
    pub threads: usize,
    /// Scheduler ordering
    pub queue_type: QueueKind,
    /// Isolating-block BFS radius in vertices; 0 disables the reduction
    pub bfs_size: usize,
    /// Retain the block labelling of the best cut on the input graph
    pub save_cut: bool,
    /// Seed for randomized tie-breaks in the max-flow oracle
    pub seed: u64,
    /// Per-worker heap capacity; overfull heaps shed their worst entries
    /// and mark the result approximate
    pub queue_capacity: usize,
    /// Run the graph invariant checker on every subproblem (debugging)
    pub verify_graph: bool,
}

impl Default for MulticutConfig {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1),
            queue_type: QueueKind::default(),
            bfs_size: 0,
            save_cut: false,
            seed: 42,
            queue_capacity: 1 << 20,
            verify_graph: false,
        }
    }
}

impl MulticutConfig {
    /// Single-threaded configuration, useful for deterministic testing.
    pub fn sequential() -> Self {
        Self {
            threads: 1,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = MulticutConfig::default();
        assert!(cfg.threads >= 1);
        assert_eq!(cfg.queue_type, QueueKind::LowerBound);
        assert_eq!(cfg.bfs_size, 0);
        assert!(!cfg.save_cut);
        assert_eq!(cfg.seed, 42);
        assert!(!cfg.verify_graph);
    }

    #[test]
    fn test_queue_kind_names() {
        assert_eq!(QueueKind::from_name("small_graph"), QueueKind::SmallGraph);
        assert_eq!(QueueKind::from_name("bound_sum"), QueueKind::BoundSum);
        assert_eq!(QueueKind::from_name("lower_bound"), QueueKind::LowerBound);
        assert_eq!(QueueKind::from_name("upper_bound"), QueueKind::UpperBound);
        assert_eq!(
            QueueKind::from_name("few_terminals"),
            QueueKind::FewTerminals
        );
        assert_eq!(
            QueueKind::from_name("bigger_distance"),
            QueueKind::BiggerDistance
        );
        assert_eq!(
            QueueKind::from_name("lower_distance"),
            QueueKind::LowerDistance
        );
        assert_eq!(QueueKind::from_name("most_deleted"), QueueKind::MostDeleted);
    }

    #[test]
    fn test_unknown_queue_kind_falls_back() {
        assert_eq!(QueueKind::from_name("fifo"), QueueKind::LowerBound);
        assert_eq!(QueueKind::from_name(""), QueueKind::LowerBound);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let cfg = MulticutConfig {
            threads: 4,
            queue_type: QueueKind::BoundSum,
            bfs_size: 25,
            save_cut: true,
            seed: 99,
            queue_capacity: 1024,
            verify_graph: true,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"bound_sum\""));
        let restored: MulticutConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.threads, 4);
        assert_eq!(restored.queue_type, QueueKind::BoundSum);
        assert_eq!(restored.bfs_size, 25);
        assert!(restored.save_cut);
        assert_eq!(restored.seed, 99);
    }
}
