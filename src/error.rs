//! Error types for the multi-terminal cut solver

use thiserror::Error;

/// Result type for multicut operations
pub type Result<T> = std::result::Result<T, MulticutError>;

/// Errors that can occur while building graphs or running the solver
#[derive(Error, Debug)]
pub enum MulticutError {
    /// Vertex identifier outside the current graph
    #[error("Invalid vertex ID: {0}")]
    InvalidVertex(u32),

    /// Self-loops are rejected at construction
    #[error("Self loop on vertex {0}")]
    SelfLoop(u32),

    /// Edge already exists (parallel edges must be merged, not inserted)
    #[error("Edge already exists: ({0}, {1})")]
    EdgeExists(u32, u32),

    /// Edge not found
    #[error("Edge not found: ({0}, {1})")]
    EdgeNotFound(u32, u32),

    /// Terminal identifier outside the graph
    #[error("Terminal {0} out of range for graph with {1} vertices")]
    TerminalOutOfRange(u32, usize),

    /// The same vertex was named as a terminal twice
    #[error("Duplicate terminal: {0}")]
    DuplicateTerminal(u32),

    /// Malformed caller input (graph file, terminal list, configuration)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal graph invariant does not hold; this is a bug, not a
    /// recoverable condition
    #[error("Graph invariant violated: {0}")]
    Invariant(String),

    /// The run was cancelled via the cancellation flag
    #[error("Solve cancelled")]
    Cancelled,

    /// I/O error while reading a graph file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MulticutError {
    /// True for errors that indicate a bug in the solver rather than bad
    /// caller input. These are fatal; callers should not retry.
    pub fn is_invariant_breach(&self) -> bool {
        matches!(self, MulticutError::Invariant(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MulticutError::InvalidVertex(42);
        assert_eq!(err.to_string(), "Invalid vertex ID: 42");

        let err = MulticutError::EdgeExists(1, 2);
        assert_eq!(err.to_string(), "Edge already exists: (1, 2)");

        let err = MulticutError::TerminalOutOfRange(9, 4);
        assert_eq!(
            err.to_string(),
            "Terminal 9 out of range for graph with 4 vertices"
        );
    }

    #[test]
    fn test_invariant_breach() {
        assert!(MulticutError::Invariant("reverse edge mismatch".into()).is_invariant_breach());
        assert!(!MulticutError::SelfLoop(3).is_invariant_breach());
        assert!(!MulticutError::Cancelled.is_invariant_breach());
    }
}
