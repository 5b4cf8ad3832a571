//! Execution state and row limits.

/// Execution state of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionState {
    /// Not executed yet, or reset
    #[default]
    Initialized,
    /// An execution step is in flight
    Executing,
    /// A row limit stopped execution with more rows available
    Paused,
    /// Fully executed
    Done,
}

impl ExecutionState {
    /// Returns true when no execution step is in flight.
    pub fn is_quiescent(&self) -> bool {
        !matches!(self, ExecutionState::Executing)
    }
}

/// Cap on rows retrieved per execution step.
///
/// `Unlimited` is a sentinel distinct from `Rows(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowLimit {
    /// No cap; a single step retrieves everything.
    #[default]
    Unlimited,
    /// At most this many rows per step.
    Rows(u64),
}

impl RowLimit {
    /// Returns true for the unlimited sentinel.
    pub fn is_unlimited(&self) -> bool {
        matches!(self, RowLimit::Unlimited)
    }

    /// The per-step row cap, or `None` when unlimited.
    pub fn max_rows(&self) -> Option<u64> {
        match self {
            RowLimit::Unlimited => None,
            RowLimit::Rows(n) => Some(*n),
        }
    }
}
