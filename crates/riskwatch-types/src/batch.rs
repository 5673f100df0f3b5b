//! Query batch state and per-window outcomes

use serde::{Deserialize, Serialize};

use crate::{TimeWindow, TypesError};

/// Lifecycle of one query batch.
///
/// `Idle -> Running -> {Completed, Cancelled}`; both terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// Created, nothing dispatched
    Idle,
    /// Windows dispatched, some outstanding
    Running,
    /// Every window finished
    Completed,
    /// Cancelled before every window finished
    Cancelled,
}

impl BatchState {
    /// Whether this is a final state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Transition `Idle -> Running`
    pub fn start(&mut self) -> Result<(), TypesError> {
        self.transition(Self::Running)
    }

    /// Transition `Running -> Completed | Cancelled`.
    ///
    /// Fails if the batch already reached a terminal state, so the terminal
    /// transition can only happen once.
    pub fn finish(&mut self, outcome: BatchState) -> Result<(), TypesError> {
        if !outcome.is_terminal() {
            return Err(TypesError::IllegalTransition {
                from: *self,
                to: outcome,
            });
        }
        self.transition(outcome)
    }

    fn transition(&mut self, to: BatchState) -> Result<(), TypesError> {
        let allowed = matches!(
            (*self, to),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Cancelled)
        );
        if !allowed {
            return Err(TypesError::IllegalTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How a single window finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum WindowOutcome {
    /// Query answered; `total` was added to the batch total
    Counted {
        /// Events reported for the window
        total: u64,
    },
    /// Query failed; nothing was added
    Failed {
        /// Failure description for display
        reason: String,
    },
    /// Batch was cancelled before the window finished
    Cancelled,
}

/// Outcome of one window, streamed while the batch runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowReport {
    /// Position of the window in the batch
    pub index: usize,
    /// The window itself
    pub window: TimeWindow,
    /// What happened to it
    pub outcome: WindowOutcome,
}

impl std::fmt::Display for WindowReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            WindowOutcome::Counted { total } => write!(f, "{} total: {total}", self.window),
            WindowOutcome::Failed { reason } => write!(f, "{} failed: {reason}", self.window),
            WindowOutcome::Cancelled => write!(f, "{} cancelled", self.window),
        }
    }
}

/// Terminal result of a batch, delivered exactly once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// `Completed` or `Cancelled`
    pub state: BatchState,
    /// Sum of every counted window
    pub total: u64,
    /// Number of windows dispatched
    pub windows: usize,
    /// Windows that contributed to the total
    pub counted: usize,
    /// Windows that failed
    pub failed: usize,
    /// Windows abandoned by cancellation
    pub cancelled: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_lifecycle() {
        let mut state = BatchState::Idle;
        state.start().unwrap();
        assert_eq!(state, BatchState::Running);
        state.finish(BatchState::Completed).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_transition_happens_once() {
        let mut state = BatchState::Idle;
        state.start().unwrap();
        state.finish(BatchState::Cancelled).unwrap();
        assert_eq!(
            state.finish(BatchState::Completed),
            Err(TypesError::IllegalTransition {
                from: BatchState::Cancelled,
                to: BatchState::Completed,
            })
        );
        assert_eq!(state, BatchState::Cancelled);
    }

    #[test]
    fn test_cannot_finish_before_start() {
        let mut state = BatchState::Idle;
        assert!(state.finish(BatchState::Completed).is_err());
        assert!(state.finish(BatchState::Running).is_err());
        assert_eq!(state, BatchState::Idle);
    }
}
