//! Graph item state machine.
//!
//! `NotStarted -> InProgress -> {Completed | Failed}`. Terminal states never
//! transition again; every status change goes through [`ItemStatus::transition`].

use crate::error::{RunError, RunResult};
use serde::{Deserialize, Serialize};

/// Execution status of a graph item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Waiting for dependencies or for the scheduler to pick it up
    #[default]
    NotStarted,
    /// Action is running
    InProgress,
    /// Action succeeded
    Completed,
    /// Action failed
    Failed,
}

impl ItemStatus {
    /// Move to `next`, enforcing the state machine
    ///
    /// # Errors
    ///
    /// Returns `IllegalTransition` for any transition other than
    /// `NotStarted -> InProgress` or `InProgress -> Completed | Failed`
    pub fn transition(self, next: ItemStatus) -> RunResult<ItemStatus> {
        match (self, next) {
            (Self::NotStarted, Self::InProgress)
            | (Self::InProgress, Self::Completed)
            | (Self::InProgress, Self::Failed) => Ok(next),
            (from, to) => Err(RunError::IllegalTransition { from, to }),
        }
    }

    /// Check if no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
