//! Error types shared by every runnable and combinator.

use crate::id::ItemId;
use crate::status::ItemStatus;
use std::fmt;

/// Result of running a unit of work
pub type RunResult<T> = Result<T, RunError>;

/// Failure of a runnable, a combinator, or a construction step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// Invalid configuration, raised at construction time
    InvalidConfig {
        /// Offending field or argument
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Graph has unreachable items, raised before any item starts
    InvalidGraph {
        /// Items whose dependency chain never resolves
        unreachable: Vec<ItemId>,
        /// `(item, dependency)` pairs naming ids absent from the graph
        missing: Vec<(ItemId, ItemId)>,
    },

    /// A leaf runnable failed
    Failed {
        /// Failure reason reported by the leaf
        reason: String,
    },

    /// A graph item failed
    ItemFailed {
        /// Id of the failing item
        id: ItemId,
        /// Underlying failure of the item's action
        source: Box<RunError>,
    },

    /// The error handler of a notifier failed while handling a failure
    HandlerFailed {
        /// Failure of the main runnable
        main: Box<RunError>,
        /// Failure of the handler itself
        handler: Box<RunError>,
    },

    /// Execution was cancelled before it finished
    Cancelled,

    /// An item status change broke the state machine
    IllegalTransition {
        /// Status before the change
        from: ItemStatus,
        /// Requested status
        to: ItemStatus,
    },
}

impl RunError {
    /// Leaf failure with the given reason
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self::Failed {
            reason: reason.to_string(),
        }
    }

    /// Configuration failure for `field`
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Follow composite failures down to the failure that started the chain.
    ///
    /// For `HandlerFailed` the main failure is the cause; the handler
    /// failure is secondary.
    #[must_use]
    pub fn root_cause(&self) -> &RunError {
        let mut current = self;
        loop {
            match current {
                Self::ItemFailed { source, .. } => current = source.as_ref(),
                Self::HandlerFailed { main, .. } => current = main.as_ref(),
                _ => return current,
            }
        }
    }

    /// Ids of the graph items on the failure chain, outermost first
    #[must_use]
    pub fn item_path(&self) -> Vec<&ItemId> {
        let mut path = Vec::new();
        let mut current = self;
        loop {
            match current {
                Self::ItemFailed { id, source } => {
                    path.push(id);
                    current = source.as_ref();
                }
                Self::HandlerFailed { main, .. } => current = main.as_ref(),
                _ => return path,
            }
        }
    }

    /// Check if this is a construction-time error
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. } | Self::InvalidGraph { .. })
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { field, reason } => {
                write!(f, "Invalid configuration for {}: {}", field, reason)
            }
            Self::InvalidGraph { unreachable, missing } => {
                write!(f, "Graph invalid: unreachable items [")?;
                for (i, id) in unreachable.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", id)?;
                }
                write!(f, "]")?;
                if !missing.is_empty() {
                    write!(f, "; missing dependencies [")?;
                    for (i, (item, dep)) in missing.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{} -> {}", item, dep)?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
            Self::Failed { reason } => write!(f, "{}", reason),
            Self::ItemFailed { id, source } => write!(f, "Item {} failed: {}", id, source),
            Self::HandlerFailed { main, handler } => {
                write!(f, "{} (error handler also failed: {})", main, handler)
            }
            Self::Cancelled => write!(f, "Execution cancelled"),
            Self::IllegalTransition { from, to } => {
                write!(f, "Illegal status transition {} -> {}", from, to)
            }
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ItemFailed { source, .. } => Some(&**source),
            Self::HandlerFailed { main, .. } => Some(&**main),
            _ => None,
        }
    }
}
