//! TAPESTRY Runtime
//!
//! Execution engine for composed runnables: the dependency graph
//! scheduler, the retry and error-notification combinators, serial and
//! parallel groups, and the `Jobs` factory that wires them from specs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod group;
pub mod jobs;
pub mod monitor;
pub mod notify;
pub mod retry;

pub use graph::{DependencyGraph, FailurePolicy, GraphItem, GraphOptions};
pub use group::{Parallel, Serial};
pub use jobs::Jobs;
pub use monitor::{ExecutionMonitor, Metrics, Transition};
pub use notify::{ErrorNotifier, PendingNotifier};
pub use retry::Retry;
