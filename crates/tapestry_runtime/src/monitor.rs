//! Execution monitor for metrics and item transitions.
//!
//! One monitor can be shared by a graph and the combinators inside it; it
//! counts what happened and keeps a bounded history of item transitions in
//! the order they were observed.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tapestry_core::{ItemId, ItemStatus};

/// Execution metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    /// Graph runs started
    pub graph_runs: u64,
    /// Items moved to `InProgress`
    pub items_started: u64,
    /// Items moved to `Completed`
    pub items_completed: u64,
    /// Items moved to `Failed`
    pub items_failed: u64,
    /// In-flight items dropped after a failure or cancellation
    pub items_cancelled: u64,
    /// In-flight items left running in the background after a failure
    pub items_detached: u64,
    /// Attempts re-run by a retry combinator
    pub retries: u64,
    /// Error handlers invoked by a notifier
    pub handler_runs: u64,
}

impl Metrics {
    /// Create new metrics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get success rate of finished items (0.0 - 1.0)
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let finished = self.items_completed + self.items_failed;
        if finished == 0 {
            return 1.0;
        }
        self.items_completed as f64 / finished as f64
    }
}

/// One observed item transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Item that moved
    pub id: ItemId,
    /// State it moved into
    pub status: ItemStatus,
    /// Time since the monitor was created
    pub at: Duration,
}

#[derive(Debug)]
struct MonitorState {
    metrics: Metrics,
    history: VecDeque<Transition>,
}

/// Shared execution monitor
#[derive(Debug)]
pub struct ExecutionMonitor {
    state: Mutex<MonitorState>,
    start_time: std::time::Instant,
    max_history: usize,
}

impl ExecutionMonitor {
    /// Create a new monitor keeping at most `max_history` transitions
    #[must_use]
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Mutex::new(MonitorState {
                metrics: Metrics::new(),
                history: VecDeque::with_capacity(max_history.min(1024)),
            }),
            start_time: std::time::Instant::now(),
            max_history,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        // Counters stay meaningful even if a panicking thread held the lock.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an item transition
    pub fn record_transition(&self, id: &ItemId, status: ItemStatus) {
        let at = self.start_time.elapsed();
        let mut state = self.lock();
        match status {
            ItemStatus::InProgress => state.metrics.items_started += 1,
            ItemStatus::Completed => state.metrics.items_completed += 1,
            ItemStatus::Failed => state.metrics.items_failed += 1,
            ItemStatus::NotStarted => {}
        }
        if state.history.len() == self.max_history {
            state.history.pop_front();
        }
        if self.max_history > 0 {
            state.history.push_back(Transition {
                id: id.clone(),
                status,
                at,
            });
        }
    }

    /// Record the start of a graph run
    pub fn record_graph_run(&self) {
        self.lock().metrics.graph_runs += 1;
    }

    /// Record in-flight items dropped by the scheduler
    pub fn record_cancelled(&self, count: usize) {
        self.lock().metrics.items_cancelled += count as u64;
    }

    /// Record in-flight items left running in the background
    pub fn record_detached(&self, count: usize) {
        self.lock().metrics.items_detached += count as u64;
    }

    /// Record a retried attempt
    pub fn record_retry(&self) {
        self.lock().metrics.retries += 1;
    }

    /// Record an error handler invocation
    pub fn record_handler_run(&self) {
        self.lock().metrics.handler_runs += 1;
    }

    /// Snapshot of the current metrics
    #[must_use]
    pub fn metrics(&self) -> Metrics {
        self.lock().metrics.clone()
    }

    /// Snapshot of the transition history, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<Transition> {
        self.lock().history.iter().cloned().collect()
    }

    /// Position of the first transition of `id` into `status`
    #[must_use]
    pub fn position(&self, id: &str, status: ItemStatus) -> Option<usize> {
        self.lock()
            .history
            .iter()
            .position(|t| t.id.as_str() == id && t.status == status)
    }

    /// Current status of `id` as last observed
    #[must_use]
    pub fn last_status(&self, id: &str) -> Option<ItemStatus> {
        self.lock()
            .history
            .iter()
            .rev()
            .find(|t| t.id.as_str() == id)
            .map(|t| t.status)
    }
}

impl Default for ExecutionMonitor {
    fn default() -> Self {
        Self::new(1000)
    }
}
