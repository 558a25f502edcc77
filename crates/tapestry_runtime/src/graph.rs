//! Dependency graph scheduler.
//!
//! Runs named, interdependent runnables to completion:
//!
//! 1. Validate reachability before anything starts. A missing dependency
//!    id or a cycle fails the run with `InvalidGraph` and no item runs.
//! 2. Start every ready item (`NotStarted`, all dependencies `Completed`).
//! 3. Wait for whichever in-flight item finishes first and record its
//!    outcome. A failure ends the run with `ItemFailed`, naming the item.
//! 4. Repeat until every item is `Completed`.
//!
//! There is no fan-out limit: everything that can run, runs. In-flight
//! items share the caller's task through a `FuturesUnordered`, so item
//! statuses have a single writer and need no locking.

use crate::monitor::ExecutionMonitor;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;
use tapestry_core::{ItemId, ItemStatus, RunError, RunId, RunResult, Runnable, SharedRunnable};
use tapestry_plan::{Dag, PlannedItem, Validator};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

/// What happens to items still in flight when one item fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Drop in-flight items; they stop at their next await point
    #[default]
    CancelInFlight,
    /// Leave in-flight items running on the tokio runtime; their outcomes
    /// are only logged and recorded on the monitor
    Detach,
}

/// Graph execution options
#[derive(Debug, Clone, Default)]
pub struct GraphOptions {
    /// Handling of in-flight siblings after a failure
    pub on_failure: FailurePolicy,
    /// External cancellation for the whole run
    pub cancel: Option<CancellationToken>,
    /// Monitor receiving item transitions
    pub monitor: Option<Arc<ExecutionMonitor>>,
    /// Size limits are checked when the options are applied to a graph,
    /// reachability before each execution
    pub validator: Validator,
}

impl GraphOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure policy
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Set the cancellation token
    #[must_use]
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Set the monitor
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<ExecutionMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Set the validator
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }
}

/// Item of a dependency graph
#[derive(Clone)]
pub struct GraphItem {
    /// Unique id within the graph
    pub id: ItemId,
    /// Work to run
    pub action: SharedRunnable,
    /// Ids that must complete before this item starts
    pub depends_on: IndexSet<ItemId>,
}

impl GraphItem {
    /// Item without dependencies
    pub fn new(id: ItemId, action: SharedRunnable) -> Self {
        Self {
            id,
            action,
            depends_on: IndexSet::new(),
        }
    }

    /// Add dependencies
    #[must_use]
    pub fn depends_on(mut self, ids: impl IntoIterator<Item = ItemId>) -> Self {
        self.depends_on.extend(ids);
        self
    }
}

impl std::fmt::Debug for GraphItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphItem")
            .field("id", &self.id)
            .field("action", &self.action.name())
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

impl From<PlannedItem<SharedRunnable>> for GraphItem {
    fn from(item: PlannedItem<SharedRunnable>) -> Self {
        Self {
            id: item.id,
            action: item.action,
            depends_on: item.depends_on,
        }
    }
}

type ItemFuture = BoxFuture<'static, (usize, RunResult<()>)>;

/// Per-run item statuses, indexed like the graph's items
///
/// Each item counts its dependencies that have not completed yet and is
/// released when the count reaches zero, so readiness is settled once per
/// edge instead of rescanning the graph.
struct RunState<'g> {
    items: &'g [GraphItem],
    statuses: Vec<ItemStatus>,
    pending: Vec<usize>,
    dependents: Vec<Vec<usize>>,
    released: Vec<usize>,
    monitor: Option<&'g ExecutionMonitor>,
}

impl<'g> RunState<'g> {
    fn new(items: &'g [GraphItem], monitor: Option<&'g ExecutionMonitor>) -> Self {
        let index: HashMap<&ItemId, usize> =
            items.iter().enumerate().map(|(i, item)| (&item.id, i)).collect();

        let mut dependents = vec![Vec::new(); items.len()];
        let mut pending = Vec::with_capacity(items.len());
        let mut released = Vec::new();
        for (i, item) in items.iter().enumerate() {
            // Validation guarantees every dependency id exists.
            for dep in &item.depends_on {
                if let Some(&j) = index.get(dep) {
                    dependents[j].push(i);
                }
            }
            pending.push(item.depends_on.len());
            if item.depends_on.is_empty() {
                released.push(i);
            }
        }

        Self {
            items,
            statuses: vec![ItemStatus::NotStarted; items.len()],
            pending,
            dependents,
            released,
            monitor,
        }
    }

    /// The only place statuses change
    fn transition(&mut self, index: usize, next: ItemStatus) -> RunResult<()> {
        self.statuses[index] = self.statuses[index].transition(next)?;
        let id = &self.items[index].id;
        debug!(item = %id, status = %next, "item transition");
        if let Some(monitor) = self.monitor {
            monitor.record_transition(id, next);
        }
        Ok(())
    }

    /// Mark `index` completed and release dependents with nothing left to wait for
    fn complete(&mut self, index: usize) -> RunResult<()> {
        self.transition(index, ItemStatus::Completed)?;
        for &dependent in &self.dependents[index] {
            self.pending[dependent] -= 1;
            if self.pending[dependent] == 0 {
                self.released.push(dependent);
            }
        }
        Ok(())
    }

    /// Items that may start now, in declaration order
    fn take_ready(&mut self) -> Vec<usize> {
        let mut ready = std::mem::take(&mut self.released);
        ready.sort_unstable();
        ready
    }

    fn not_started(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .zip(&self.statuses)
            .filter(|(_, status)| **status == ItemStatus::NotStarted)
            .map(|(item, _)| item.id.clone())
            .collect()
    }
}

/// Scheduler for a set of named, interdependent runnables
pub struct DependencyGraph {
    name: String,
    items: Vec<GraphItem>,
    dag: Dag,
    options: GraphOptions,
}

impl DependencyGraph {
    /// Create a graph from items in declaration order
    ///
    /// Dependencies are not checked here; unreachable items fail `run`.
    ///
    /// # Errors
    ///
    /// Returns error if an id appears twice
    pub fn new(items: Vec<GraphItem>) -> RunResult<Self> {
        let mut dag = Dag::new();
        for item in &items {
            dag.add_node(item.id.clone(), item.depends_on.clone())?;
        }
        Ok(Self {
            name: "graph".to_string(),
            items,
            dag,
            options: GraphOptions::default(),
        })
    }

    /// Create a graph from normalized spec items
    ///
    /// # Errors
    ///
    /// Returns error if an id appears twice
    pub fn from_planned(items: Vec<PlannedItem<SharedRunnable>>) -> RunResult<Self> {
        Self::new(items.into_iter().map(GraphItem::from).collect())
    }

    /// Set execution options
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the graph exceeds the validator's limits
    pub fn with_options(mut self, options: GraphOptions) -> RunResult<Self> {
        options.validator.check_limits(&self.dag)?;
        self.options = options;
        Ok(self)
    }

    /// Set the name used in logs
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Dependency structure
    #[must_use]
    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    /// Execution options
    #[must_use]
    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Item count
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the graph has no items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Run every item to completion
    ///
    /// # Errors
    ///
    /// Returns `InvalidGraph` before starting anything if an item is
    /// unreachable, `ItemFailed` naming the first item that failed, or
    /// `Cancelled` if the cancellation token fires
    pub async fn execute(&self) -> RunResult<()> {
        let run_id = RunId::new();
        let span = info_span!("graph_run", graph = %self.name, %run_id);
        self.drive().instrument(span).await
    }

    async fn drive(&self) -> RunResult<()> {
        let monitor = self.options.monitor.as_deref();
        if let Some(monitor) = monitor {
            monitor.record_graph_run();
        }

        // Limits were enforced by `with_options`; only reachability is left.
        if let Err(err) = self.options.validator.check(&self.dag).into_result() {
            warn!(error = %err, "graph rejected before start");
            return Err(err);
        }
        info!(items = self.items.len(), "graph started");

        let mut state = RunState::new(&self.items, monitor);
        let mut in_flight: FuturesUnordered<ItemFuture> = FuturesUnordered::new();
        let mut completed = 0;

        while completed < self.items.len() {
            for index in state.take_ready() {
                state.transition(index, ItemStatus::InProgress)?;
                let action = Arc::clone(&self.items[index].action);
                in_flight.push(async move { (index, action.run().await) }.boxed());
            }

            let next = match &self.options.cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => {
                            info!(in_flight = in_flight.len(), "graph cancelled");
                            self.cancel_in_flight(in_flight);
                            return Err(RunError::Cancelled);
                        }
                        next = in_flight.next() => next,
                    }
                }
                None => in_flight.next().await,
            };

            let Some((index, outcome)) = next else {
                // Unreachable after validation; report what was stuck.
                return Err(RunError::InvalidGraph {
                    unreachable: state.not_started(),
                    missing: Vec::new(),
                });
            };

            match outcome {
                Ok(()) => {
                    state.complete(index)?;
                    completed += 1;
                }
                Err(source) => {
                    state.transition(index, ItemStatus::Failed)?;
                    let id = self.items[index].id.clone();
                    warn!(item = %id, error = %source, "item failed, stopping graph");
                    self.settle_in_flight(in_flight);
                    return Err(RunError::ItemFailed {
                        id,
                        source: Box::new(source),
                    });
                }
            }
        }

        info!(items = completed, "graph completed");
        Ok(())
    }

    /// Apply the failure policy to the items still running
    fn settle_in_flight(&self, in_flight: FuturesUnordered<ItemFuture>) {
        match self.options.on_failure {
            FailurePolicy::CancelInFlight => self.cancel_in_flight(in_flight),
            FailurePolicy::Detach => self.detach_in_flight(in_flight),
        }
    }

    fn cancel_in_flight(&self, in_flight: FuturesUnordered<ItemFuture>) {
        let count = in_flight.len();
        if count == 0 {
            return;
        }
        debug!(count, "dropping in-flight items");
        drop(in_flight);
        if let Some(monitor) = &self.options.monitor {
            monitor.record_cancelled(count);
        }
    }

    fn detach_in_flight(&self, in_flight: FuturesUnordered<ItemFuture>) {
        let count = in_flight.len();
        if count == 0 {
            return;
        }
        debug!(count, "detaching in-flight items");
        if let Some(monitor) = &self.options.monitor {
            monitor.record_detached(count);
        }

        let ids: Arc<[ItemId]> = self.items.iter().map(|item| item.id.clone()).collect();
        for future in in_flight {
            let ids = Arc::clone(&ids);
            let monitor = self.options.monitor.clone();
            tokio::spawn(async move {
                let (index, outcome) = future.await;
                let id = &ids[index];
                let status = match &outcome {
                    Ok(()) => {
                        debug!(item = %id, "detached item completed");
                        ItemStatus::Completed
                    }
                    Err(err) => {
                        warn!(item = %id, error = %err, "detached item failed");
                        ItemStatus::Failed
                    }
                };
                if let Some(monitor) = monitor {
                    monitor.record_transition(id, status);
                }
            });
        }
    }
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("name", &self.name)
            .field("items", &self.items)
            .field("options", &self.options)
            .finish()
    }
}

#[async_trait::async_trait]
impl Runnable for DependencyGraph {
    async fn run(&self) -> RunResult<()> {
        self.execute().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tapestry_core::from_fn;

    fn id(s: &str) -> ItemId {
        ItemId::new(s).unwrap()
    }

    fn ok() -> SharedRunnable {
        from_fn("ok", || async { Ok(()) })
    }

    fn fail(reason: &'static str) -> SharedRunnable {
        from_fn("fail", move || async move { Err(RunError::failed(reason)) })
    }

    fn sleepy(ms: u64) -> SharedRunnable {
        from_fn("sleepy", move || async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(())
        })
    }

    fn counting(counter: &Arc<AtomicUsize>) -> SharedRunnable {
        let counter = Arc::clone(counter);
        from_fn("counting", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    fn item(name: &str, action: SharedRunnable, deps: &[&str]) -> GraphItem {
        GraphItem::new(id(name), action).depends_on(deps.iter().map(|d| id(d)))
    }

    fn monitored(items: Vec<GraphItem>) -> (DependencyGraph, Arc<ExecutionMonitor>) {
        let monitor = Arc::new(ExecutionMonitor::default());
        let graph = DependencyGraph::new(items)
            .unwrap()
            .with_options(GraphOptions::new().with_monitor(Arc::clone(&monitor)))
            .unwrap();
        (graph, monitor)
    }

    #[tokio::test]
    async fn test_empty_graph_succeeds() {
        let graph = DependencyGraph::new(Vec::new()).unwrap();
        assert!(graph.is_empty());
        assert!(graph.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_no_edges_all_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let items = (0..5)
            .map(|i| item(&format!("i{}", i), counting(&counter), &[]))
            .collect();
        let graph = DependencyGraph::new(items).unwrap();
        graph.run().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let result = DependencyGraph::new(vec![item("a", ok(), &[]), item("a", ok(), &[])]);
        assert!(matches!(result, Err(RunError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_dependency_completes_before_dependent_starts() {
        let (graph, monitor) = monitored(vec![
            item("item1", sleepy(5), &[]),
            item("item2", ok(), &["item1"]),
        ]);
        graph.run().await.unwrap();

        let done1 = monitor.position("item1", ItemStatus::Completed).unwrap();
        let start2 = monitor.position("item2", ItemStatus::InProgress).unwrap();
        assert!(done1 < start2);
    }

    #[tokio::test]
    async fn test_failed_dependency_blocks_dependent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (graph, monitor) = monitored(vec![
            item("item1", fail("broken"), &[]),
            item("item2", counting(&counter), &["item1"]),
        ]);

        let err = graph.run().await.unwrap_err();
        assert_eq!(
            err,
            RunError::ItemFailed {
                id: id("item1"),
                source: Box::new(RunError::failed("broken")),
            }
        );
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.last_status("item2"), None);
    }

    #[tokio::test]
    async fn test_shared_failed_dependency_blocks_all_dependents() {
        let counter = Arc::new(AtomicUsize::new(0));
        let graph = DependencyGraph::new(vec![
            item("base", fail("nope"), &[]),
            item("x", counting(&counter), &["base"]),
            item("y", counting(&counter), &["base"]),
            item("z", counting(&counter), &["x", "y"]),
        ])
        .unwrap();

        let err = graph.run().await.unwrap_err();
        assert_eq!(err.item_path(), vec![&id("base")]);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_dependency_runs_nothing() {
        let counter = Arc::new(AtomicUsize::new(0));
        let graph = DependencyGraph::new(vec![
            item("a", counting(&counter), &[]),
            item("b", counting(&counter), &["ghost"]),
        ])
        .unwrap();

        let err = graph.run().await.unwrap_err();
        assert!(matches!(err, RunError::InvalidGraph { ref missing, .. } if missing.len() == 1));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cycle_runs_nothing() {
        let counter = Arc::new(AtomicUsize::new(0));
        let graph = DependencyGraph::new(vec![
            item("free", counting(&counter), &[]),
            item("a", counting(&counter), &["b"]),
            item("b", counting(&counter), &["a"]),
        ])
        .unwrap();

        let err = graph.run().await.unwrap_err();
        match err {
            RunError::InvalidGraph { unreachable, missing } => {
                assert_eq!(unreachable, vec![id("a"), id("b")]);
                assert!(missing.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_items_run_concurrently() {
        let graph = DependencyGraph::new(vec![
            item("a", sleepy(100), &[]),
            item("b", sleepy(100), &[]),
            item("c", sleepy(100), &["a", "b"]),
        ])
        .unwrap();

        let start = tokio::time::Instant::now();
        graph.run().await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dependent_starts_without_waiting_for_unrelated() {
        // fast -> after_fast should not wait for slow.
        let (graph, monitor) = monitored(vec![
            item("slow", sleepy(500), &[]),
            item("fast", sleepy(10), &[]),
            item("after_fast", sleepy(10), &["fast"]),
        ]);
        graph.run().await.unwrap();

        let after_fast_done = monitor.position("after_fast", ItemStatus::Completed).unwrap();
        let slow_done = monitor.position("slow", ItemStatus::Completed).unwrap();
        assert!(after_fast_done < slow_done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_in_flight_drops_siblings() {
        let finished = Arc::new(AtomicUsize::new(0));
        let sibling = {
            let finished = Arc::clone(&finished);
            from_fn("sibling", move || {
                let finished = Arc::clone(&finished);
                async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };
        let (graph, monitor) = monitored(vec![
            item("sibling", sibling, &[]),
            item("bad", fail("x"), &[]),
        ]);

        assert!(graph.run().await.is_err());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.metrics().items_cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_lets_siblings_finish() {
        let monitor = Arc::new(ExecutionMonitor::default());
        let graph = DependencyGraph::new(vec![
            item("sibling", sleepy(100), &[]),
            item("bad", fail("x"), &[]),
        ])
        .unwrap()
        .with_options(
            GraphOptions::new()
                .with_failure_policy(FailurePolicy::Detach)
                .with_monitor(Arc::clone(&monitor)),
        )
        .unwrap();

        assert!(graph.run().await.is_err());
        assert_eq!(monitor.last_status("sibling"), Some(ItemStatus::InProgress));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(monitor.last_status("sibling"), Some(ItemStatus::Completed));
        assert_eq!(monitor.metrics().items_detached, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_token() {
        let token = CancellationToken::new();
        let graph = DependencyGraph::new(vec![item("long", sleepy(10_000), &[])])
            .unwrap()
            .with_options(GraphOptions::new().with_cancel(token.clone()))
            .unwrap();

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        assert_eq!(graph.run().await, Err(RunError::Cancelled));
        trigger.await.unwrap();
    }

    #[test]
    fn test_item_limit_enforced_at_construction() {
        let graph = DependencyGraph::new(vec![item("a", ok(), &[]), item("b", ok(), &[])]).unwrap();
        let limited = GraphOptions::new().with_validator(Validator::new().with_max_items(1));

        let err = graph.with_options(limited).unwrap_err();
        assert!(matches!(err, RunError::InvalidConfig { ref field, .. } if field == "items"));
    }

    #[tokio::test]
    async fn test_item_limit_within_bounds_runs() {
        let graph = DependencyGraph::new(vec![item("a", ok(), &[]), item("b", ok(), &["a"])])
            .unwrap()
            .with_options(GraphOptions::new().with_validator(Validator::new().with_max_items(2)))
            .unwrap();
        assert!(graph.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_rerun_resets_statuses() {
        let counter = Arc::new(AtomicUsize::new(0));
        let graph = DependencyGraph::new(vec![
            item("a", counting(&counter), &[]),
            item("b", counting(&counter), &["a"]),
        ])
        .unwrap();

        graph.run().await.unwrap();
        graph.run().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    proptest::proptest! {
        #[test]
        fn prop_dependencies_complete_before_start(
            n in 1usize..20,
            edges in proptest::collection::vec((0usize..20, 0usize..20), 0..60),
        ) {
            let mut deps: Vec<Vec<String>> = vec![Vec::new(); n];
            for (a, b) in edges {
                let (a, b) = (a % n, b % n);
                if a > b {
                    deps[a].push(format!("i{}", b));
                }
            }
            let items = deps
                .iter()
                .enumerate()
                .map(|(i, d)| {
                    let d: Vec<&str> = d.iter().map(String::as_str).collect();
                    item(&format!("i{}", i), sleepy(((i * 7) % 5) as u64), &d)
                })
                .collect();
            let (graph, monitor) = monitored(items);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            runtime.block_on(graph.run()).unwrap();

            proptest::prop_assert_eq!(monitor.metrics().items_completed, n as u64);
            for (i, d) in deps.iter().enumerate() {
                let start = monitor.position(&format!("i{}", i), ItemStatus::InProgress).unwrap();
                for dep in d {
                    let done = monitor.position(dep, ItemStatus::Completed).unwrap();
                    proptest::prop_assert!(done < start);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_nested_graph() {
        let inner = DependencyGraph::new(vec![item("leaf", fail("deep"), &[])])
            .unwrap()
            .with_name("inner");
        let outer = DependencyGraph::new(vec![item("child", Arc::new(inner), &[])]).unwrap();

        let err = outer.run().await.unwrap_err();
        assert_eq!(err.item_path(), vec![&id("child"), &id("leaf")]);
        assert_eq!(err.root_cause(), &RunError::failed("deep"));
    }
}
