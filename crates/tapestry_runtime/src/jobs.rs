//! Job-construction factory.
//!
//! Thin wiring over the combinators: every constructor here returns a
//! runnable built from caller-supplied parts and adds no behavior of its
//! own.

use crate::graph::{DependencyGraph, GraphOptions};
use crate::group::{Parallel, Serial};
use crate::notify::{ErrorNotifier, PendingNotifier};
use crate::retry::Retry;
use std::future::Future;
use tapestry_core::{RunResult, SharedRunnable};
use tapestry_plan::GraphSpec;

/// Static constructors for composed runnables
#[derive(Debug, Clone, Copy)]
pub struct Jobs;

impl Jobs {
    /// Leaf runnable from a closure
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> SharedRunnable
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RunResult<()>> + Send + 'static,
    {
        tapestry_core::from_fn(name, f)
    }

    /// Dependency graph from a spec, with default options
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if an id is empty or appears twice
    pub fn graph(spec: GraphSpec<SharedRunnable>) -> RunResult<DependencyGraph> {
        Self::graph_with(spec, GraphOptions::default())
    }

    /// Dependency graph from a spec, with explicit options
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if an id is empty or appears twice, or if
    /// the graph exceeds the options' item limit
    pub fn graph_with(
        spec: GraphSpec<SharedRunnable>,
        options: GraphOptions,
    ) -> RunResult<DependencyGraph> {
        let items = spec.normalize()?;
        DependencyGraph::from_planned(items)?.with_options(options)
    }

    /// Retry `action` up to `max_attempts` times
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `max_attempts` is zero
    pub fn retry(action: SharedRunnable, max_attempts: u32) -> RunResult<Retry> {
        Retry::new(action, max_attempts)
    }

    /// Error notifier around `action`; finish with `.on_error(handler)`
    pub fn notify(action: SharedRunnable) -> PendingNotifier {
        ErrorNotifier::new(action)
    }

    /// Members run one after another
    #[must_use]
    pub fn serial(members: Vec<SharedRunnable>) -> Serial {
        Serial::new(members)
    }

    /// Members run at the same time
    #[must_use]
    pub fn parallel(members: Vec<SharedRunnable>) -> Parallel {
        Parallel::new(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::ExecutionMonitor;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tapestry_core::{Backoff, IntoShared, ItemStatus, RunError, Runnable};
    use tapestry_plan::{ItemSpec, Validator};

    fn succeed() -> SharedRunnable {
        Jobs::from_fn("succeed", || async { Ok(()) })
    }

    fn fail() -> SharedRunnable {
        Jobs::from_fn("fail", || async { Err(RunError::failed("item1 broke")) })
    }

    #[tokio::test]
    async fn test_item2_after_successful_item1() {
        let monitor = Arc::new(ExecutionMonitor::default());
        let spec = GraphSpec::new()
            .item("item1", ItemSpec::action(succeed()))
            .item("item2", ItemSpec::after(succeed(), ["item1"]));
        let graph =
            Jobs::graph_with(spec, GraphOptions::new().with_monitor(Arc::clone(&monitor))).unwrap();

        graph.run().await.unwrap();
        let item1_done = monitor.position("item1", ItemStatus::Completed).unwrap();
        let item2_start = monitor.position("item2", ItemStatus::InProgress).unwrap();
        assert!(item1_done < item2_start);
    }

    #[tokio::test]
    async fn test_item2_skipped_when_item1_fails() {
        let ran = Arc::new(AtomicU32::new(0));
        let item2 = {
            let ran = Arc::clone(&ran);
            Jobs::from_fn("item2", move || {
                let ran = Arc::clone(&ran);
                async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };
        let spec = GraphSpec::new()
            .item("item1", ItemSpec::action(fail()))
            .item("item2", ItemSpec::Bundle {
                action: item2,
                depends_on: vec!["item1".to_string()],
            });

        let err = Jobs::graph(spec).unwrap().run().await.unwrap_err();
        assert!(matches!(err, RunError::ItemFailed { ref id, .. } if id.as_str() == "item1"));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let spec = GraphSpec::new()
            .item("a", ItemSpec::action(succeed()))
            .item("a", ItemSpec::action(succeed()));
        assert!(matches!(Jobs::graph(spec), Err(RunError::InvalidConfig { .. })));
    }

    #[test]
    fn test_item_limit_rejected_before_run() {
        let spec = GraphSpec::new()
            .item("a", ItemSpec::action(succeed()))
            .item("b", ItemSpec::action(succeed()));
        let options = GraphOptions::new().with_validator(Validator::new().with_max_items(1));
        assert!(matches!(
            Jobs::graph_with(spec, options),
            Err(RunError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_zero_retry_rejected() {
        assert!(Jobs::retry(succeed(), 0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_composed_leaves() {
        // A flaky deploy is retried, and a notifier wraps the retry.
        let calls = Arc::new(AtomicU32::new(0));
        let deploy = {
            let calls = Arc::clone(&calls);
            Jobs::from_fn("deploy", move || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(RunError::failed("flaky"))
                    } else {
                        Ok(())
                    }
                }
            })
        };
        let retried = Jobs::retry(deploy, 3)
            .unwrap()
            .with_backoff(Backoff::fixed(Duration::from_millis(10)));
        let guarded = Jobs::notify(retried.shared()).on_error(fail());

        let spec = GraphSpec::new()
            .item("build", ItemSpec::action(Jobs::serial(vec![succeed(), succeed()]).shared()))
            .item("deploy", ItemSpec::after(guarded.shared(), ["build"]))
            .item("smoke", ItemSpec::after(Jobs::parallel(vec![succeed(), succeed()]).shared(), ["deploy"]));

        Jobs::graph(spec).unwrap().run().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
