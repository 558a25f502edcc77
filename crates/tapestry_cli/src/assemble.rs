//! Turns a parsed plan file into a runnable graph of shell jobs.
//!
//! Each job becomes a [`ShellJob`], wrapped in a [`Retry`] when it has a
//! retry block and then in an [`ErrorNotifier`] when it names an
//! `on_error` command. The notifier sits outside the retry, so the handler
//! runs once, after the final attempt.

use crate::shell::ShellJob;
use std::sync::Arc;
use tapestry_core::{IntoShared, ItemId, RunResult, SharedRunnable};
use tapestry_plan::{JobDef, PlanFile, PlannedItem};
use tapestry_runtime::{DependencyGraph, ErrorNotifier, ExecutionMonitor, GraphOptions, Retry};

/// Runnable for one job definition
pub fn job_runnable(
    id: &ItemId,
    def: JobDef,
    monitor: Option<&Arc<ExecutionMonitor>>,
) -> RunResult<SharedRunnable> {
    let env: Vec<(String, String)> = def.env.into_iter().collect();
    let shell = ShellJob::new(id.as_str(), def.run)
        .current_dir(def.cwd.clone())
        .envs(env.clone());
    let mut runnable = shell.shared();

    if let Some(config) = &def.retry {
        let mut retry = Retry::new(runnable, config.max_attempts)?.with_backoff(config.backoff()?);
        if let Some(monitor) = monitor {
            retry = retry.with_monitor(Arc::clone(monitor));
        }
        runnable = retry.shared();
    }

    if let Some(handler) = def.on_error {
        let handler = ShellJob::new(format!("{}.on_error", id), handler)
            .current_dir(def.cwd)
            .envs(env);
        let mut notifier = ErrorNotifier::new(runnable).on_error(handler.shared());
        if let Some(monitor) = monitor {
            notifier = notifier.with_monitor(Arc::clone(monitor));
        }
        runnable = notifier.shared();
    }

    Ok(runnable)
}

/// Normalized plan items, still holding job definitions
pub fn planned_jobs(plan: PlanFile) -> RunResult<Vec<PlannedItem<JobDef>>> {
    plan.into_spec().normalize()
}

/// Dependency graph for a whole plan
pub fn build_graph(plan: PlanFile, options: GraphOptions) -> RunResult<DependencyGraph> {
    let name = plan.display_name().to_string();
    let monitor = options.monitor.clone();

    let items = planned_jobs(plan)?
        .into_iter()
        .map(|item| {
            let action = job_runnable(&item.id, item.action, monitor.as_ref())?;
            Ok(PlannedItem {
                id: item.id,
                action,
                depends_on: item.depends_on,
            })
        })
        .collect::<RunResult<Vec<_>>>()?;

    DependencyGraph::from_planned(items)?
        .with_name(name)
        .with_options(options)
}
