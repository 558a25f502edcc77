//! TAPESTRY CLI
//!
//! Checks and runs JSON plan files of dependent shell jobs.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod assemble;
mod shell;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use std::path::PathBuf;
use std::sync::Arc;
use tapestry_plan::{Dag, JobEntry, PlanFile, Validator};
use tapestry_runtime::{ExecutionMonitor, FailurePolicy, GraphOptions};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tapestry")]
#[command(about = "TAPESTRY - Dependency-ordered job runner", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a plan and print its execution levels
    Check {
        /// Path to plan file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Run a plan
    Run {
        /// Path to plan file
        #[arg(short, long)]
        file: PathBuf,
        /// Let running jobs finish when another job fails
        #[arg(long)]
        detach_on_failure: bool,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("TAPESTRY_LOG")
        .unwrap_or_else(|_| EnvFilter::new("tapestry=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Longest run of distinct retry waits `check` lists per job
const PREVIEW_WAITS: usize = 8;

fn check(file: PathBuf) -> Result<()> {
    let plan = PlanFile::load(&file)?;
    let report = check_report(plan);
    let (Ok(lines) | Err(lines)) = &report;
    for line in lines {
        println!("{}", line);
    }
    if report.is_err() {
        return Err(eyre!("plan {} is not runnable", file.display()));
    }
    Ok(())
}

/// Lines describing a plan; `Err` carries the lines explaining why it cannot run
fn check_report(plan: PlanFile) -> Result<Vec<String>, Vec<String>> {
    let mut lines = vec![format!("Plan: {} ({} jobs)", plan.display_name(), plan.jobs.len())];

    let mut previews = Vec::new();
    for (id, entry) in &plan.jobs {
        let JobEntry::Full(def) = entry else { continue };
        let Some(retry) = &def.retry else { continue };
        let retries = retry.max_attempts.saturating_sub(1) as usize;
        match retry.backoff() {
            Ok(backoff) => previews.push((id.clone(), backoff.preview(retries, PREVIEW_WAITS))),
            Err(err) => {
                lines.push(format!("  {}: {}", id, err));
                return Err(lines);
            }
        }
    }

    let dag = match assemble::planned_jobs(plan).and_then(|items| Dag::from_planned(&items)) {
        Ok(dag) => dag,
        Err(err) => {
            lines.push(format!("  {}", err));
            return Err(lines);
        }
    };
    let report = Validator::new().check(&dag);

    if !report.is_valid() {
        for (id, dep) in &report.missing {
            lines.push(format!("  missing: {} depends on unknown {}", id, dep));
        }
        let unreachable: Vec<&str> = report.unreachable.iter().map(|id| id.as_str()).collect();
        lines.push(format!("  unreachable: {}", unreachable.join(", ")));
        return Err(lines);
    }

    let entries: Vec<&str> = dag.entry_nodes().iter().map(|id| id.as_str()).collect();
    lines.push(format!("  {} edges, entry jobs: {}", dag.edge_count(), entries.join(", ")));
    for (level, ids) in report.levels(&dag).iter().enumerate() {
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        lines.push(format!("  level {}: {}", level, ids.join(", ")));
    }
    for (id, preview) in previews {
        lines.push(format!("  retry {}: waits [{}]", id, preview));
    }
    Ok(lines)
}

async fn run(file: PathBuf, detach_on_failure: bool) -> Result<()> {
    let plan = PlanFile::load(&file)?;
    let policy = if detach_on_failure {
        FailurePolicy::Detach
    } else {
        FailurePolicy::CancelInFlight
    };

    let token = CancellationToken::new();
    let monitor = Arc::new(ExecutionMonitor::default());
    let options = GraphOptions::new()
        .with_failure_policy(policy)
        .with_cancel(token.clone())
        .with_monitor(Arc::clone(&monitor));
    let graph = assemble::build_graph(plan, options)?;

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            token.cancel();
        }
    });
    let outcome = graph.execute().await;
    interrupt.abort();

    let metrics = monitor.metrics();
    println!(
        "{} completed, {} failed, {} retries ({:.0}% success)",
        metrics.items_completed,
        metrics.items_failed,
        metrics.retries,
        metrics.success_rate() * 100.0
    );

    match outcome {
        Ok(()) => Ok(()),
        Err(err) => {
            let path: Vec<&str> = err.item_path().into_iter().map(|id| id.as_str()).collect();
            if path.is_empty() {
                Err(eyre!(err))
            } else {
                Err(eyre!("{} (root cause: {})", path.join(" > "), err.root_cause()))
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Check { file } => check(file),
        Commands::Run {
            file,
            detach_on_failure,
        } => run(file, detach_on_failure).await,
    }
}
