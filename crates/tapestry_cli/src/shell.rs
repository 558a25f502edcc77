//! Shell command leaves.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tapestry_core::{RunError, RunResult, Runnable};
use tokio::process::Command;
use tracing::debug;

/// Runs a command line through `sh -c`
#[derive(Debug, Clone)]
pub struct ShellJob {
    name: String,
    command: String,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl ShellJob {
    /// Job named `name` running `command`
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Run in `dir`
    #[must_use]
    pub fn current_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cwd = dir;
        self
    }

    /// Add environment variables
    #[must_use]
    pub fn envs(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(vars);
        self
    }
}

#[async_trait]
impl Runnable for ShellJob {
    async fn run(&self) -> RunResult<()> {
        debug!(job = %self.name, command = %self.command, "spawning");

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&self.command)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            // Dropping the future (graph cancellation) must not leak the child.
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }

        let status = command
            .status()
            .await
            .map_err(|e| RunError::failed(format!("cannot start `{}`: {}", self.command, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(RunError::failed(format!("`{}` exited with {}", self.command, status)))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
