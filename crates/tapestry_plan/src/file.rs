//! JSON plan files.
//!
//! A plan file names a graph of shell jobs. Each entry takes one of three
//! shapes, decided once at parse time:
//!
//! ```json
//! {
//!   "name": "release",
//!   "jobs": {
//!     "build": "make",
//!     "test": ["make test", ["build"]],
//!     "ship": {
//!       "run": "./ship.sh",
//!       "depends_on": ["test"],
//!       "retry": { "max_attempts": 3, "base_delay_ms": 50, "factor": 2.0, "max_delay_ms": 200 },
//!       "on_error": "./page-oncall.sh"
//!     }
//!   }
//! }
//! ```

use crate::spec::{GraphSpec, ItemSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tapestry_core::{Backoff, RunError};

/// Plan file errors
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// File could not be read
    #[error("Failed to read plan {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not a valid plan document
    #[error("Malformed plan: {0}")]
    Parse(#[from] serde_json::Error),

    /// Document parsed but describes an invalid configuration
    #[error("Invalid plan: {0}")]
    Invalid(#[from] RunError),
}

/// Retry settings of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(default)]
    pub base_delay_ms: u64,
    /// Growth factor between retries
    #[serde(default = "default_factor")]
    pub factor: f64,
    /// Delay cap; unbounded when absent
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
}

fn default_factor() -> f64 {
    1.0
}

impl RetryConfig {
    /// Backoff policy described by this config
    ///
    /// # Errors
    ///
    /// Returns error if the factor is invalid
    pub fn backoff(&self) -> Result<Backoff, RunError> {
        let max = self.max_delay_ms.map_or(Duration::MAX, Duration::from_millis);
        Backoff::new(Duration::from_millis(self.base_delay_ms), self.factor, max)
    }

    /// Check the config without building anything
    ///
    /// # Errors
    ///
    /// Returns error on zero attempts or an invalid factor
    pub fn validate(&self) -> Result<(), RunError> {
        if self.max_attempts == 0 {
            return Err(RunError::invalid_config(
                "retry.max_attempts",
                "must be at least 1",
            ));
        }
        self.backoff().map(|_| ())
    }
}

/// Full job definition (object shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobDef {
    /// Shell command line
    pub run: String,
    /// Ids that must complete first
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Retry settings
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Command run once when the job finally fails
    #[serde(default)]
    pub on_error: Option<String>,
    /// Working directory
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

impl JobDef {
    /// Job running `command` with defaults for everything else
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            run: command.into(),
            depends_on: Vec::new(),
            retry: None,
            on_error: None,
            cwd: None,
            env: IndexMap::new(),
        }
    }
}

/// One entry of the `jobs` map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobEntry {
    /// Bare command
    Command(String),
    /// `[command, [dependencies...]]`
    WithDeps(String, Vec<String>),
    /// Object with all options
    Full(JobDef),
}

impl JobEntry {
    /// Canonical spec entry; dependencies move out of the job definition
    #[must_use]
    pub fn into_spec(self) -> ItemSpec<JobDef> {
        match self {
            Self::Command(run) => ItemSpec::Action(JobDef::command(run)),
            Self::WithDeps(run, deps) => ItemSpec::WithDeps(JobDef::command(run), deps),
            Self::Full(mut def) => {
                let depends_on = std::mem::take(&mut def.depends_on);
                ItemSpec::Bundle {
                    action: def,
                    depends_on,
                }
            }
        }
    }
}

/// Parsed plan document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Jobs by id, in file order
    pub jobs: IndexMap<String, JobEntry>,
}

impl PlanFile {
    /// Parse from a JSON string
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or a retry block is invalid
    pub fn from_json(input: &str) -> Result<Self, PlanError> {
        let plan: Self = serde_json::from_str(input)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Read and parse a plan file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&input)
    }

    /// Display name, falling back to `"plan"`
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("plan")
    }

    /// Check per-job settings
    ///
    /// # Errors
    ///
    /// Returns error if a retry block is invalid
    pub fn validate(&self) -> Result<(), RunError> {
        for (id, entry) in &self.jobs {
            if let JobEntry::Full(def) = entry {
                if let Some(retry) = &def.retry {
                    retry.validate().map_err(|e| match e {
                        RunError::InvalidConfig { field, reason } => RunError::InvalidConfig {
                            field: format!("jobs.{}.{}", id, field),
                            reason,
                        },
                        other => other,
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Convert into a graph spec over job definitions
    #[must_use]
    pub fn into_spec(self) -> GraphSpec<JobDef> {
        self.jobs
            .into_iter()
            .map(|(id, entry)| (id, entry.into_spec()))
            .collect()
    }
}
