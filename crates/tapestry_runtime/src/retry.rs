//! Retry combinator.
//!
//! Re-runs a wrapped runnable until it succeeds or the attempt budget is
//! spent, sleeping between attempts according to a [`Backoff`]. Attempts
//! are strictly sequential and all counters are local to one `run` call,
//! so a single `Retry` can be run repeatedly or from several tasks.

use crate::monitor::ExecutionMonitor;
use async_trait::async_trait;
use std::sync::Arc;
use tapestry_core::{Backoff, RunError, RunResult, Runnable, SharedRunnable};
use tracing::{debug, warn};

/// Runnable that retries its action with backoff
#[derive(Clone)]
pub struct Retry {
    action: SharedRunnable,
    max_attempts: u32,
    backoff: Backoff,
    monitor: Option<Arc<ExecutionMonitor>>,
}

impl Retry {
    /// Retry `action` up to `max_attempts` times in total, with no delay
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `max_attempts` is zero
    pub fn new(action: SharedRunnable, max_attempts: u32) -> RunResult<Self> {
        if max_attempts == 0 {
            return Err(RunError::invalid_config(
                "max_attempts",
                "must be at least 1",
            ));
        }
        Ok(Self {
            action,
            max_attempts,
            backoff: Backoff::NONE,
            monitor: None,
        })
    }

    /// Copy of this retry using `backoff`; `self` is left unchanged
    #[must_use]
    pub fn with_backoff(&self, backoff: Backoff) -> Self {
        Self {
            backoff,
            ..self.clone()
        }
    }

    /// Report retried attempts to `monitor`
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<ExecutionMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Attempts including the first
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay policy between attempts
    #[must_use]
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }
}

impl std::fmt::Debug for Retry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retry")
            .field("action", &self.action.name())
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

#[async_trait]
impl Runnable for Retry {
    async fn run(&self) -> RunResult<()> {
        let mut delay = self.backoff.base();
        let mut attempt = 1;

        loop {
            let error = match self.action.run().await {
                Ok(()) => {
                    if attempt > 1 {
                        debug!(action = self.action.name(), attempt, "succeeded after retry");
                    }
                    return Ok(());
                }
                Err(error) => error,
            };

            if attempt >= self.max_attempts {
                warn!(
                    action = self.action.name(),
                    attempts = attempt,
                    error = %error,
                    "retries exhausted"
                );
                return Err(error);
            }

            warn!(
                action = self.action.name(),
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, retrying"
            );
            if let Some(monitor) = &self.monitor {
                monitor.record_retry();
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            delay = self.backoff.next(delay);
            attempt += 1;
        }
    }

    fn name(&self) -> &str {
        self.action.name()
    }
}
