//! Error-notification combinator.
//!
//! Wraps a main runnable with a handler that runs once, after the main
//! runnable fails. A notifier is built in two steps so that it cannot run
//! without exactly one handler:
//!
//! ```ignore
//! let job = ErrorNotifier::new(deploy).on_error(page_oncall);
//! ```

use crate::monitor::ExecutionMonitor;
use async_trait::async_trait;
use std::sync::Arc;
use tapestry_core::{RunError, RunResult, Runnable, SharedRunnable};
use tracing::{info, warn};

/// Notifier waiting for its handler; not runnable
#[must_use = "a notifier does nothing until `on_error` supplies a handler"]
pub struct PendingNotifier {
    main: SharedRunnable,
}

impl PendingNotifier {
    /// Attach the handler, producing a runnable notifier
    pub fn on_error(self, handler: SharedRunnable) -> ErrorNotifier {
        ErrorNotifier {
            main: self.main,
            handler,
            monitor: None,
        }
    }
}

/// Runnable that invokes a handler when its main runnable fails
#[derive(Clone)]
pub struct ErrorNotifier {
    main: SharedRunnable,
    handler: SharedRunnable,
    monitor: Option<Arc<ExecutionMonitor>>,
}

impl ErrorNotifier {
    /// Start building a notifier around `main`
    #[allow(clippy::new_ret_no_self)]
    pub fn new(main: SharedRunnable) -> PendingNotifier {
        PendingNotifier { main }
    }

    /// Report handler invocations to `monitor`
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<ExecutionMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }
}

impl std::fmt::Debug for PendingNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingNotifier")
            .field("main", &self.main.name())
            .finish()
    }
}

impl std::fmt::Debug for ErrorNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorNotifier")
            .field("main", &self.main.name())
            .field("handler", &self.handler.name())
            .finish()
    }
}

#[async_trait]
impl Runnable for ErrorNotifier {
    async fn run(&self) -> RunResult<()> {
        let main = match self.main.run().await {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };

        info!(
            action = self.main.name(),
            handler = self.handler.name(),
            error = %main,
            "running error handler"
        );
        if let Some(monitor) = &self.monitor {
            monitor.record_handler_run();
        }

        match self.handler.run().await {
            Ok(()) => Err(main),
            Err(handler) => {
                warn!(handler = self.handler.name(), error = %handler, "error handler failed");
                Err(RunError::HandlerFailed {
                    main: Box::new(main),
                    handler: Box::new(handler),
                })
            }
        }
    }

    fn name(&self) -> &str {
        self.main.name()
    }
}
