//! The runnable capability.
//!
//! A runnable is an asynchronous unit of work that runs to completion and
//! either succeeds or fails. Leaves (shell commands, closures, containers)
//! and every combinator expose exactly this surface.

use crate::error::RunResult;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// An asynchronous unit of work
#[async_trait]
pub trait Runnable: Send + Sync {
    /// Run to completion
    async fn run(&self) -> RunResult<()>;

    /// Short label used in logs
    fn name(&self) -> &str {
        "runnable"
    }
}

/// Runnable shared between combinators and in-flight futures
pub type SharedRunnable = Arc<dyn Runnable>;

/// Conversion of a concrete runnable into a [`SharedRunnable`]
pub trait IntoShared {
    /// Box into an `Arc<dyn Runnable>`
    fn shared(self) -> SharedRunnable;
}

impl<R: Runnable + 'static> IntoShared for R {
    fn shared(self) -> SharedRunnable {
        Arc::new(self)
    }
}

/// Runnable backed by a closure that produces a future per invocation
pub struct FnRunnable<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnRunnable<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = RunResult<()>> + Send,
{
    /// Wrap a closure
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> Runnable for FnRunnable<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = RunResult<()>> + Send,
{
    async fn run(&self) -> RunResult<()> {
        (self.f)().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnRunnable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRunnable").field("name", &self.name).finish()
    }
}

/// Shared runnable from a closure
pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> SharedRunnable
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RunResult<()>> + Send + 'static,
{
    Arc::new(FnRunnable::new(name, f))
}
