//! Serial and parallel groups of runnables.

use async_trait::async_trait;
use futures::future::try_join_all;
use tapestry_core::{RunResult, Runnable, SharedRunnable};
use tracing::debug;

/// Runs members one at a time, in order, stopping at the first failure
#[derive(Clone, Default)]
pub struct Serial {
    members: Vec<SharedRunnable>,
}

impl Serial {
    /// Create a serial group
    #[must_use]
    pub fn new(members: Vec<SharedRunnable>) -> Self {
        Self { members }
    }

    /// Append a member
    #[must_use]
    pub fn then(mut self, member: SharedRunnable) -> Self {
        self.members.push(member);
        self
    }

    /// Member count
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the group has no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl Runnable for Serial {
    async fn run(&self) -> RunResult<()> {
        for (position, member) in self.members.iter().enumerate() {
            if let Err(error) = member.run().await {
                debug!(
                    member = member.name(),
                    position,
                    skipped = self.members.len() - position - 1,
                    "serial group stopped"
                );
                return Err(error);
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "serial"
    }
}

/// Starts all members at once; the first failure fails the group
///
/// Remaining members are dropped when one fails.
#[derive(Clone, Default)]
pub struct Parallel {
    members: Vec<SharedRunnable>,
}

impl Parallel {
    /// Create a parallel group
    #[must_use]
    pub fn new(members: Vec<SharedRunnable>) -> Self {
        Self { members }
    }

    /// Add a member
    #[must_use]
    pub fn with(mut self, member: SharedRunnable) -> Self {
        self.members.push(member);
        self
    }

    /// Member count
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the group has no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl Runnable for Parallel {
    async fn run(&self) -> RunResult<()> {
        try_join_all(self.members.iter().map(|member| member.run())).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "parallel"
    }
}

macro_rules! impl_group_debug {
    ($($group:ident),*) => {$(
        impl std::fmt::Debug for $group {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_list()
                    .entries(self.members.iter().map(|m| m.name()))
                    .finish()
            }
        }
    )*};
}

impl_group_debug!(Serial, Parallel);
