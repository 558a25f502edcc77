//! TAPESTRY Core Types
//!
//! The runnable capability every combinator composes over, plus the pure
//! types shared by the planner and the runtime. No I/O and no scheduling
//! lives here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod error;
pub mod id;
pub mod runnable;
pub mod status;

// Re-exports
pub use backoff::{Backoff, SchedulePreview};
pub use error::{RunError, RunResult};
pub use id::{ItemId, RunId};
pub use runnable::{FnRunnable, IntoShared, Runnable, SharedRunnable, from_fn};
pub use status::ItemStatus;
