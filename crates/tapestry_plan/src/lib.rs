//! TAPESTRY Planner
//!
//! Turns declarative graph specs into canonical dependency lists, checks
//! them for reachability, and loads JSON plan files. Nothing here runs
//! work; the runtime consumes what this crate produces.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dag;
pub mod file;
pub mod spec;
pub mod validate;

pub use dag::Dag;
pub use file::{JobDef, JobEntry, PlanError, PlanFile, RetryConfig};
pub use spec::{GraphSpec, ItemSpec, PlannedItem};
pub use validate::{Reachability, Validator};
