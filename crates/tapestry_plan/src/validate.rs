//! Reachability validation for dependency graphs.
//!
//! An item is reachable when it has no dependencies, or when every one of
//! its dependencies exists and is itself reachable. The check settles each
//! item at most once: items are released when their last pending
//! dependency settles, and whatever is never released when the work queue
//! drains sits on a cycle, depends on a missing id, or depends on such an
//! item. Nothing recurses, so deep chains cost no stack.

use crate::dag::Dag;
use indexmap::IndexMap;
use std::collections::VecDeque;
use tapestry_core::{ItemId, RunError, RunResult};

/// Outcome of a reachability check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reachability {
    /// Reachable items in a dependency-respecting order
    pub order: Vec<ItemId>,
    /// Items whose dependency chain never resolves, in declaration order
    pub unreachable: Vec<ItemId>,
    /// `(item, dependency)` pairs where the dependency is not in the graph
    pub missing: Vec<(ItemId, ItemId)>,
}

impl Reachability {
    /// Check if every item is reachable
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.unreachable.is_empty()
    }

    /// Convert into the graph-invalid error, or the order if valid
    ///
    /// # Errors
    ///
    /// Returns `InvalidGraph` if any item is unreachable
    pub fn into_result(self) -> RunResult<Vec<ItemId>> {
        if self.is_valid() {
            Ok(self.order)
        } else {
            Err(RunError::InvalidGraph {
                unreachable: self.unreachable,
                missing: self.missing,
            })
        }
    }

    /// Group reachable items into levels: level `n` holds items whose
    /// longest dependency chain has length `n`. Items in one level can run
    /// at the same time.
    #[must_use]
    pub fn levels(&self, dag: &Dag) -> Vec<Vec<ItemId>> {
        let mut depth: IndexMap<&ItemId, usize> = IndexMap::new();
        let mut levels: Vec<Vec<ItemId>> = Vec::new();

        for id in &self.order {
            let level = dag
                .dependencies(id.as_str())
                .map(|deps| {
                    deps.iter()
                        .filter_map(|dep| depth.get(dep))
                        .map(|d| d + 1)
                        .max()
                        .unwrap_or(0)
                })
                .unwrap_or(0);
            depth.insert(id, level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(id.clone());
        }

        levels
    }
}

/// Validator for graph reachability
#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// Maximum allowed items (0 = no limit)
    pub max_items: usize,
}

impl Validator {
    /// Create a new validator
    #[must_use]
    pub fn new() -> Self {
        Self { max_items: 0 }
    }

    /// Set maximum item count
    #[must_use]
    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = max;
        self
    }

    /// Validate a DAG, returning a dependency-respecting order
    ///
    /// # Errors
    ///
    /// Returns `InvalidGraph` if any item is unreachable, or
    /// `InvalidConfig` if the graph exceeds `max_items`
    pub fn validate(&self, dag: &Dag) -> RunResult<Vec<ItemId>> {
        self.check_limits(dag)?;
        self.check(dag).into_result()
    }

    /// Check size limits only
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the graph exceeds `max_items`
    pub fn check_limits(&self, dag: &Dag) -> RunResult<()> {
        if self.max_items > 0 && dag.node_count() > self.max_items {
            return Err(RunError::invalid_config(
                "items",
                format!("item count {} exceeds max {}", dag.node_count(), self.max_items),
            ));
        }
        Ok(())
    }

    /// Compute reachability for every item
    #[must_use]
    pub fn check(&self, dag: &Dag) -> Reachability {
        let mut report = Reachability::default();

        // Pending dependency count per item; a missing dependency is never
        // settled, so its dependents stay pending.
        let mut pending: IndexMap<&ItemId, usize> = IndexMap::with_capacity(dag.node_count());
        let mut queue: VecDeque<&ItemId> = VecDeque::new();

        for (id, deps) in dag.iter() {
            for dep in deps {
                if !dag.contains(dep.as_str()) {
                    report.missing.push((id.clone(), dep.clone()));
                }
            }
            pending.insert(id, deps.len());
            if deps.is_empty() {
                queue.push_back(id);
            }
        }

        let dependents = dag.dependents_map();
        while let Some(id) = queue.pop_front() {
            report.order.push(id.clone());
            let Some(waiting) = dependents.get(id) else {
                continue;
            };
            for &dependent in waiting {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        report.unreachable = pending
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(id, _)| id.clone())
            .collect();

        report
    }
}
