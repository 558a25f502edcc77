//! Dependency DAG over item ids.
//!
//! The DAG only records structure: which item depends on which. Edges may
//! point at ids that are not nodes; the validator reports those.

use crate::spec::PlannedItem;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tapestry_core::{ItemId, RunError, RunResult};

/// Dependency graph keyed by item id, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dag {
    /// item -> items it depends on
    nodes: IndexMap<ItemId, IndexSet<ItemId>>,
}

impl Dag {
    /// Create a new empty DAG
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    /// Build from normalized items
    ///
    /// # Errors
    ///
    /// Returns error if an id appears twice
    pub fn from_planned<A>(items: &[PlannedItem<A>]) -> RunResult<Self> {
        let mut dag = Self::new();
        for item in items {
            dag.add_node(item.id.clone(), item.depends_on.clone())?;
        }
        Ok(dag)
    }

    /// Add a node with its dependencies
    ///
    /// # Errors
    ///
    /// Returns error if the node already exists
    pub fn add_node(&mut self, id: ItemId, depends_on: IndexSet<ItemId>) -> RunResult<()> {
        if self.nodes.contains_key(&id) {
            return Err(RunError::invalid_config(
                "id",
                format!("duplicate item id {}", id),
            ));
        }
        self.nodes.insert(id, depends_on);
        Ok(())
    }

    /// Check if the id is a node
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node ids in declaration order
    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.nodes.keys()
    }

    /// Nodes with their dependency sets, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &IndexSet<ItemId>)> {
        self.nodes.iter()
    }

    /// Items the given item depends on
    #[must_use]
    pub fn dependencies(&self, id: &str) -> Option<&IndexSet<ItemId>> {
        self.nodes.get(id)
    }

    /// Reverse adjacency for every dependency id, including ids that are
    /// not nodes
    #[must_use]
    pub fn dependents_map(&self) -> IndexMap<&ItemId, Vec<&ItemId>> {
        let mut map: IndexMap<&ItemId, Vec<&ItemId>> = IndexMap::new();
        for (node, deps) in &self.nodes {
            for dep in deps {
                map.entry(dep).or_default().push(node);
            }
        }
        map
    }

    /// Nodes without dependencies
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<&ItemId> {
        self.nodes
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    /// Get total node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get total edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(IndexSet::len).sum()
    }

    /// Check if DAG is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
