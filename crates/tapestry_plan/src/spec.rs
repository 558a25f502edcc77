//! Declarative graph specs.
//!
//! A graph spec maps ids to one of three entry shapes: a bare action, an
//! `(action, dependencies)` tuple, or an object bundling the two. The shape
//! is fixed by the [`ItemSpec`] variant and resolved exactly once by
//! [`GraphSpec::normalize`] into canonical [`PlannedItem`]s.

use indexmap::IndexSet;
use tapestry_core::{ItemId, RunError, RunResult};

/// One entry of a graph spec
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSpec<A> {
    /// Action with no dependencies
    Action(A),
    /// Tuple shape: action followed by dependency ids
    WithDeps(A, Vec<String>),
    /// Object shape
    Bundle {
        /// The action to run
        action: A,
        /// Ids that must complete first
        depends_on: Vec<String>,
    },
}

impl<A> ItemSpec<A> {
    /// Entry without dependencies
    pub fn action(action: A) -> Self {
        Self::Action(action)
    }

    /// Entry that runs after `deps`
    pub fn after<I, S>(action: A, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::WithDeps(action, deps.into_iter().map(Into::into).collect())
    }

    /// Canonical `(action, dependencies)` pair
    pub fn into_parts(self) -> (A, Vec<String>) {
        match self {
            Self::Action(action) => (action, Vec::new()),
            Self::WithDeps(action, deps) => (action, deps),
            Self::Bundle { action, depends_on } => (action, depends_on),
        }
    }
}

/// Canonical graph entry
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem<A> {
    /// Item id
    pub id: ItemId,
    /// Wrapped action
    pub action: A,
    /// Ids that must complete first, duplicates collapsed
    pub depends_on: IndexSet<ItemId>,
}

/// Insertion-ordered mapping of id to entry
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSpec<A> {
    entries: Vec<(String, ItemSpec<A>)>,
}

impl<A> GraphSpec<A> {
    /// Create an empty spec
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an entry
    #[must_use]
    pub fn item(mut self, id: impl Into<String>, spec: ItemSpec<A>) -> Self {
        self.entries.push((id.into(), spec));
        self
    }

    /// Add an entry in place
    pub fn push(&mut self, id: impl Into<String>, spec: ItemSpec<A>) {
        self.entries.push((id.into(), spec));
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the spec has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every entry into its canonical form
    ///
    /// Missing dependency ids are not an error here; they make the graph
    /// invalid at run time.
    ///
    /// # Errors
    ///
    /// Returns error on empty ids or on an id declared twice
    pub fn normalize(self) -> RunResult<Vec<PlannedItem<A>>> {
        let mut seen = IndexSet::new();
        let mut items = Vec::with_capacity(self.entries.len());

        for (raw_id, spec) in self.entries {
            let id = ItemId::new(raw_id)?;
            if !seen.insert(id.clone()) {
                return Err(RunError::invalid_config(
                    "id",
                    format!("duplicate item id {}", id),
                ));
            }

            let (action, deps) = spec.into_parts();
            let depends_on = deps
                .into_iter()
                .map(ItemId::new)
                .collect::<RunResult<IndexSet<_>>>()?;

            items.push(PlannedItem {
                id,
                action,
                depends_on,
            });
        }

        Ok(items)
    }
}

impl<A> Default for GraphSpec<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, S: Into<String>> FromIterator<(S, ItemSpec<A>)> for GraphSpec<A> {
    fn from_iter<T: IntoIterator<Item = (S, ItemSpec<A>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(id, spec)| (id.into(), spec)).collect(),
        }
    }
}
