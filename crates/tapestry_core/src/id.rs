//! Identifiers for TAPESTRY entities.
//!
//! Graph items are keyed by caller-supplied strings; runs get a random UUID.

use crate::error::{RunError, RunResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Graph item identifier - unique key of an item within one graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Create an item id
    ///
    /// # Errors
    ///
    /// Returns error if the id is empty or only whitespace
    pub fn new(id: impl Into<String>) -> RunResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RunError::invalid_config("id", "item id must not be empty"));
        }
        Ok(Self(id))
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemId {
    type Error = RunError;

    fn try_from(value: String) -> RunResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ItemId {
    type Error = RunError;

    fn try_from(value: &str) -> RunResult<Self> {
        Self::new(value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Run identifier - identifies a single invocation of a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run_{}", self.0)
    }
}
