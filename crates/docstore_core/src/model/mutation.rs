//! Staged writes.

use crate::model::{Entity, Key};
use serde::{Deserialize, Serialize};

/// A write staged for a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Create an entity. Fails the whole commit if the key already exists.
    Insert(Entity),
    /// Replace an entity. Fails the whole commit if the key does not exist.
    Update(Entity),
    /// Create or replace an entity.
    Upsert(Entity),
    /// Remove an entity. Deleting a missing key is not an error.
    Delete(Key),
}

impl Mutation {
    /// Returns the key this mutation targets.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        match self {
            Mutation::Insert(e) | Mutation::Update(e) | Mutation::Upsert(e) => e.key(),
            Mutation::Delete(k) => Some(k),
        }
    }

    /// Returns the operation name (`insert`, `update`, `upsert`, `delete`).
    #[must_use]
    pub fn op_name(&self) -> &'static str {
        match self {
            Mutation::Insert(_) => "insert",
            Mutation::Update(_) => "update",
            Mutation::Upsert(_) => "upsert",
            Mutation::Delete(_) => "delete",
        }
    }
}
