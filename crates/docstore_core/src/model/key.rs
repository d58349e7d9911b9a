//! Entity keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identifier part of a path element.
///
/// Numeric ids sort before names, matching the hosted store's key order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IdOrName {
    /// Backend-allocated (or caller-chosen) numeric id.
    Id(i64),
    /// Caller-chosen string name.
    Name(String),
}

impl fmt::Display for IdOrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdOrName::Id(id) => write!(f, "{id}"),
            IdOrName::Name(name) => write!(f, "{name}"),
        }
    }
}

/// One `(kind, id-or-name)` segment of a key path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathElement {
    /// Entity kind.
    pub kind: String,
    /// Identifier, `None` while the element is incomplete.
    pub id: Option<IdOrName>,
}

impl PathElement {
    /// Creates a named path element.
    pub fn name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(IdOrName::Name(name.into())),
        }
    }

    /// Creates a path element with a numeric id.
    pub fn id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id: Some(IdOrName::Id(id)),
        }
    }

    /// Creates an incomplete path element; the backend allocates the id.
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }
}

/// Structured entity identifier.
///
/// A key is a path of `(kind, id-or-name)` pairs, outermost ancestor first.
/// A key identifies at most one entity in a store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    path: Vec<PathElement>,
}

impl Key {
    /// Creates a key from a full path.
    #[must_use]
    pub fn from_path(path: Vec<PathElement>) -> Self {
        Self { path }
    }

    /// Creates a single-element key with a string name.
    pub fn name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_path(vec![PathElement::name(kind, name)])
    }

    /// Creates a single-element key with a numeric id.
    pub fn id(kind: impl Into<String>, id: i64) -> Self {
        Self::from_path(vec![PathElement::id(kind, id)])
    }

    /// Creates a single-element key whose id is allocated on insert.
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self::from_path(vec![PathElement::incomplete(kind)])
    }

    /// Returns the path elements.
    #[must_use]
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// Returns true if the path has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Returns the kind of the last path element.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.path.last().map(|e| e.kind.as_str())
    }

    /// Returns the identifier of the last path element.
    #[must_use]
    pub fn id_or_name(&self) -> Option<&IdOrName> {
        self.path.last().and_then(|e| e.id.as_ref())
    }

    /// Returns the numeric id of the last path element, if it has one.
    #[must_use]
    pub fn numeric_id(&self) -> Option<i64> {
        match self.id_or_name() {
            Some(IdOrName::Id(id)) => Some(*id),
            _ => None,
        }
    }

    /// Returns true if every path element carries an id or name.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.path.is_empty() && self.path.iter().all(|e| e.id.is_some())
    }

    /// Completes the last path element with a numeric id.
    ///
    /// Has no effect on keys that are already complete.
    pub fn complete_with(&mut self, id: i64) {
        if let Some(last) = self.path.last_mut() {
            if last.id.is_none() {
                last.id = Some(IdOrName::Id(id));
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match &element.id {
                Some(id) => write!(f, "{}/{id}", element.kind)?,
                None => write!(f, "{}/?", element.kind)?,
            }
        }
        Ok(())
    }
}
