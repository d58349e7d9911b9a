//! Data model shared by every backend.

mod entity;
mod key;
mod mutation;
mod query;
mod value;

pub use entity::Entity;
pub use key::{IdOrName, Key, PathElement};
pub use mutation::Mutation;
pub use query::{Filter, PropertyOp, Query};
pub use value::Value;
