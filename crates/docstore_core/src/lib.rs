//! # Docstore Core
//!
//! Entity model and transactional operations for a hosted document store.
//!
//! This crate provides:
//! - The entity model (keys, typed values, entities, mutations, queries)
//! - The [`Datastore`] contract every backend implements
//! - Scoped [`Transaction`]s that always release their token
//! - [`get_or_create`], the transactional read-or-insert of one key
//! - Typed records ([`Trivia`], [`Book`]) and a [`Repository`] over them
//!
//! Backends live in other crates: `docstore_storage` (in-process and
//! file-backed) and `docstore_client` (the hosted REST API).
//!
//! ## Example
//!
//! ```rust,ignore
//! use docstore_core::{get_or_create, Entity, Key};
//!
//! let key = Key::name("Trivia", "hgtg");
//! let entity = get_or_create(&store, &key, || {
//!     Entity::unkeyed()
//!         .with_property("question", "Meaning of Life?")
//!         .with_property("answer", 42i64)
//! })?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod book;
mod error;
pub mod model;
mod ops;
mod record;
mod repository;
mod transaction;
mod trivia;

pub use backend::{
    CommitMode, CommitResult, Datastore, LookupResult, ReadOptions, TransactionToken,
};
pub use book::{Book, BOOK_KIND};
pub use error::{Code, CoreError, CoreResult, DecodeError, Method, StoreError, StoreResult};
pub use model::{Entity, Filter, IdOrName, Key, Mutation, PathElement, PropertyOp, Query, Value};
pub use ops::get_or_create;
pub use record::{check_kind, Record};
pub use repository::{BookRepository, Repository};
pub use transaction::Transaction;
pub use trivia::{
    Trivia, CORRECT_ANSWER_MESSAGE, TRIVIA_KIND, TRIVIA_NAME, WRONG_ANSWER_MESSAGE,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
