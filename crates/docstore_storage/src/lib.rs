//! # Docstore Storage
//!
//! Local [`Datastore`](docstore_core::Datastore) backends.
//!
//! ## Available Backends
//!
//! - [`MemoryDatastore`] - multi-version, snapshot-isolated, in-process
//! - [`FileDatastore`] - a `MemoryDatastore` persisted to one CBOR file
//!
//! Both follow the hosted store's commit rules: optimistic transactions
//! fail with `Aborted` on conflict, inserts of existing keys fail with
//! `AlreadyExists`, incomplete keys receive numeric ids.
//!
//! ## Example
//!
//! ```rust
//! use docstore_core::{Book, BookRepository};
//! use docstore_storage::MemoryDatastore;
//!
//! let store = MemoryDatastore::new();
//! let repo = BookRepository::new(&store);
//! let saved = repo.save(Book::new("Good Omens", "Terry Pratchett", 1990)).unwrap();
//! assert_eq!(saved.id, Some(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;

pub use error::{StorageError, StorageResult};
pub use file::{FileDatastore, FORMAT_VERSION};
pub use memory::{DatastoreStats, MemoryDatastore, Snapshot};
