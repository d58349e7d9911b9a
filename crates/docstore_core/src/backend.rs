//! Datastore contract.

use crate::error::StoreResult;
use crate::model::{Entity, Key, Mutation, Query};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Opaque transaction handle issued by [`Datastore::begin_transaction`].
///
/// A token is neither `Clone` nor `Copy`: it is owned by exactly one
/// transaction and is consumed by [`Datastore::commit`] or
/// [`Datastore::rollback`].
#[derive(PartialEq, Eq)]
pub struct TransactionToken(Bytes);

impl TransactionToken {
    /// Wraps the raw bytes handed out by a backend.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TransactionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionToken(")?;
        for b in self.0.iter().take(8) {
            write!(f, "{b:02x}")?;
        }
        if self.0.len() > 8 {
            write!(f, "..")?;
        }
        write!(f, ")")
    }
}

/// Consistency of a read.
#[derive(Debug, Clone, Copy)]
pub enum ReadOptions<'a> {
    /// Read the latest committed state.
    Latest,
    /// Read the snapshot of an open transaction.
    InTransaction(&'a TransactionToken),
}

/// How a commit is applied.
#[derive(Debug)]
pub enum CommitMode {
    /// Apply atomically and close the transaction.
    Transactional(TransactionToken),
    /// Apply without a transaction; each mutation is still all-or-nothing
    /// as a batch.
    NonTransactional,
}

/// Result of a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupResult {
    /// Entities found, in request order.
    pub found: Vec<Entity>,
    /// Keys that have no entity.
    pub missing: Vec<Key>,
}

/// Result of a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitResult {
    /// One entry per mutation: the key written, with allocated ids filled in.
    pub keys: Vec<Key>,
}

/// A transactional key-value document store.
///
/// Every call blocks until the backend answers. Implementations report
/// faults as [`crate::StoreError`] with the variant matching the RPC.
///
/// # Implementors
///
/// - `MemoryDatastore` and `FileDatastore` in `docstore_storage`
/// - `RestDatastore` in `docstore_client`
pub trait Datastore: Send + Sync {
    /// Starts a transaction whose reads observe a snapshot taken now.
    fn begin_transaction(&self) -> StoreResult<TransactionToken>;

    /// Looks up entities by key.
    fn lookup(&self, read: ReadOptions<'_>, keys: &[Key]) -> StoreResult<LookupResult>;

    /// Runs a kind query. Results are ordered by key.
    fn run_query(&self, read: ReadOptions<'_>, query: &Query) -> StoreResult<Vec<Entity>>;

    /// Applies mutations.
    ///
    /// In transactional mode the token is consumed whether or not the commit
    /// succeeds, and either every mutation is applied or none is.
    fn commit(&self, mode: CommitMode, mutations: Vec<Mutation>) -> StoreResult<CommitResult>;

    /// Abandons a transaction without applying anything.
    fn rollback(&self, token: TransactionToken) -> StoreResult<()>;
}

impl<D: Datastore + ?Sized> Datastore for &D {
    fn begin_transaction(&self) -> StoreResult<TransactionToken> {
        (**self).begin_transaction()
    }

    fn lookup(&self, read: ReadOptions<'_>, keys: &[Key]) -> StoreResult<LookupResult> {
        (**self).lookup(read, keys)
    }

    fn run_query(&self, read: ReadOptions<'_>, query: &Query) -> StoreResult<Vec<Entity>> {
        (**self).run_query(read, query)
    }

    fn commit(&self, mode: CommitMode, mutations: Vec<Mutation>) -> StoreResult<CommitResult> {
        (**self).commit(mode, mutations)
    }

    fn rollback(&self, token: TransactionToken) -> StoreResult<()> {
        (**self).rollback(token)
    }
}

impl<D: Datastore + ?Sized> Datastore for Box<D> {
    fn begin_transaction(&self) -> StoreResult<TransactionToken> {
        (**self).begin_transaction()
    }

    fn lookup(&self, read: ReadOptions<'_>, keys: &[Key]) -> StoreResult<LookupResult> {
        (**self).lookup(read, keys)
    }

    fn run_query(&self, read: ReadOptions<'_>, query: &Query) -> StoreResult<Vec<Entity>> {
        (**self).run_query(read, query)
    }

    fn commit(&self, mode: CommitMode, mutations: Vec<Mutation>) -> StoreResult<CommitResult> {
        (**self).commit(mode, mutations)
    }

    fn rollback(&self, token: TransactionToken) -> StoreResult<()> {
        (**self).rollback(token)
    }
}

impl<D: Datastore + ?Sized> Datastore for Arc<D> {
    fn begin_transaction(&self) -> StoreResult<TransactionToken> {
        (**self).begin_transaction()
    }

    fn lookup(&self, read: ReadOptions<'_>, keys: &[Key]) -> StoreResult<LookupResult> {
        (**self).lookup(read, keys)
    }

    fn run_query(&self, read: ReadOptions<'_>, query: &Query) -> StoreResult<Vec<Entity>> {
        (**self).run_query(read, query)
    }

    fn commit(&self, mode: CommitMode, mutations: Vec<Mutation>) -> StoreResult<CommitResult> {
        (**self).commit(mode, mutations)
    }

    fn rollback(&self, token: TransactionToken) -> StoreResult<()> {
        (**self).rollback(token)
    }
}
