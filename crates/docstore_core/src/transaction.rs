//! Scoped transactions.

use crate::backend::{
    CommitMode, CommitResult, Datastore, LookupResult, ReadOptions, TransactionToken,
};
use crate::error::StoreResult;
use crate::model::{Entity, Key, Mutation, Query};
use tracing::{debug, warn};

/// An open transaction bound to one datastore.
///
/// The guard owns the transaction token. Reads go through the snapshot taken
/// at [`Transaction::begin`]. The token is released on every exit path:
/// [`commit`](Transaction::commit) and [`rollback`](Transaction::rollback)
/// consume it, and dropping an unfinished guard rolls back on a best-effort
/// basis.
///
/// # Example
///
/// ```rust,ignore
/// let txn = Transaction::begin(&store)?;
/// let found = txn.lookup(&[key])?;
/// txn.commit(mutations)?;
/// ```
pub struct Transaction<'a, D: Datastore + ?Sized> {
    store: &'a D,
    token: Option<TransactionToken>,
}

impl<'a, D: Datastore + ?Sized> Transaction<'a, D> {
    /// Begins a transaction.
    pub fn begin(store: &'a D) -> StoreResult<Self> {
        let token = store.begin_transaction()?;
        debug!(?token, "transaction started");
        Ok(Self {
            store,
            token: Some(token),
        })
    }

    fn token(&self) -> &TransactionToken {
        // Only commit/rollback take the token, and both consume the guard.
        self.token
            .as_ref()
            .expect("transaction token present until commit or rollback")
    }

    /// Looks up keys in the transaction snapshot.
    pub fn lookup(&self, keys: &[Key]) -> StoreResult<LookupResult> {
        self.store
            .lookup(ReadOptions::InTransaction(self.token()), keys)
    }

    /// Runs a query in the transaction snapshot.
    pub fn run_query(&self, query: &Query) -> StoreResult<Vec<Entity>> {
        self.store
            .run_query(ReadOptions::InTransaction(self.token()), query)
    }

    /// Commits the staged mutations.
    ///
    /// The transaction is closed whatever the outcome.
    pub fn commit(mut self, mutations: Vec<Mutation>) -> StoreResult<CommitResult> {
        let token = self.take_token();
        let count = mutations.len();
        let result = self
            .store
            .commit(CommitMode::Transactional(token), mutations)?;
        debug!(mutations = count, "transaction committed");
        Ok(result)
    }

    /// Rolls the transaction back.
    pub fn rollback(mut self) -> StoreResult<()> {
        let token = self.take_token();
        self.store.rollback(token)
    }

    fn take_token(&mut self) -> TransactionToken {
        self.token
            .take()
            .expect("transaction token present until commit or rollback")
    }
}

impl<D: Datastore + ?Sized> Drop for Transaction<'_, D> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            debug!(?token, "rolling back unfinished transaction");
            if let Err(err) = self.store.rollback(token) {
                warn!(error = %err, "rollback of unfinished transaction failed");
            }
        }
    }
}
