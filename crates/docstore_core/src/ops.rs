//! Transactional read-modify-write operations.

use crate::backend::Datastore;
use crate::error::StoreResult;
use crate::model::{Entity, Key, Mutation};
use crate::transaction::Transaction;
use tracing::debug;

/// Returns the entity stored under `key`, creating it if absent.
///
/// Runs in exactly one transaction:
///
/// 1. begin a transaction (`BeginFailed` on error, nothing else attempted);
/// 2. look `key` up in the transaction snapshot (`LookupFailed` on error,
///    no commit attempted);
/// 3. take the first match, or build an entity with `default_factory`,
///    give it `key` and stage it as a single insert;
/// 4. commit (`CommitFailed` on error, including a racing insert of the
///    same key; nothing is retried).
///
/// The returned entity is the one read or built in step 3; it is not
/// re-fetched after the commit.
///
/// `default_factory` is called at most once, and only when the key is
/// absent. `key` must have a non-empty path.
pub fn get_or_create<D, F>(store: &D, key: &Key, default_factory: F) -> StoreResult<Entity>
where
    D: Datastore + ?Sized,
    F: FnOnce() -> Entity,
{
    let txn = Transaction::begin(store)?;
    let result = txn.lookup(std::slice::from_ref(key))?;

    let (entity, mutations) = match result.found.into_iter().next() {
        Some(existing) => {
            debug!(%key, "entity found");
            (existing, Vec::new())
        }
        None => {
            let mut created = default_factory();
            created.set_key(key.clone());
            debug!(%key, "entity missing, staging insert");
            let insert = Mutation::Insert(created.clone());
            (created, vec![insert])
        }
    };

    txn.commit(mutations)?;
    Ok(entity)
}
