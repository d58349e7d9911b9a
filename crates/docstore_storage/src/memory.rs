//! In-process multi-version datastore.

use crate::error::StorageResult;
use docstore_core::{
    Code, CommitMode, CommitResult, Datastore, Entity, Key, LookupResult, Method, Mutation, Query,
    ReadOptions, StoreError, StoreResult, TransactionToken,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};
use uuid::Uuid;

const EXPIRED_TRANSACTION: &str = "The referenced transaction has expired or is no longer valid.";
const CONTENTION: &str = "too much contention on these datastore entities. please try again.";

/// One committed version of a key. `None` marks a deletion.
#[derive(Debug, Clone)]
struct Revision {
    version: u64,
    entity: Option<Entity>,
}

/// Bookkeeping for an open transaction.
#[derive(Debug)]
struct TxnState {
    snapshot: u64,
    reads: BTreeSet<Key>,
}

#[derive(Debug, Default)]
struct State {
    /// Revisions per key, oldest first.
    revisions: BTreeMap<Key, Vec<Revision>>,
    /// Last committed version.
    version: u64,
    /// Next id handed to an incomplete key.
    next_id: i64,
    /// Open transactions by token bytes.
    transactions: HashMap<Vec<u8>, TxnState>,
    /// Keys holding revisions that a later prune may drop.
    stale: BTreeSet<Key>,
}

impl State {
    fn read_at(&self, key: &Key, snapshot: u64) -> Option<&Entity> {
        self.revisions
            .get(key)?
            .iter()
            .rev()
            .find(|r| r.version <= snapshot)
            .and_then(|r| r.entity.as_ref())
    }

    fn latest_version(&self, key: &Key) -> Option<u64> {
        self.revisions.get(key)?.last().map(|r| r.version)
    }

    fn exists(&self, key: &Key) -> bool {
        self.read_at(key, self.version).is_some()
    }

    fn allocate_id(&mut self, key: &Key) -> i64 {
        loop {
            self.next_id += 1;
            let mut candidate = key.clone();
            candidate.complete_with(self.next_id);
            if !self.revisions.contains_key(&candidate) {
                return self.next_id;
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        let entities = self
            .revisions
            .keys()
            .filter_map(|k| self.read_at(k, self.version).cloned())
            .collect();
        Snapshot {
            entities,
            last_allocated_id: self.next_id,
        }
    }

    fn push_revision(&mut self, key: Key, revision: Revision) {
        let revisions = self.revisions.entry(key.clone()).or_default();
        let deleted = revision.entity.is_none();
        revisions.push(revision);
        if deleted || revisions.len() > 1 {
            self.stale.insert(key);
        }
    }

    /// Undoes the revisions a commit wrote at versions after `version`.
    fn revert(&mut self, version: u64, next_id: i64, keys: &[Key]) {
        for key in keys {
            if let Some(revisions) = self.revisions.get_mut(key) {
                if revisions.last().is_some_and(|r| r.version > version) {
                    revisions.pop();
                }
                if revisions.is_empty() {
                    self.revisions.remove(key);
                }
            }
        }
        self.version = version;
        self.next_id = next_id;
    }

    /// Drops revisions no open transaction can observe.
    ///
    /// Only keys written since they were last settled are visited.
    fn prune(&mut self) {
        let horizon = self
            .transactions
            .values()
            .map(|t| t.snapshot)
            .min()
            .unwrap_or(self.version);

        let revisions = &mut self.revisions;
        self.stale.retain(|key| {
            let Some(versions) = revisions.get_mut(key) else {
                return false;
            };
            // Keep the newest revision visible at the horizon and everything after it.
            let visible = versions
                .iter()
                .rposition(|r| r.version <= horizon)
                .unwrap_or(0);
            versions.drain(..visible);
            if versions.len() == 1 && versions[0].entity.is_none() {
                revisions.remove(key);
                return false;
            }
            versions.len() > 1
        });
    }
}

/// Call counters of a [`MemoryDatastore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatastoreStats {
    /// `begin_transaction` calls.
    pub begins: u64,
    /// `lookup` calls.
    pub lookups: u64,
    /// `run_query` calls.
    pub queries: u64,
    /// `commit` calls.
    pub commits: u64,
    /// `rollback` calls.
    pub rollbacks: u64,
}

#[derive(Debug, Default)]
struct Counters {
    begins: AtomicU64,
    lookups: AtomicU64,
    queries: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

/// Point-in-time content of a store, as written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Live entities, ordered by key.
    pub entities: Vec<Entity>,
    /// Last id allocated to an incomplete key.
    pub last_allocated_id: i64,
}

/// An in-memory transactional datastore.
///
/// This backend mirrors the hosted store's semantics and is suitable for:
/// - Unit and integration tests
/// - Local runs that need no network access
///
/// # Semantics
///
/// - Every key keeps a list of committed revisions; a transaction reads the
///   revision visible at the version current when it began.
/// - Commits are optimistic: if any key read or written by the transaction
///   changed after its snapshot, the commit fails with [`Code::Aborted`]
///   and nothing is applied.
/// - `Insert` of an existing key fails with [`Code::AlreadyExists`];
///   `Update` of a missing key fails with [`Code::NotFound`].
/// - Incomplete keys receive sequential numeric ids.
///
/// # Thread Safety
///
/// All state sits behind one mutex; the store can be shared across threads.
///
/// # Example
///
/// ```rust
/// use docstore_core::{get_or_create, Entity, Key};
/// use docstore_storage::MemoryDatastore;
///
/// let store = MemoryDatastore::new();
/// let key = Key::name("Trivia", "hgtg");
/// let default = || Entity::unkeyed().with_property("answer", 42i64);
/// let entity = get_or_create(&store, &key, default).unwrap();
/// assert_eq!(entity.integer("answer").unwrap(), 42);
/// assert_eq!(store.entity_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    state: Mutex<State>,
    counters: Counters,
}

impl MemoryDatastore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given snapshot as its first version.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            state.next_id = snapshot.last_allocated_id;
            if !snapshot.entities.is_empty() {
                state.version = 1;
            }
            for entity in snapshot.entities {
                if let Some(key) = entity.key().cloned() {
                    state.revisions.insert(
                        key,
                        vec![Revision {
                            version: 1,
                            entity: Some(entity),
                        }],
                    );
                }
            }
        }
        store
    }

    /// Returns the latest committed content.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().snapshot()
    }

    /// Returns the latest committed entity for `key`.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<Entity> {
        let state = self.state.lock();
        state.read_at(key, state.version).cloned()
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        let state = self.state.lock();
        state
            .revisions
            .keys()
            .filter(|k| state.exists(k))
            .count()
    }

    /// Returns the number of open transactions.
    #[must_use]
    pub fn open_transactions(&self) -> usize {
        self.state.lock().transactions.len()
    }

    /// Returns the last committed version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// Returns call counters.
    #[must_use]
    pub fn stats(&self) -> DatastoreStats {
        DatastoreStats {
            begins: self.counters.begins.load(Ordering::Relaxed),
            lookups: self.counters.lookups.load(Ordering::Relaxed),
            queries: self.counters.queries.load(Ordering::Relaxed),
            commits: self.counters.commits.load(Ordering::Relaxed),
            rollbacks: self.counters.rollbacks.load(Ordering::Relaxed),
        }
    }

    /// Resolves the snapshot version of a read, recording it in its transaction.
    fn read_version(
        state: &mut State,
        method: Method,
        read: ReadOptions<'_>,
        observed: impl IntoIterator<Item = Key>,
    ) -> StoreResult<u64> {
        match read {
            ReadOptions::Latest => Ok(state.version),
            ReadOptions::InTransaction(token) => {
                let txn = state.transactions.get_mut(token.as_bytes()).ok_or_else(|| {
                    StoreError::new(method, Code::InvalidArgument, EXPIRED_TRANSACTION)
                })?;
                txn.reads.extend(observed);
                Ok(txn.snapshot)
            }
        }
    }

    fn validate_key(method: Method, key: Option<&Key>, must_be_complete: bool) -> StoreResult<()> {
        match key {
            None => Err(StoreError::new(
                method,
                Code::InvalidArgument,
                "entity is missing a key",
            )),
            Some(k) if k.is_empty() => Err(StoreError::new(
                method,
                Code::InvalidArgument,
                "key path must not be empty",
            )),
            Some(k) if must_be_complete && !k.is_complete() => Err(StoreError::new(
                method,
                Code::InvalidArgument,
                format!("key {k} is incomplete"),
            )),
            Some(_) => Ok(()),
        }
    }

    fn apply(
        state: &mut State,
        snapshot: Option<u64>,
        reads: &BTreeSet<Key>,
        mutations: Vec<Mutation>,
    ) -> StoreResult<CommitResult> {
        // Validate everything before touching state.
        let mut targets = HashSet::new();
        for mutation in &mutations {
            let complete = matches!(mutation, Mutation::Update(_) | Mutation::Delete(_));
            Self::validate_key(Method::Commit, mutation.key(), complete)?;
            if let Some(key) = mutation.key().filter(|k| k.is_complete()) {
                if !targets.insert(key.clone()) {
                    return Err(StoreError::commit_failed(
                        Code::InvalidArgument,
                        format!("a commit cannot contain multiple mutations of {key}"),
                    ));
                }
            }
        }

        if let Some(snapshot) = snapshot {
            let conflict = reads
                .iter()
                .chain(targets.iter())
                .any(|k| state.latest_version(k).is_some_and(|v| v > snapshot));
            if conflict {
                return Err(StoreError::commit_failed(Code::Aborted, CONTENTION));
            }
        }

        for mutation in &mutations {
            match mutation {
                Mutation::Insert(e) => {
                    if let Some(key) = e.key().filter(|k| k.is_complete()) {
                        if state.exists(key) {
                            return Err(StoreError::commit_failed(
                                Code::AlreadyExists,
                                format!("entity already exists: {key}"),
                            ));
                        }
                    }
                }
                Mutation::Update(e) => {
                    if let Some(key) = e.key() {
                        if !state.exists(key) {
                            return Err(StoreError::commit_failed(
                                Code::NotFound,
                                format!("no entity to update: {key}"),
                            ));
                        }
                    }
                }
                Mutation::Upsert(_) | Mutation::Delete(_) => {}
            }
        }

        if mutations.is_empty() {
            return Ok(CommitResult::default());
        }

        state.version += 1;
        let version = state.version;
        let mut keys = Vec::with_capacity(mutations.len());

        for mutation in mutations {
            let (key, entity) = match mutation {
                Mutation::Insert(mut e) | Mutation::Update(mut e) | Mutation::Upsert(mut e) => {
                    let mut key = e.key().cloned().unwrap_or_else(|| Key::from_path(Vec::new()));
                    if !key.is_complete() {
                        let id = state.allocate_id(&key);
                        key.complete_with(id);
                        e.set_key(key.clone());
                    }
                    (key, Some(e))
                }
                Mutation::Delete(key) => (key, None),
            };
            trace!(%key, version, deleted = entity.is_none(), "revision written");
            state.push_revision(key.clone(), Revision { version, entity });
            keys.push(key);
        }

        Ok(CommitResult { keys })
    }

    /// Commits, then hands the resulting content to `persist` while the
    /// store is still locked. If `persist` fails the commit is undone and
    /// reported as [`Code::Internal`].
    pub(crate) fn commit_persisted(
        &self,
        mode: CommitMode,
        mutations: Vec<Mutation>,
        persist: &dyn Fn(&Snapshot) -> StorageResult<()>,
    ) -> StoreResult<CommitResult> {
        self.commit_inner(mode, mutations, Some(persist))
    }

    fn commit_inner(
        &self,
        mode: CommitMode,
        mutations: Vec<Mutation>,
        persist: Option<&dyn Fn(&Snapshot) -> StorageResult<()>>,
    ) -> StoreResult<CommitResult> {
        self.counters.commits.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        let (version, next_id) = (state.version, state.next_id);

        let mut result = match mode {
            CommitMode::Transactional(token) => {
                let txn = state.transactions.remove(token.as_bytes());
                match txn {
                    Some(txn) => {
                        Self::apply(&mut state, Some(txn.snapshot), &txn.reads, mutations)
                    }
                    None => Err(StoreError::commit_failed(
                        Code::InvalidArgument,
                        EXPIRED_TRANSACTION,
                    )),
                }
            }
            CommitMode::NonTransactional => {
                Self::apply(&mut state, None, &BTreeSet::new(), mutations)
            }
        };

        if let Some(persist) = persist {
            let failed = match &result {
                Ok(written) if !written.keys.is_empty() => persist(&state.snapshot())
                    .err()
                    .map(|e| (e, written.keys.clone())),
                _ => None,
            };
            if let Some((e, keys)) = failed {
                warn!(error = %e, "persisting commit failed, reverting");
                state.revert(version, next_id, &keys);
                result = Err(StoreError::commit_failed(
                    Code::Internal,
                    format!("persisting snapshot: {e}"),
                ));
            }
        }

        state.prune();
        if let Ok(r) = &result {
            debug!(version = state.version, written = r.keys.len(), "commit applied");
        }
        result
    }

    #[cfg(test)]
    fn stale_keys(&self) -> usize {
        self.state.lock().stale.len()
    }
}

impl Datastore for MemoryDatastore {
    fn begin_transaction(&self) -> StoreResult<TransactionToken> {
        self.counters.begins.fetch_add(1, Ordering::Relaxed);
        let token = Uuid::new_v4().into_bytes().to_vec();
        let mut state = self.state.lock();
        let snapshot = state.version;
        state.transactions.insert(
            token.clone(),
            TxnState {
                snapshot,
                reads: BTreeSet::new(),
            },
        );
        debug!(snapshot, "transaction opened");
        Ok(TransactionToken::new(token))
    }

    fn lookup(&self, read: ReadOptions<'_>, keys: &[Key]) -> StoreResult<LookupResult> {
        self.counters.lookups.fetch_add(1, Ordering::Relaxed);
        for key in keys {
            Self::validate_key(Method::Lookup, Some(key), true)?;
        }

        let mut state = self.state.lock();
        let snapshot = Self::read_version(&mut state, Method::Lookup, read, keys.iter().cloned())?;

        let mut result = LookupResult::default();
        for key in keys {
            match state.read_at(key, snapshot) {
                Some(entity) => result.found.push(entity.clone()),
                None => result.missing.push(key.clone()),
            }
        }
        Ok(result)
    }

    fn run_query(&self, read: ReadOptions<'_>, query: &Query) -> StoreResult<Vec<Entity>> {
        self.counters.queries.fetch_add(1, Ordering::Relaxed);
        if query.kind.is_empty() {
            return Err(StoreError::query_failed(
                Code::InvalidArgument,
                "query kind must not be empty",
            ));
        }

        let mut state = self.state.lock();
        let snapshot = Self::read_version(&mut state, Method::RunQuery, read, std::iter::empty())?;

        let limit = query.limit.unwrap_or(usize::MAX);
        let results: Vec<Entity> = state
            .revisions
            .keys()
            .filter_map(|k| state.read_at(k, snapshot))
            .filter(|e| query.matches(e))
            .take(limit)
            .cloned()
            .collect();

        if let ReadOptions::InTransaction(token) = read {
            if let Some(txn) = state.transactions.get_mut(token.as_bytes()) {
                txn.reads
                    .extend(results.iter().filter_map(|e| e.key().cloned()));
            }
        }
        Ok(results)
    }

    fn commit(&self, mode: CommitMode, mutations: Vec<Mutation>) -> StoreResult<CommitResult> {
        self.commit_inner(mode, mutations, None)
    }

    fn rollback(&self, token: TransactionToken) -> StoreResult<()> {
        self.counters.rollbacks.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        if state.transactions.remove(token.as_bytes()).is_none() {
            return Err(StoreError::rollback_failed(
                Code::InvalidArgument,
                EXPIRED_TRANSACTION,
            ));
        }
        state.prune();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_core::Filter;

    fn trivia_key() -> Key {
        Key::name("Trivia", "hgtg")
    }

    fn trivia() -> Entity {
        Entity::new(trivia_key())
            .with_property("question", "Meaning of Life?")
            .with_property("answer", 42i64)
    }

    #[test]
    fn insert_then_lookup() {
        let store = MemoryDatastore::new();
        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Insert(trivia())])
            .unwrap();

        let result = store.lookup(ReadOptions::Latest, &[trivia_key()]).unwrap();
        assert_eq!(result.found, vec![trivia()]);
        assert!(result.missing.is_empty());
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn missing_keys_are_reported() {
        let store = MemoryDatastore::new();
        let result = store.lookup(ReadOptions::Latest, &[trivia_key()]).unwrap();
        assert!(result.found.is_empty());
        assert_eq!(result.missing, vec![trivia_key()]);
    }

    #[test]
    fn transaction_reads_its_snapshot() {
        let store = MemoryDatastore::new();
        let token = store.begin_transaction().unwrap();

        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Insert(trivia())])
            .unwrap();

        let result = store
            .lookup(ReadOptions::InTransaction(&token), &[trivia_key()])
            .unwrap();
        assert!(result.found.is_empty());
        store.rollback(token).unwrap();
    }

    #[test]
    fn insert_of_existing_key_fails_whole_commit() {
        let store = MemoryDatastore::new();
        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Insert(trivia())])
            .unwrap();

        let other = Entity::new(Key::name("Trivia", "other")).with_property("answer", 1i64);
        let err = store
            .commit(
                CommitMode::NonTransactional,
                vec![Mutation::Insert(other), Mutation::Insert(trivia())],
            )
            .unwrap_err();

        assert_eq!(err.code(), Code::AlreadyExists);
        assert!(store.get(&Key::name("Trivia", "other")).is_none());
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn update_requires_existing_entity() {
        let store = MemoryDatastore::new();
        let err = store
            .commit(CommitMode::NonTransactional, vec![Mutation::Update(trivia())])
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[test]
    fn incomplete_keys_get_sequential_ids() {
        let store = MemoryDatastore::new();
        let result = store
            .commit(
                CommitMode::NonTransactional,
                vec![
                    Mutation::Insert(Entity::new(Key::incomplete("books"))),
                    Mutation::Upsert(Entity::new(Key::incomplete("books"))),
                ],
            )
            .unwrap();
        assert_eq!(result.keys, vec![Key::id("books", 1), Key::id("books", 2)]);
        assert_eq!(store.get(&Key::id("books", 2)).unwrap().key(), Some(&Key::id("books", 2)));
    }

    #[test]
    fn allocation_skips_taken_ids() {
        let store = MemoryDatastore::new();
        store
            .commit(
                CommitMode::NonTransactional,
                vec![Mutation::Insert(Entity::new(Key::id("books", 1)))],
            )
            .unwrap();
        let result = store
            .commit(
                CommitMode::NonTransactional,
                vec![Mutation::Insert(Entity::new(Key::incomplete("books")))],
            )
            .unwrap();
        assert_eq!(result.keys, vec![Key::id("books", 2)]);
    }

    #[test]
    fn duplicate_mutations_are_rejected() {
        let store = MemoryDatastore::new();
        let err = store
            .commit(
                CommitMode::NonTransactional,
                vec![Mutation::Upsert(trivia()), Mutation::Delete(trivia_key())],
            )
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[test]
    fn concurrent_writer_aborts_transaction() {
        let store = MemoryDatastore::new();
        let token = store.begin_transaction().unwrap();
        store
            .lookup(ReadOptions::InTransaction(&token), &[trivia_key()])
            .unwrap();

        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Upsert(trivia())])
            .unwrap();

        let err = store
            .commit(
                CommitMode::Transactional(token),
                vec![Mutation::Upsert(trivia().with_property("answer", 43i64))],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::CommitFailed { .. }));
        assert_eq!(err.code(), Code::Aborted);
        assert_eq!(store.get(&trivia_key()).unwrap().integer("answer").unwrap(), 42);
        assert_eq!(store.open_transactions(), 0);
    }

    #[test]
    fn token_is_single_use() {
        let store = MemoryDatastore::new();
        let token = store.begin_transaction().unwrap();
        let copy = TransactionToken::new(token.as_bytes().to_vec());
        store
            .commit(CommitMode::Transactional(token), Vec::new())
            .unwrap();

        let err = store
            .lookup(ReadOptions::InTransaction(&copy), &[trivia_key()])
            .unwrap_err();
        assert!(matches!(err, StoreError::LookupFailed { .. }));
        assert_eq!(err.code(), Code::InvalidArgument);

        let err = store.rollback(copy).unwrap_err();
        assert!(matches!(err, StoreError::RollbackFailed { .. }));
    }

    #[test]
    fn empty_key_is_invalid_argument() {
        let store = MemoryDatastore::new();
        let err = store
            .lookup(ReadOptions::Latest, &[Key::from_path(Vec::new())])
            .unwrap_err();
        assert!(matches!(err, StoreError::LookupFailed { .. }));
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[test]
    fn delete_then_reinsert() {
        let store = MemoryDatastore::new();
        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Insert(trivia())])
            .unwrap();
        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Delete(trivia_key())])
            .unwrap();
        assert_eq!(store.entity_count(), 0);
        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Insert(trivia())])
            .unwrap();
        assert_eq!(store.entity_count(), 1);
    }

    #[test]
    fn old_revisions_survive_while_a_snapshot_needs_them() {
        let store = MemoryDatastore::new();
        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Insert(trivia())])
            .unwrap();
        let token = store.begin_transaction().unwrap();
        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Delete(trivia_key())])
            .unwrap();

        let result = store
            .lookup(ReadOptions::InTransaction(&token), &[trivia_key()])
            .unwrap();
        assert_eq!(result.found, vec![trivia()]);
        store.rollback(token).unwrap();
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn prune_settles_touched_keys() {
        let store = MemoryDatastore::new();
        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Insert(trivia())])
            .unwrap();
        assert_eq!(store.stale_keys(), 0);

        let token = store.begin_transaction().unwrap();
        for answer in [43i64, 44] {
            store
                .commit(
                    CommitMode::NonTransactional,
                    vec![Mutation::Upsert(trivia().with_property("answer", answer))],
                )
                .unwrap();
        }
        assert_eq!(store.stale_keys(), 1);

        store.rollback(token).unwrap();
        assert_eq!(store.stale_keys(), 0);
        assert_eq!(store.get(&trivia_key()).unwrap().integer("answer").unwrap(), 44);

        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Delete(trivia_key())])
            .unwrap();
        assert_eq!(store.stale_keys(), 0);
        assert!(store.state.lock().revisions.is_empty());
    }

    #[test]
    fn failed_persist_reverts_commit() {
        let store = MemoryDatastore::new();
        store
            .commit(CommitMode::NonTransactional, vec![Mutation::Insert(trivia())])
            .unwrap();
        let refuse = |_: &Snapshot| -> StorageResult<()> {
            Err(std::io::Error::other("disk full").into())
        };

        let err = store
            .commit_persisted(
                CommitMode::NonTransactional,
                vec![
                    Mutation::Upsert(trivia().with_property("answer", 43i64)),
                    Mutation::Insert(Entity::new(Key::incomplete("books"))),
                ],
                &refuse,
            )
            .unwrap_err();

        assert!(matches!(err, StoreError::CommitFailed { .. }));
        assert_eq!(err.code(), Code::Internal);
        assert!(err.message().contains("disk full"));
        assert_eq!(store.version(), 1);
        assert_eq!(store.entity_count(), 1);
        assert_eq!(store.get(&trivia_key()).unwrap().integer("answer").unwrap(), 42);
        assert_eq!(store.stale_keys(), 0);

        let next = store
            .commit(
                CommitMode::NonTransactional,
                vec![Mutation::Insert(Entity::new(Key::incomplete("books")))],
            )
            .unwrap();
        assert_eq!(next.keys, vec![Key::id("books", 1)]);
    }

    #[test]
    fn query_filters_and_limits() {
        let store = MemoryDatastore::new();
        let books: Vec<Mutation> = (1..=5)
            .map(|i| {
                Mutation::Insert(
                    Entity::new(Key::id("books", i))
                        .with_property("author", if i % 2 == 0 { "A" } else { "B" })
                        .with_property("year", 1970 + i),
                )
            })
            .collect();
        store.commit(CommitMode::NonTransactional, books).unwrap();

        let by_a = store
            .run_query(
                ReadOptions::Latest,
                &Query::kind("books").filter(Filter::eq("author", "A")),
            )
            .unwrap();
        assert_eq!(by_a.len(), 2);

        let limited = store
            .run_query(ReadOptions::Latest, &Query::kind("books").limit(3))
            .unwrap();
        assert_eq!(limited.len(), 3);
        assert_eq!(limited[0].key(), Some(&Key::id("books", 1)));
    }

    #[test]
    fn snapshot_roundtrip() {
        let store = MemoryDatastore::new();
        store
            .commit(
                CommitMode::NonTransactional,
                vec![
                    Mutation::Insert(trivia()),
                    Mutation::Insert(Entity::new(Key::incomplete("books"))),
                ],
            )
            .unwrap();

        let restored = MemoryDatastore::from_snapshot(store.snapshot());
        assert_eq!(restored.snapshot(), store.snapshot());
        let next = restored
            .commit(
                CommitMode::NonTransactional,
                vec![Mutation::Insert(Entity::new(Key::incomplete("books")))],
            )
            .unwrap();
        assert_eq!(next.keys, vec![Key::id("books", 2)]);
    }

    #[test]
    fn stats_count_calls() {
        let store = MemoryDatastore::new();
        let token = store.begin_transaction().unwrap();
        store
            .lookup(ReadOptions::InTransaction(&token), &[trivia_key()])
            .unwrap();
        store.rollback(token).unwrap();

        assert_eq!(
            store.stats(),
            DatastoreStats {
                begins: 1,
                lookups: 1,
                queries: 0,
                commits: 0,
                rollbacks: 1,
            }
        );
    }
}
