//! A scripted datastore that records every call and fails on demand.

#![allow(dead_code)]

use docstore_core::{
    Code, CommitMode, CommitResult, Datastore, Entity, Key, LookupResult, Method, Mutation, Query,
    ReadOptions, StoreError, StoreResult, TransactionToken,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Begin,
    Lookup {
        transactional: bool,
        keys: Vec<Key>,
    },
    RunQuery {
        transactional: bool,
        query: Query,
    },
    Commit {
        transactional: bool,
        mutations: Vec<Mutation>,
    },
    Rollback,
}

/// Single-version store with call recording and injected failures.
#[derive(Default)]
pub struct ScriptedDatastore {
    calls: Mutex<Vec<Call>>,
    entities: Mutex<BTreeMap<Key, Entity>>,
    failures: Mutex<HashMap<Method, Code>>,
    extra_matches: Mutex<Vec<Entity>>,
    next_id: Mutex<i64>,
    next_token: Mutex<u8>,
}

impl ScriptedDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(self, entity: Entity) -> Self {
        let key = entity.key().cloned().expect("seeded entity needs a key");
        self.entities.lock().insert(key, entity);
        self
    }

    /// Makes every call of `method` fail with `code`.
    pub fn fail(&self, method: Method, code: Code) {
        self.failures.lock().insert(method, code);
    }

    /// Appends `entity` to every lookup's found list.
    pub fn add_extra_match(&self, entity: Entity) {
        self.extra_matches.lock().push(entity);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn entity(&self, key: &Key) -> Option<Entity> {
        self.entities.lock().get(key).cloned()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.lock().len()
    }

    /// All mutations staged across every recorded commit.
    pub fn committed_mutations(&self) -> Vec<Mutation> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Commit { mutations, .. } => Some(mutations),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn record(&self, call: Call, method: Method) -> StoreResult<()> {
        self.calls.lock().push(call);
        match self.failures.lock().get(&method) {
            Some(code) => Err(StoreError::new(method, *code, "injected failure")),
            None => Ok(()),
        }
    }
}

impl Datastore for ScriptedDatastore {
    fn begin_transaction(&self) -> StoreResult<TransactionToken> {
        self.record(Call::Begin, Method::BeginTransaction)?;
        let mut next = self.next_token.lock();
        *next += 1;
        Ok(TransactionToken::new(vec![*next]))
    }

    fn lookup(&self, read: ReadOptions<'_>, keys: &[Key]) -> StoreResult<LookupResult> {
        self.record(
            Call::Lookup {
                transactional: matches!(read, ReadOptions::InTransaction(_)),
                keys: keys.to_vec(),
            },
            Method::Lookup,
        )?;
        let entities = self.entities.lock();
        let mut result = LookupResult::default();
        for key in keys {
            match entities.get(key) {
                Some(e) => result.found.push(e.clone()),
                None => result.missing.push(key.clone()),
            }
        }
        if !result.found.is_empty() {
            result.found.extend(self.extra_matches.lock().iter().cloned());
        }
        Ok(result)
    }

    fn run_query(&self, read: ReadOptions<'_>, query: &Query) -> StoreResult<Vec<Entity>> {
        self.record(
            Call::RunQuery {
                transactional: matches!(read, ReadOptions::InTransaction(_)),
                query: query.clone(),
            },
            Method::RunQuery,
        )?;
        Ok(self
            .entities
            .lock()
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    fn commit(&self, mode: CommitMode, mutations: Vec<Mutation>) -> StoreResult<CommitResult> {
        self.record(
            Call::Commit {
                transactional: matches!(mode, CommitMode::Transactional(_)),
                mutations: mutations.clone(),
            },
            Method::Commit,
        )?;
        let mut entities = self.entities.lock();
        let mut keys = Vec::new();
        for mutation in mutations {
            match mutation {
                Mutation::Insert(mut e) | Mutation::Update(mut e) | Mutation::Upsert(mut e) => {
                    let key = e.key_mut().expect("mutation entity has a key");
                    if !key.is_complete() {
                        let mut next = self.next_id.lock();
                        *next += 1;
                        key.complete_with(*next);
                    }
                    let key = key.clone();
                    entities.insert(key.clone(), e);
                    keys.push(key);
                }
                Mutation::Delete(key) => {
                    entities.remove(&key);
                    keys.push(key);
                }
            }
        }
        Ok(CommitResult { keys })
    }

    fn rollback(&self, _token: TransactionToken) -> StoreResult<()> {
        self.record(Call::Rollback, Method::Rollback)
    }
}
