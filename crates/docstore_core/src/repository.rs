//! Record repositories.

use crate::backend::{CommitMode, Datastore, ReadOptions};
use crate::book::Book;
use crate::error::{CoreError, CoreResult};
use crate::model::{Filter, Mutation, Query};
use crate::record::Record;
use std::marker::PhantomData;
use tracing::debug;

/// Create / read-by-filter / delete-all access to records of one type.
///
/// Every call is a single non-transactional RPC (or one query followed by
/// one commit for [`delete_all`](Repository::delete_all)).
pub struct Repository<'a, T: Record, D: Datastore + ?Sized> {
    store: &'a D,
    _marker: PhantomData<T>,
}

impl<'a, T: Record, D: Datastore + ?Sized> Repository<'a, T, D> {
    /// Creates a repository over `store`.
    pub fn new(store: &'a D) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Saves a record (create or replace) and returns it with its key
    /// assigned.
    pub fn save(&self, mut record: T) -> CoreResult<T> {
        let result = self.store.commit(
            CommitMode::NonTransactional,
            vec![Mutation::Upsert(record.to_entity())],
        )?;
        if let Some(key) = result.keys.first() {
            debug!(%key, "record saved");
            record.assign_key(key);
        }
        Ok(record)
    }

    /// Returns every record of this type, ordered by key.
    pub fn find_all(&self) -> CoreResult<Vec<T>> {
        self.run(Query::kind(T::KIND))
    }

    /// Returns the records matching `filter`, ordered by key.
    pub fn find_where(&self, filter: Filter) -> CoreResult<Vec<T>> {
        self.run(Query::kind(T::KIND).filter(filter))
    }

    /// Deletes every record of this type. Returns the number deleted.
    pub fn delete_all(&self) -> CoreResult<usize> {
        let entities = self
            .store
            .run_query(ReadOptions::Latest, &Query::kind(T::KIND))?;
        let mutations: Vec<Mutation> = entities
            .into_iter()
            .filter_map(|e| e.key().cloned())
            .map(Mutation::Delete)
            .collect();
        let count = mutations.len();
        if count > 0 {
            self.store
                .commit(CommitMode::NonTransactional, mutations)?;
        }
        debug!(kind = T::KIND, count, "records deleted");
        Ok(count)
    }

    fn run(&self, query: Query) -> CoreResult<Vec<T>> {
        let entities = self.store.run_query(ReadOptions::Latest, &query)?;
        entities
            .iter()
            .map(|e| T::from_entity(e).map_err(CoreError::from))
            .collect()
    }
}

impl<D: Datastore + ?Sized> Repository<'_, Book, D> {
    /// Books written by `author`.
    pub fn find_by_author(&self, author: &str) -> CoreResult<Vec<Book>> {
        self.find_where(Filter::eq("author", author))
    }

    /// Books published strictly after `year`.
    pub fn find_by_year_greater_than(&self, year: i64) -> CoreResult<Vec<Book>> {
        self.find_where(Filter::gt("year", year))
    }

    /// Books written by `author` in `year`.
    pub fn find_by_author_and_year(&self, author: &str, year: i64) -> CoreResult<Vec<Book>> {
        self.find_where(Filter::and(vec![
            Filter::eq("author", author),
            Filter::eq("year", year),
        ]))
    }
}

/// Repository of [`Book`] records.
pub type BookRepository<'a, D> = Repository<'a, Book, D>;

