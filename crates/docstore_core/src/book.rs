//! The book record.

use crate::error::DecodeError;
use crate::model::{Entity, Key};
use crate::record::{check_kind, Record};
use std::fmt;

/// Kind under which books are stored.
pub const BOOK_KIND: &str = "books";

/// A book with a backend-allocated numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Numeric id, `None` until the book has been saved.
    pub id: Option<i64>,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Publication year.
    pub year: i64,
}

impl Book {
    /// Creates an unsaved book.
    pub fn new(title: impl Into<String>, author: impl Into<String>, year: i64) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            year,
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Book{{id={id}")?,
            None => write!(f, "Book{{id=null")?,
        }
        write!(
            f,
            ", title='{}', author='{}', year={}}}",
            self.title, self.author, self.year
        )
    }
}

impl Record for Book {
    const KIND: &'static str = BOOK_KIND;

    fn key(&self) -> Key {
        match self.id {
            Some(id) => Key::id(BOOK_KIND, id),
            None => Key::incomplete(BOOK_KIND),
        }
    }

    fn to_entity(&self) -> Entity {
        Entity::new(self.key())
            .with_property("title", self.title.as_str())
            .with_property("author", self.author.as_str())
            .with_property("year", self.year)
    }

    fn from_entity(entity: &Entity) -> Result<Self, DecodeError> {
        let key = check_kind::<Self>(entity)?;
        Ok(Self {
            id: key.numeric_id(),
            title: entity.string("title")?.to_string(),
            author: entity.string("author")?.to_string(),
            year: entity.integer("year")?,
        })
    }

    fn assign_key(&mut self, key: &Key) {
        if let Some(id) = key.numeric_id() {
            self.id = Some(id);
        }
    }
}
