//! The trivia record: one fixed question and its answer.

use crate::backend::Datastore;
use crate::error::{CoreResult, DecodeError};
use crate::model::{Entity, Key};
use crate::ops::get_or_create;
use crate::record::{check_kind, Record};

/// Kind of the trivia entity.
pub const TRIVIA_KIND: &str = "Trivia";

/// Name of the single trivia entity.
pub const TRIVIA_NAME: &str = "hgtg";

/// Printed when the reader knows the answer.
pub const CORRECT_ANSWER_MESSAGE: &str =
    "fascinating, extraordinary and, when you think hard about it, completely obvious.";

/// Printed for any other answer.
pub const WRONG_ANSWER_MESSAGE: &str = "Don't Panic!";

/// A question with an integer answer, stored as `Trivia/hgtg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    /// UTF-8 question text.
    pub question: String,
    /// The answer.
    pub answer: i64,
}

impl Default for Trivia {
    fn default() -> Self {
        Self {
            question: "Meaning of Life?".to_string(),
            answer: 42,
        }
    }
}

impl Trivia {
    /// The fixed key of the trivia entity.
    #[must_use]
    pub fn fixed_key() -> Key {
        Key::name(TRIVIA_KIND, TRIVIA_NAME)
    }

    /// Loads the trivia entity, inserting the default one if it is absent.
    ///
    /// See [`get_or_create`] for the transactional contract.
    pub fn load_or_create<D: Datastore + ?Sized>(store: &D) -> CoreResult<Self> {
        let entity = get_or_create(store, &Self::fixed_key(), || {
            Trivia::default().to_entity()
        })?;
        Ok(Self::from_entity(&entity)?)
    }

    /// Returns true if `input` is the decimal form of the answer.
    ///
    /// A trailing line terminator is ignored; nothing else is normalised.
    #[must_use]
    pub fn check_answer(&self, input: &str) -> bool {
        let input = input.trim_end_matches(['\n', '\r']);
        input == self.answer.to_string()
    }

    /// Returns the message to print for `input`.
    #[must_use]
    pub fn verdict(&self, input: &str) -> &'static str {
        if self.check_answer(input) {
            CORRECT_ANSWER_MESSAGE
        } else {
            WRONG_ANSWER_MESSAGE
        }
    }
}

impl Record for Trivia {
    const KIND: &'static str = TRIVIA_KIND;

    fn key(&self) -> Key {
        Self::fixed_key()
    }

    fn to_entity(&self) -> Entity {
        Entity::new(self.key())
            .with_property("question", self.question.as_str())
            .with_property("answer", self.answer)
    }

    fn from_entity(entity: &Entity) -> Result<Self, DecodeError> {
        check_kind::<Self>(entity)?;
        Ok(Self {
            question: entity.string("question")?.to_string(),
            answer: entity.integer("answer")?,
        })
    }
}
