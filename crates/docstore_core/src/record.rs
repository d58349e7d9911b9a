//! Typed records mapped onto entities.

use crate::error::DecodeError;
use crate::model::{Entity, Key};

/// Trait for types stored as entities of a single kind.
///
/// Implementors must provide:
/// - `KIND`: the entity kind every record of this type is stored under
/// - `key()`: the record's key, possibly incomplete for new records
/// - `to_entity()` / `from_entity()`: the property mapping
///
/// # Example
///
/// ```rust,ignore
/// struct Note { id: Option<i64>, text: String }
///
/// impl Record for Note {
///     const KIND: &'static str = "Note";
///
///     fn key(&self) -> Key {
///         self.id.map_or_else(|| Key::incomplete(Self::KIND), |id| Key::id(Self::KIND, id))
///     }
///
///     fn to_entity(&self) -> Entity {
///         Entity::new(self.key()).with_property("text", self.text.as_str())
///     }
///
///     fn from_entity(entity: &Entity) -> Result<Self, DecodeError> {
///         let key = check_kind::<Self>(entity)?;
///         Ok(Note { id: key.numeric_id(), text: entity.string("text")?.to_string() })
///     }
/// }
/// ```
pub trait Record: Sized {
    /// Entity kind for this record type.
    const KIND: &'static str;

    /// Returns the key of this record.
    fn key(&self) -> Key;

    /// Encodes the record as an entity.
    fn to_entity(&self) -> Entity;

    /// Decodes a record from an entity.
    fn from_entity(entity: &Entity) -> Result<Self, DecodeError>;

    /// Records the key the backend stored this record under.
    ///
    /// Called after a save so records with allocated ids can pick them up.
    fn assign_key(&mut self, _key: &Key) {}
}

/// Returns the entity key after checking it belongs to `R::KIND`.
pub fn check_kind<R: Record>(entity: &Entity) -> Result<&Key, DecodeError> {
    let key = entity.key().ok_or(DecodeError::MissingKey)?;
    match key.kind() {
        Some(kind) if kind == R::KIND => Ok(key),
        other => Err(DecodeError::KindMismatch {
            expected: R::KIND,
            actual: other.unwrap_or_default().to_string(),
        }),
    }
}
