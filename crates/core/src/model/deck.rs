use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::DeckId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("Deck name cannot be empty")]
    EmptyName,
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// A named collection of flashcards.
///
/// The name is always stored trimmed and is never empty. Names need not be
/// unique across a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DeckRecord", into = "DeckRecord")]
pub struct Deck {
    id: DeckId,
    name: String,
    created_at: DateTime<Utc>,
}

impl Deck {
    /// Creates a new Deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::EmptyName` if name is empty or whitespace-only.
    pub fn new(
        id: DeckId,
        name: impl AsRef<str>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        Ok(Self {
            id,
            name: validated_name(name.as_ref())?,
            created_at,
        })
    }

    /// Replaces the deck name, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::EmptyName` and leaves the deck untouched if the new
    /// name trims to nothing.
    pub fn rename(&mut self, name: &str) -> Result<String, DeckError> {
        let name = validated_name(name)?;
        Ok(std::mem::replace(&mut self.name, name))
    }

    /// Gives the deck a different identity, keeping name and timestamp.
    #[must_use]
    pub fn with_id(mut self, id: DeckId) -> Self {
        self.id = id;
        self
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &DeckId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn validated_name(raw: &str) -> Result<String, DeckError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DeckError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

//
// ─── WIRE SHAPE ────────────────────────────────────────────────────────────────
//

/// Serialized shape of a deck. Decoding goes through `Deck::new` so stored or
/// imported data can never produce an unnamed deck.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeckRecord {
    id: DeckId,
    name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}

impl TryFrom<DeckRecord> for Deck {
    type Error = DeckError;

    fn try_from(record: DeckRecord) -> Result<Self, Self::Error> {
        Deck::new(record.id, record.name, record.created_at)
    }
}

impl From<Deck> for DeckRecord {
    fn from(deck: Deck) -> Self {
        Self {
            id: deck.id,
            name: deck.name,
            created_at: deck.created_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn deck_new_rejects_empty_name() {
        let err = Deck::new(DeckId::new("deck-1"), "   ", fixed_now()).unwrap_err();
        assert_eq!(err, DeckError::EmptyName);
    }

    #[test]
    fn deck_trims_name() {
        let deck = Deck::new(DeckId::new("deck-1"), "  Spanish  ", fixed_now()).unwrap();
        assert_eq!(deck.name(), "Spanish");
    }

    #[test]
    fn rename_returns_previous_name() {
        let mut deck = Deck::new(DeckId::new("deck-1"), "French", fixed_now()).unwrap();
        let old = deck.rename(" French B2 ").unwrap();
        assert_eq!(old, "French");
        assert_eq!(deck.name(), "French B2");
    }

    #[test]
    fn rename_to_blank_keeps_name() {
        let mut deck = Deck::new(DeckId::new("deck-1"), "French", fixed_now()).unwrap();
        assert_eq!(deck.rename("\t"), Err(DeckError::EmptyName));
        assert_eq!(deck.name(), "French");
    }

    #[test]
    fn decodes_from_camel_case_millis() {
        let json = r#"{"id":"deck-sample-1","name":"Spanish Basics","createdAt":1700000000000,"color":"primary"}"#;
        let deck: Deck = serde_json::from_str(json).unwrap();
        assert_eq!(deck.id(), &DeckId::new("deck-sample-1"));
        assert_eq!(deck.created_at(), fixed_now());
    }

    #[test]
    fn decoding_rejects_blank_name() {
        let json = r#"{"id":"deck-1","name":"  ","createdAt":0}"#;
        assert!(serde_json::from_str::<Deck>(json).is_err());
    }
}
