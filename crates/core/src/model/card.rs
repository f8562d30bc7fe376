use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CardId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("Card front cannot be empty")]
    EmptyFront,
}

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// A front/back text pair. Cards are owned by exactly one deck through the
/// collection's `cards_by_deck_id` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CardRecord", into = "CardRecord")]
pub struct Card {
    id: CardId,
    front: String,
    back: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Card {
    /// Creates a card from raw user input. Both sides are trimmed.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyFront` if the front trims to nothing. The back
    /// may be empty.
    pub fn new(
        id: CardId,
        front: &str,
        back: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        let front = front.trim();
        if front.is_empty() {
            return Err(CardError::EmptyFront);
        }
        Ok(Self {
            id,
            front: front.to_owned(),
            back: back.trim().to_owned(),
            created_at,
            updated_at: None,
        })
    }

    /// Applies an edit where a blank side means "keep the current value".
    ///
    /// This differs from `Card::new`, where a blank front is rejected: an edit
    /// form submitted with an emptied field leaves that field as it was.
    pub fn apply_edit(&mut self, front: &str, back: &str, now: DateTime<Utc>) {
        let front = front.trim();
        let back = back.trim();
        if !front.is_empty() {
            front.clone_into(&mut self.front);
        }
        if !back.is_empty() {
            back.clone_into(&mut self.back);
        }
        self.updated_at = Some(now);
    }

    /// Gives the card a different identity, keeping its content.
    #[must_use]
    pub fn with_id(mut self, id: CardId) -> Self {
        self.id = id;
        self
    }

    /// Case-insensitive substring test against both sides.
    ///
    /// `needle` must already be lowercased.
    #[must_use]
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.front.to_lowercase().contains(needle) || self.back.to_lowercase().contains(needle)
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &CardId {
        &self.id
    }

    #[must_use]
    pub fn front(&self) -> &str {
        &self.front
    }

    #[must_use]
    pub fn back(&self) -> &str {
        &self.back
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

//
// ─── WIRE SHAPE ────────────────────────────────────────────────────────────────
//

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardRecord {
    id: CardId,
    front: String,
    #[serde(default)]
    back: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<CardRecord> for Card {
    type Error = CardError;

    fn try_from(record: CardRecord) -> Result<Self, Self::Error> {
        let mut card = Card::new(record.id, &record.front, &record.back, record.created_at)?;
        card.updated_at = record.updated_at;
        Ok(card)
    }
}

impl From<Card> for CardRecord {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            front: card.front,
            back: card.back,
            created_at: card.created_at,
            updated_at: card.updated_at,
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
    use chrono::Duration;

    fn card(front: &str, back: &str) -> Card {
        Card::new(CardId::new("card-1"), front, back, fixed_now()).unwrap()
    }

    #[test]
    fn card_fails_if_front_empty() {
        let err = Card::new(CardId::new("card-1"), "   ", "ok", fixed_now()).unwrap_err();
        assert_eq!(err, CardError::EmptyFront);
    }

    #[test]
    fn card_allows_empty_back() {
        let card = card(" Hola ", "  ");
        assert_eq!(card.front(), "Hola");
        assert_eq!(card.back(), "");
        assert_eq!(card.updated_at(), None);
    }

    #[test]
    fn blank_edit_keeps_existing_sides() {
        let mut card = card("X", "Y");
        let later = fixed_now() + Duration::minutes(5);
        card.apply_edit("", "  ", later);
        assert_eq!(card.front(), "X");
        assert_eq!(card.back(), "Y");
        assert_eq!(card.updated_at(), Some(later));
    }

    #[test]
    fn edit_replaces_non_blank_sides() {
        let mut card = card("X", "Y");
        card.apply_edit(" Z ", "", fixed_now());
        assert_eq!(card.front(), "Z");
        assert_eq!(card.back(), "Y");
    }

    #[test]
    fn matching_is_case_insensitive_on_both_sides() {
        let card = card("Hola", "Hello");
        assert!(card.matches_lowercase("hol"));
        assert!(card.matches_lowercase("ello"));
        assert!(!card.matches_lowercase("adiós"));
    }

    #[test]
    fn decoding_tolerates_missing_back_and_updated_at() {
        let json = r#"{"id":"card-1","front":"Sí","createdAt":1700000000000}"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.back(), "");
        assert_eq!(card.updated_at(), None);
    }

    #[test]
    fn decoding_rejects_blank_front() {
        let json = r#"{"id":"card-1","front":" ","back":"x","createdAt":0}"#;
        assert!(serde_json::from_str::<Card>(json).is_err());
    }
}
