use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a Deck.
///
/// Ids are opaque strings. Locally created decks use the `deck-<n>` shape so
/// the numeric suffix can drive the collection's id counter.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckId(String);

impl DeckId {
    pub const PREFIX: &'static str = "deck";

    /// Wraps an existing identifier verbatim.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Builds the canonical id for the given counter value.
    #[must_use]
    pub fn from_counter(n: u64) -> Self {
        Self(format!("{}-{n}", Self::PREFIX))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing decimal digits of the id, if any.
    #[must_use]
    pub fn numeric_suffix(&self) -> Option<u64> {
        numeric_suffix(&self.0)
    }
}

/// Unique identifier for a Card.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub const PREFIX: &'static str = "card";

    /// Wraps an existing identifier verbatim.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Builds the canonical id for the given counter value.
    #[must_use]
    pub fn from_counter(n: u64) -> Self {
        Self(format!("{}-{n}", Self::PREFIX))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing decimal digits of the id, if any.
    #[must_use]
    pub fn numeric_suffix(&self) -> Option<u64> {
        numeric_suffix(&self.0)
    }
}

fn numeric_suffix(raw: &str) -> Option<u64> {
    let digits_start = raw
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(idx, _)| idx)?;
    raw[digits_start..].parse().ok()
}

impl fmt::Debug for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeckId({})", self.0)
    }
}

impl fmt::Debug for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CardId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_ids_use_prefix() {
        assert_eq!(DeckId::from_counter(3).as_str(), "deck-3");
        assert_eq!(CardId::from_counter(12).as_str(), "card-12");
    }

    #[test]
    fn numeric_suffix_reads_trailing_digits() {
        assert_eq!(DeckId::new("deck-42").numeric_suffix(), Some(42));
        assert_eq!(DeckId::new("deck-sample-1").numeric_suffix(), Some(1));
        assert_eq!(CardId::new("card-007").numeric_suffix(), Some(7));
    }

    #[test]
    fn numeric_suffix_is_none_without_digits() {
        assert_eq!(DeckId::new("spanish").numeric_suffix(), None);
        assert_eq!(CardId::new("").numeric_suffix(), None);
        assert_eq!(CardId::new("card-1x").numeric_suffix(), None);
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&CardId::new("card-5")).unwrap();
        assert_eq!(json, "\"card-5\"");
        let back: CardId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CardId::new("card-5"));
    }
}
