//! Import/export file format.
//!
//! ```json
//! {"version": "1.0.0", "exportedAt": "2023-11-14T22:13:20Z",
//!  "decks": [...], "cardsByDeckId": {...}}
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use flashcards_core::model::{Card, Collection, Deck, DeckId};

use crate::error::InterchangeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    pub decks: Vec<Deck>,
    pub cards_by_deck_id: BTreeMap<DeckId, Vec<Card>>,
}

impl ExportPayload {
    /// Snapshot of every deck and card in the collection.
    #[must_use]
    pub fn from_collection(collection: &Collection, version: &str, now: DateTime<Utc>) -> Self {
        Self {
            version: version.to_owned(),
            exported_at: Some(now),
            decks: collection.decks.clone(),
            cards_by_deck_id: collection.cards_by_deck_id.clone(),
        }
    }

    #[must_use]
    pub fn deck_count(&self) -> usize {
        self.decks.len()
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.cards_by_deck_id.values().map(Vec::len).sum()
    }

    /// Question shown before an import is merged.
    #[must_use]
    pub fn confirmation_message(&self) -> String {
        format!(
            "Import {} with {}? This will add to your existing decks.",
            plural(self.deck_count(), "deck"),
            plural(self.card_count(), "card")
        )
    }
}

/// Renders `n` with a noun, pluralized with a trailing `s`.
#[must_use]
pub fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Pretty-printed export of the whole collection.
///
/// # Errors
///
/// Returns `InterchangeError::Json` if serialization fails.
pub fn export(
    collection: &Collection,
    version: &str,
    now: DateTime<Utc>,
) -> Result<String, InterchangeError> {
    let payload = ExportPayload::from_collection(collection, version, now);
    Ok(serde_json::to_string_pretty(&payload)?)
}

/// Parses and validates an import file.
///
/// # Errors
///
/// Returns `InterchangeError::InvalidFormat` unless `decks` is an array,
/// `cardsByDeckId` an object, and every entry decodes to a valid deck or card.
pub fn parse_import(text: &str) -> Result<ExportPayload, InterchangeError> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| InterchangeError::InvalidFormat(e.to_string()))?;

    if !root.get("decks").is_some_and(Value::is_array) {
        return Err(InterchangeError::InvalidFormat("`decks` must be an array".into()));
    }
    if !root.get("cardsByDeckId").is_some_and(Value::is_object) {
        return Err(InterchangeError::InvalidFormat(
            "`cardsByDeckId` must be an object".into(),
        ));
    }

    serde_json::from_value(root).map_err(|e| InterchangeError::InvalidFormat(e.to_string()))
}
