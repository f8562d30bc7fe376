//! Versioned envelope around the collection snapshot.
//!
//! Stored shape:
//! `{"schemaVersion": 1, "savedAt": <epoch ms>, "payload": <Collection>}`.
//! Loading never fails: anything unreadable yields the caller's default, and
//! each payload field that does not decode falls back on its own.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use flashcards_core::model::{Card, Collection, Deck, DeckId};
use storage::repository::{KeyValueStore, StorageError};

use crate::error::PersistenceError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    schema_version: u32,
    saved_at: i64,
    payload: &'a Collection,
}

/// Why a stored value was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// The backend could not be read at all.
    Unreadable(String),
    /// The bytes are not valid JSON.
    Corrupt,
    /// Written by a different schema version.
    VersionMismatch { found: Option<u64> },
    /// Valid JSON that is not an envelope.
    InvalidShape,
}

/// How `load` arrived at the collection it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Every field came from storage.
    Stored,
    /// Nothing stored under the key.
    Empty,
    /// The stored value was ignored entirely.
    Discarded(DiscardReason),
    /// The listed payload fields were replaced by the default's.
    Partial(Vec<&'static str>),
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub collection: Collection,
    pub outcome: LoadOutcome,
}

/// Diagnostics about the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageInfo {
    pub exists: bool,
    pub schema_version: Option<u64>,
    pub saved_at: Option<DateTime<Utc>>,
    pub size_bytes: usize,
    pub deck_count: usize,
}

/// Reads and writes the collection envelope through a `KeyValueStore`.
#[derive(Clone)]
pub struct PersistenceAdapter {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    schema_version: u32,
}

impl PersistenceAdapter {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>, schema_version: u32) -> Self {
        Self {
            kv,
            key: key.into(),
            schema_version,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serializes the collection into an envelope and writes it.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Encode` if serialization fails and
    /// `PersistenceError::Storage` if the write fails. When the store reports
    /// its quota exhausted, the stored key is removed (best effort) before the
    /// error is returned.
    pub async fn save(
        &self,
        collection: &Collection,
        now: DateTime<Utc>,
    ) -> Result<usize, PersistenceError> {
        let envelope = Envelope {
            schema_version: self.schema_version,
            saved_at: now.timestamp_millis(),
            payload: collection,
        };
        let bytes = serde_json::to_vec(&envelope)?;

        match self.kv.save(&self.key, &bytes).await {
            Ok(()) => {
                log::debug!("saved {} bytes under {}", bytes.len(), self.key);
                Ok(bytes.len())
            }
            Err(StorageError::QuotaExceeded) => {
                log::warn!("storage quota exceeded while saving {}", self.key);
                match self.kv.remove(&self.key).await {
                    Ok(()) => log::warn!("cleared {} to recover quota", self.key),
                    Err(err) => log::error!("failed to clear {}: {err}", self.key),
                }
                Err(StorageError::QuotaExceeded.into())
            }
            Err(err) => {
                log::warn!("failed to save {}: {err}", self.key);
                Err(err.into())
            }
        }
    }

    /// Reads the stored envelope, falling back to `default` on any failure.
    pub async fn load(&self, default: Collection) -> Loaded {
        let bytes = match self.kv.load(&self.key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Loaded {
                    collection: default,
                    outcome: LoadOutcome::Empty,
                };
            }
            Err(err) => {
                log::warn!("failed to read {}: {err}", self.key);
                return discarded(default, DiscardReason::Unreadable(err.to_string()));
            }
        };

        let root: Value = match serde_json::from_slice(&bytes) {
            Ok(root) => root,
            Err(err) => {
                log::warn!("failed to parse stored state: {err}");
                self.clear_quietly().await;
                return discarded(default, DiscardReason::Corrupt);
            }
        };

        let Some(envelope) = root.as_object() else {
            log::warn!("stored state is not an object");
            self.clear_quietly().await;
            return discarded(default, DiscardReason::InvalidShape);
        };

        let found = envelope.get("schemaVersion").and_then(Value::as_u64);
        if found != Some(u64::from(self.schema_version)) {
            log::warn!(
                "version mismatch: expected {}, got {found:?}",
                self.schema_version
            );
            return discarded(default, DiscardReason::VersionMismatch { found });
        }

        let Some(payload) = envelope.get("payload").and_then(Value::as_object) else {
            log::warn!("invalid data structure");
            self.clear_quietly().await;
            return discarded(default, DiscardReason::InvalidShape);
        };

        let mut fallbacks = Vec::new();
        let Collection {
            decks: default_decks,
            cards_by_deck_id: default_cards,
            active_deck_id: default_active,
            next_deck_id: default_next_deck,
            next_card_id: default_next_card,
        } = default;

        let decks: Vec<Deck> = field(payload, "decks", default_decks, &mut fallbacks);
        let cards_by_deck_id: BTreeMap<DeckId, Vec<Card>> =
            field(payload, "cardsByDeckId", default_cards, &mut fallbacks);
        let active_deck_id: Option<DeckId> =
            field(payload, "activeDeckId", default_active, &mut fallbacks);
        let next_deck_id: u64 = field(payload, "nextDeckId", default_next_deck, &mut fallbacks);
        let next_card_id: u64 = field(payload, "nextCardId", default_next_card, &mut fallbacks);

        let mut collection = Collection {
            decks,
            cards_by_deck_id,
            active_deck_id,
            next_deck_id,
            next_card_id,
        };
        if collection.normalize() {
            log::info!("normalized loaded collection");
        }

        let outcome = if fallbacks.is_empty() {
            log::info!(
                "loaded {} decks with {} cards",
                collection.decks.len(),
                collection.card_count()
            );
            LoadOutcome::Stored
        } else {
            log::warn!("replaced invalid fields with defaults: {fallbacks:?}");
            LoadOutcome::Partial(fallbacks)
        };

        Loaded {
            collection,
            outcome,
        }
    }

    /// Removes the stored value.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Storage` if the backend cannot be written.
    pub async fn clear(&self) -> Result<(), PersistenceError> {
        self.kv.remove(&self.key).await?;
        log::info!("cleared {}", self.key);
        Ok(())
    }

    /// Describes what is currently stored under the key.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Storage` if the backend cannot be read.
    pub async fn info(&self) -> Result<StorageInfo, PersistenceError> {
        let Some(bytes) = self.kv.load(&self.key).await? else {
            return Ok(StorageInfo {
                exists: false,
                schema_version: None,
                saved_at: None,
                size_bytes: 0,
                deck_count: 0,
            });
        };

        let root: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Ok(StorageInfo {
            exists: true,
            schema_version: root.get("schemaVersion").and_then(Value::as_u64),
            saved_at: root
                .get("savedAt")
                .and_then(Value::as_i64)
                .and_then(DateTime::from_timestamp_millis),
            size_bytes: bytes.len(),
            deck_count: root
                .pointer("/payload/decks")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
        })
    }

    async fn clear_quietly(&self) {
        if let Err(err) = self.kv.remove(&self.key).await {
            log::error!("failed to clear corrupted storage: {err}");
        }
    }
}

fn discarded(default: Collection, reason: DiscardReason) -> Loaded {
    Loaded {
        collection: default,
        outcome: LoadOutcome::Discarded(reason),
    }
}

/// Decodes one payload field, or records it and returns the fallback.
fn field<T: DeserializeOwned>(
    payload: &serde_json::Map<String, Value>,
    name: &'static str,
    fallback: T,
    fallbacks: &mut Vec<&'static str>,
) -> T {
    match payload.get(name).map(|v| T::deserialize(v)) {
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            log::warn!("invalid {name}: {err}");
            fallbacks.push(name);
            fallback
        }
        None => {
            fallbacks.push(name);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcards_core::time::fixed_now;
    use storage::repository::InMemoryStore;

    const KEY: &str = "flashcards_app_v1";

    fn adapter(store: &InMemoryStore) -> PersistenceAdapter {
        PersistenceAdapter::new(Arc::new(store.clone()), KEY, 1)
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemoryStore::new();
        let persistence = adapter(&store);
        let snapshot = Collection::sample(fixed_now());

        persistence.save(&snapshot, fixed_now()).await.unwrap();
        let loaded = persistence.load(Collection::empty()).await;

        assert_eq!(loaded.outcome, LoadOutcome::Stored);
        assert_eq!(loaded.collection, snapshot);
    }

    #[tokio::test]
    async fn empty_store_returns_default() {
        let store = InMemoryStore::new();
        let loaded = adapter(&store).load(Collection::sample(fixed_now())).await;
        assert_eq!(loaded.outcome, LoadOutcome::Empty);
        assert_eq!(loaded.collection, Collection::sample(fixed_now()));
    }

    #[tokio::test]
    async fn corrupt_bytes_fall_back_and_clear() {
        let store = InMemoryStore::new();
        store.save(KEY, b"{not json").await.unwrap();

        let loaded = adapter(&store).load(Collection::empty()).await;
        assert_eq!(loaded.outcome, LoadOutcome::Discarded(DiscardReason::Corrupt));
        assert_eq!(loaded.collection, Collection::empty());
        assert!(!store.contains(KEY));
    }

    #[tokio::test]
    async fn version_mismatch_falls_back_without_clearing() {
        let store = InMemoryStore::new();
        store
            .save(KEY, br#"{"schemaVersion":0,"savedAt":0,"payload":{}}"#)
            .await
            .unwrap();

        let loaded = adapter(&store).load(Collection::empty()).await;
        assert_eq!(
            loaded.outcome,
            LoadOutcome::Discarded(DiscardReason::VersionMismatch { found: Some(0) })
        );
        assert!(store.contains(KEY));
    }

    #[tokio::test]
    async fn invalid_field_falls_back_independently() {
        let store = InMemoryStore::new();
        let json = r#"{
            "schemaVersion": 1,
            "savedAt": 1700000000000,
            "payload": {
                "decks": [{"id": "deck-3", "name": "Kept", "createdAt": 1700000000000}],
                "cardsByDeckId": "broken",
                "activeDeckId": "deck-3",
                "nextDeckId": "four",
                "nextCardId": 9
            }
        }"#;
        store.save(KEY, json.as_bytes()).await.unwrap();

        let loaded = adapter(&store).load(Collection::empty()).await;
        assert_eq!(
            loaded.outcome,
            LoadOutcome::Partial(vec!["cardsByDeckId", "nextDeckId"])
        );
        let c = loaded.collection;
        assert_eq!(c.decks.len(), 1);
        assert_eq!(c.decks[0].name(), "Kept");
        assert!(c.cards(&DeckId::new("deck-3")).is_empty());
        assert_eq!(c.active_deck_id, Some(DeckId::new("deck-3")));
        assert_eq!(c.next_deck_id, 4);
        assert_eq!(c.next_card_id, 9);
    }

    #[tokio::test]
    async fn quota_failure_clears_key_and_reports() {
        let store = InMemoryStore::new().with_quota(16);
        store.save(KEY, b"previous").await.unwrap();

        let err = adapter(&store)
            .save(&Collection::sample(fixed_now()), fixed_now())
            .await
            .unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(!store.contains(KEY));
    }

    #[tokio::test]
    async fn info_describes_stored_value() {
        let store = InMemoryStore::new();
        let persistence = adapter(&store);
        assert!(!persistence.info().await.unwrap().exists);

        let written = persistence
            .save(&Collection::sample(fixed_now()), fixed_now())
            .await
            .unwrap();
        let info = persistence.info().await.unwrap();
        assert!(info.exists);
        assert_eq!(info.schema_version, Some(1));
        assert_eq!(info.saved_at, Some(fixed_now()));
        assert_eq!(info.size_bytes, written);
        assert_eq!(info.deck_count, 1);

        persistence.clear().await.unwrap();
        assert!(!store.contains(KEY));
    }
}
