//! Shared error types for the services crate.

use thiserror::Error;

use flashcards_core::model::{CardError, CardId, DeckError, DeckId};
use storage::repository::StorageError;

/// Coarse classification used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty required input. Surfaced as a warning; nothing changes.
    Validation,
    /// Unknown deck or card id. The operation is a silent no-op.
    NotFound,
    /// The durable store could not be read or written.
    Persistence,
}

/// Errors emitted by `StudyStore` mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Card(#[from] CardError),
    #[error("deck not found: {0}")]
    DeckNotFound(DeckId),
    #[error("card not found: {0}")]
    CardNotFound(CardId),
    #[error("No cards to shuffle")]
    NothingToShuffle,
    #[error("No more {0} ids available")]
    IdsExhausted(&'static str),
}

impl StoreError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Deck(_)
            | StoreError::Card(_)
            | StoreError::NothingToShuffle
            | StoreError::IdsExhausted(_) => ErrorKind::Validation,
            StoreError::DeckNotFound(_) | StoreError::CardNotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// Errors emitted by `PersistenceAdapter`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to encode collection: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PersistenceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Persistence
    }

    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, PersistenceError::Storage(StorageError::QuotaExceeded))
    }
}

/// Errors emitted while reading or writing import/export files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InterchangeError {
    #[error("invalid import file: {0}")]
    InvalidFormat(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the binary's commands.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Interchange(#[from] InterchangeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
