use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Opaque durable key-value store.
///
/// Values are raw bytes; callers own the encoding. A missing key loads as
/// `Ok(None)`, and removing a missing key is not an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::QuotaExceeded` when the backend is full, or other
    /// storage errors.
    async fn save(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory store for testing and ephemeral sessions.
///
/// Clones share the same entries, so a test can keep a handle and inspect what
/// the persistence layer wrote.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    quota: Option<usize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the total number of stored value bytes.
    #[must_use]
    pub fn with_quota(mut self, max_bytes: usize) -> Self {
        self.quota = Some(max_bytes);
        self
    }

    /// Makes every subsequent call fail with a connection error (or succeed
    /// again when `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns true if a value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|guard| guard.contains_key(key))
            .unwrap_or(false)
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.check_available()?;
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.check_available()?;
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if let Some(quota) = self.quota {
            let others: usize = guard
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + value.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        guard.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Wraps the configured backend behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            kv: Arc::new(InMemoryStore::new()),
        }
    }

    #[must_use]
    pub fn from_store(store: impl KeyValueStore + 'static) -> Self {
        Self {
            kv: Arc::new(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes() {
        let store = InMemoryStore::new();
        assert!(store.load("k").await.unwrap().is_none());

        store.save("k", b"hello").await.unwrap();
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some(&b"hello"[..]));

        store.remove("k").await.unwrap();
        assert!(!store.contains("k"));
        store.remove("k").await.unwrap();
    }

    #[tokio::test]
    async fn quota_counts_other_keys_but_not_the_replaced_value() {
        let store = InMemoryStore::new().with_quota(8);
        store.save("a", b"1234").await.unwrap();
        store.save("a", b"12345678").await.unwrap();
        let err = store.save("b", b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.load("k").await,
            Err(StorageError::Connection(_))
        ));
        assert!(store.save("k", b"v").await.is_err());
        store.set_unavailable(false);
        assert!(store.save("k", b"v").await.is_ok());
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = InMemoryStore::new();
        let storage = Storage::from_store(store.clone());
        storage.kv.save("k", b"v").await.unwrap();
        assert!(store.contains("k"));
    }
}
