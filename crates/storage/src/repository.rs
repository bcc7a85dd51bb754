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

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key-value persistence for serialized progress records.
///
/// Both operations may fail; callers in the services layer treat failures
/// as non-fatal and keep their in-memory state.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Fetch the bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `bytes` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Delete the value under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory store for tests and prototyping.
///
/// Failures can be injected with [`InMemoryStore::fail_saves`] and
/// [`InMemoryStore::fail_loads`].
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_saves: Arc<AtomicBool>,
    fail_loads: Arc<AtomicBool>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Raw bytes under `key`, bypassing failure injection.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .ok()
            .and_then(|guard| guard.get(key).cloned())
    }

    /// Write raw bytes under `key`, bypassing failure injection.
    pub fn put_raw(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.insert(key.to_string(), bytes.into());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PersistenceStore for InMemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("injected load failure".into()));
        }
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("injected save failure".into()));
        }
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates the progress store behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn PersistenceStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(InMemoryStore::new())
    }

    #[must_use]
    pub fn from_store(store: impl PersistenceStore + 'static) -> Self {
        let progress: Arc<dyn PersistenceStore> = Arc::new(store);
        Self { progress }
    }
}
