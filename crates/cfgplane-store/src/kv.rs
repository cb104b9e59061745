//! Key-value backend contract and the in-memory implementation

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// A stored key with its revision bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: String,
    pub value: Vec<u8>,
    /// Revision at which the key was created
    pub create_revision: u64,
    /// Revision of the last write to the key
    pub mod_revision: u64,
}

/// Backend failures
#[derive(Debug, Error)]
pub enum KvError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<KvError> for cfgplane_types::Error {
    fn from(err: KvError) -> Self {
        cfgplane_types::Error::Db(err.to_string())
    }
}

/// Result type for backend operations
pub type KvResult<T> = Result<T, KvError>;

/// Contract of the backing key-value database.
///
/// Every revision is global and strictly increasing. The conditional writes
/// are single indivisible operations, never a read followed by a write.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Read one key
    async fn get(&self, key: &str) -> KvResult<Option<KvEntry>>;

    /// Read every key starting with `prefix`, in key order
    async fn get_prefix(&self, prefix: &str) -> KvResult<Vec<KvEntry>>;

    /// Unconditional write; returns the new revision
    async fn put(&self, key: &str, value: Vec<u8>) -> KvResult<u64>;

    /// Write only if the key does not exist. Returns false when it does.
    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> KvResult<bool>;

    /// Write only if the key's `mod_revision` still equals `expected`.
    /// Returns false when the key changed or disappeared.
    async fn put_if_revision(&self, key: &str, expected: u64, value: Vec<u8>) -> KvResult<bool>;

    /// Remove a key, returning what was stored
    async fn delete(&self, key: &str) -> KvResult<Option<KvEntry>>;
}

#[derive(Debug, Default)]
struct KvState {
    entries: BTreeMap<String, KvEntry>,
    revision: u64,
}

impl KvState {
    fn write(&mut self, key: &str, value: Vec<u8>) -> u64 {
        self.revision += 1;
        let revision = self.revision;
        let create_revision = self
            .entries
            .get(key)
            .map(|e| e.create_revision)
            .unwrap_or(revision);
        self.entries.insert(
            key.to_string(),
            KvEntry {
                key: key.to_string(),
                value,
                create_revision,
                mod_revision: revision,
            },
        );
        revision
    }
}

/// In-memory backend for development and testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryKv {
    state: Arc<RwLock<KvState>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvBackend for InMemoryKv {
    async fn get(&self, key: &str) -> KvResult<Option<KvEntry>> {
        let state = self.state.read().await;
        Ok(state.entries.get(key).cloned())
    }

    async fn get_prefix(&self, prefix: &str) -> KvResult<Vec<KvEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> KvResult<u64> {
        let mut state = self.state.write().await;
        Ok(state.write(key, value))
    }

    async fn put_if_absent(&self, key: &str, value: Vec<u8>) -> KvResult<bool> {
        let mut state = self.state.write().await;
        if state.entries.contains_key(key) {
            return Ok(false);
        }
        state.write(key, value);
        Ok(true)
    }

    async fn put_if_revision(&self, key: &str, expected: u64, value: Vec<u8>) -> KvResult<bool> {
        let mut state = self.state.write().await;
        if state.entries.get(key).map(|e| e.mod_revision) != Some(expected) {
            return Ok(false);
        }
        state.write(key, value);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> KvResult<Option<KvEntry>> {
        let mut state = self.state.write().await;
        let removed = state.entries.remove(key);
        if removed.is_some() {
            state.revision += 1;
        }
        Ok(removed)
    }
}
