//! Session-scoped storage areas
//!
//! A [`StorageArea`] is a plain string-to-string store that lives as long as
//! the session that owns it. [`CacheStore`](crate::CacheStore) layers entry
//! stamping and TTL checks on top; the storage area knows nothing about them.

use moka::sync::Cache;

use crate::CacheError;

/// Raw key/value storage shared by every loader of a session
pub trait StorageArea: Send + Sync + 'static {
    /// Read the raw value stored under `key`
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

/// In-memory storage area backed by a Moka cache.
///
/// Entries never expire here; once `capacity` is reached, least recently
/// used entries are dropped, which readers observe as misses.
#[derive(Clone)]
pub struct MemoryStorage {
    items: Cache<String, String>,
    max_entry_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new(capacity: u64) -> Self {
        Self {
            items: Cache::builder().max_capacity(capacity).build(),
            max_entry_bytes: None,
        }
    }

    /// Reject values larger than `bytes` with [`CacheError::QuotaExceeded`]
    pub fn with_max_entry_bytes(mut self, bytes: usize) -> Self {
        self.max_entry_bytes = Some(bytes);
        self
    }

    /// Approximate number of stored entries
    pub fn len(&self) -> u64 {
        self.items.run_pending_tasks();
        self.items.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(crate::CacheConfig::default().storage_capacity)
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.items.entry_count())
            .field("max_entry_bytes", &self.max_entry_bytes)
            .finish()
    }
}

impl StorageArea for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.items.get(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if let Some(limit) = self.max_entry_bytes
            && value.len() > limit
        {
            return Err(CacheError::QuotaExceeded {
                key: key.to_owned(),
            });
        }
        self.items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
