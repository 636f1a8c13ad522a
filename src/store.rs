//! TTL-aware cache store
//!
//! Entries are persisted in the storage area as `{"t": <epoch millis>, "v": <value>}`.
//! Freshness is decided when an entry is read: an entry older than the TTL the
//! reader asks for is a miss, and nothing is ever deleted.
//!
//! Reading and writing are best effort. Unparseable entries read as misses and
//! failed writes are logged and dropped, so a broken storage area degrades the
//! cache to "always fetch" instead of failing the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::storage::{MemoryStorage, StorageArea};
use crate::{CacheConfig, CacheError};

/// A stamped cache entry as it is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// Epoch milliseconds at which the entry was written
    #[serde(rename = "t")]
    pub stored_at: i64,
    #[serde(rename = "v")]
    pub value: V,
}

impl<V> CacheEntry<V> {
    /// Whether the entry is still within `ttl` at `now` (epoch millis)
    pub fn is_fresh(&self, now: i64, ttl: Duration) -> bool {
        now.saturating_sub(self.stored_at) <= ttl_millis(ttl)
    }
}

fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

/// Read-through/write-through store shared by every loader of a session
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn StorageArea>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn StorageArea>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Store over a fresh in-memory storage area and the system clock
    pub fn in_memory(config: &CacheConfig) -> Self {
        Self::new(
            Arc::new(MemoryStorage::new(config.storage_capacity)),
            Arc::new(SystemClock),
        )
    }

    /// The underlying storage area
    pub fn storage(&self) -> &Arc<dyn StorageArea> {
        &self.storage
    }

    /// Current time according to the store's clock
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Get the value stored under `key` if it is younger than `ttl`.
    ///
    /// Missing, expired, unparseable and wrongly shaped entries all return `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let raw = match self.storage.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss for key: {}", key);
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for key {} ({}). Treating as miss.", key, e);
                return None;
            }
        };

        let entry = match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Unreadable cache entry for key {}: {}", key, e);
                return None;
            }
        };

        if !entry.is_fresh(self.clock.now_millis(), ttl) {
            debug!("Cache entry expired for key: {}", key);
            return None;
        }

        debug!("Cache hit for key: {}", key);
        Some(entry.value)
    }

    /// Write `value` under `key`, stamped with the current time.
    ///
    /// Failures are logged and swallowed.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_set(key, value) {
            warn!("Cache write failed for key {} ({}). Continuing.", key, e);
        }
    }

    /// Fallible form of [`set`](Self::set)
    pub fn try_set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let entry = CacheEntry {
            stored_at: self.clock.now_millis(),
            value,
        };
        let json = serde_json::to_string(&entry)?;
        self.storage.set_item(key, &json)
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}
