//! dashcache - Read-through view cache for the call-analytics dashboard
//!
//! Every dashboard view follows the same cycle:
//! - Hydrate from the session cache if a fresh entry exists
//! - Always refresh from the analytics service
//! - Commit only the response of the latest cycle, then write it through
//!
//! The crate provides:
//! - A timestamped key-value cache over a pluggable storage area
//! - Deterministic cache keys built from a view's dependency tuple
//! - Generation guards so superseded responses are dropped
//! - Fail-fast fan-out for views that need several requests
//! - Error classification into network and service failures
//! - Ready-made loaders for the dashboard, reports and audio record views

pub mod api;
pub mod classify;
pub mod client;
pub mod clock;
mod config;
pub mod dashboard;
mod error;
pub mod fan_out;
pub mod generation;
pub mod key;
pub mod loader;
pub mod records;
pub mod reports;
pub mod storage;
pub mod store;

pub use classify::{ClassifiedError, NETWORK_ERROR_MESSAGE, classify};
pub use client::{ApiClient, Method, Params, RequestClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, ClientConfig, DEFAULT_TTL};
pub use error::{CacheError, FailureKind, RequestError};
pub use fan_out::join_fail_fast;
pub use generation::{Generation, GenerationGuard};
pub use key::{KeyBuilder, KeyPart, canonical_digest};
pub use loader::{
    Cacheable, Cycle, DataFetcher, Dependencies, KeyFormatter, Loader, Phase, Settled, ViewState,
};
pub use storage::{MemoryStorage, StorageArea};
pub use store::{CacheEntry, CacheStore};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
