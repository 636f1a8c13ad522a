//! Stale-while-revalidate view loader
//!
//! A [`Loader`] drives the data acquisition cycle of one view:
//!
//! 1. `begin` builds the cache key for the view's dependency tuple, mints a
//!    new [`Generation`] and publishes either the cached value (`Hydrated`) or
//!    an empty `Loading` state.
//! 2. `fetch` issues the view's request(s) through its [`DataFetcher`].
//! 3. `settle` applies the result only if the cycle's generation is still
//!    current. Successes are published and written through to the cache;
//!    failures become a notice over hydrated data, or the `Error` state.
//! 4. `teardown` invalidates the current generation so in-flight responses
//!    are dropped.
//!
//! Cached data is never final: a hydrated cycle always refreshes.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::watch;
use tracing::{debug, error};

use crate::classify::{ClassifiedError, classify};
use crate::error::RequestError;
use crate::generation::{Generation, GenerationGuard};
use crate::{CacheConfig, CacheStore};

/// Trait for types that can be cached
pub trait Cacheable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}
impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Trait for dependency tuples; compared by value
pub trait Dependencies: Clone + PartialEq + Debug + Send + Sync + 'static {}
impl<T> Dependencies for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}

/// Trait for fetching a view's data from the upstream service.
///
/// The context type `C` is usually the request client shared by every view
/// (`dyn RequestClient`).
#[async_trait::async_trait]
pub trait DataFetcher<D, V, C: ?Sized>: Send + Sync {
    /// Fetch fresh data for the dependency tuple
    async fn fetch(&self, ctx: &C, deps: &D) -> Result<V, RequestError>;
}

/// Trait for turning a dependency tuple into a cache key
pub trait KeyFormatter<D>: Send + Sync + 'static {
    /// Namespace tag, used to look up the namespace TTL
    fn namespace(&self) -> &'static str;

    /// Build the cache key for `deps`
    fn format_key(&self, deps: &D) -> String;
}

/// Phase of a view's current load cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    /// No cycle has started
    #[default]
    Idle,
    /// Showing cached data while a refresh runs, or after a failed refresh
    Hydrated,
    /// Nothing to show yet
    Loading,
    /// Fresh data committed
    Success,
    /// The cycle failed with nothing cached to fall back on
    Error,
}

/// What a view renders
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<V> {
    pub phase: Phase,
    pub data: Option<V>,
    /// Blocking error, only set in the `Error` phase
    pub error: Option<ClassifiedError>,
    /// Non-blocking error shown over stale data
    pub notice: Option<ClassifiedError>,
    /// A refresh is in flight
    pub refreshing: bool,
    pub generation: Option<Generation>,
}

impl<V> Default for ViewState<V> {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            data: None,
            error: None,
            notice: None,
            refreshing: false,
            generation: None,
        }
    }
}

impl<V> ViewState<V> {
    fn started(generation: Generation, cached: Option<V>) -> Self {
        let phase = if cached.is_some() {
            Phase::Hydrated
        } else {
            Phase::Loading
        };
        Self {
            phase,
            data: cached,
            error: None,
            notice: None,
            refreshing: true,
            generation: Some(generation),
        }
    }

    /// Whether the view should show a blocking loading indicator
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }
}

/// One load cycle, tied to the dependency tuple it was started with
#[derive(Debug)]
pub struct Cycle<D> {
    generation: Generation,
    key: String,
    deps: D,
    hydrated: bool,
}

impl<D> Cycle<D> {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn deps(&self) -> &D {
        &self.deps
    }

    /// Whether the cycle started from cached data
    pub fn hydrated(&self) -> bool {
        self.hydrated
    }
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// Fresh data committed and written through
    Success,
    /// The request failed; see the view state for how it is surfaced
    Failed(ClassifiedError),
    /// The cycle was superseded or torn down; nothing changed
    Discarded,
}

/// Per-view loader
pub struct Loader<D, V, C, F, KF>
where
    D: Dependencies,
    V: Cacheable,
    C: ?Sized + Send + Sync + 'static,
    F: DataFetcher<D, V, C>,
    KF: KeyFormatter<D>,
{
    inner: Arc<LoaderInner<D, V, C>>,
    fetcher: Arc<F>,
    key_formatter: Arc<KF>,
}

struct LoaderInner<D, V, C: ?Sized> {
    store: CacheStore,
    ctx: Arc<C>,
    ttl: Duration,
    guard: GenerationGuard,
    state: watch::Sender<ViewState<V>>,
    last_deps: Mutex<Option<D>>,
}

impl<D, V, C, F, KF> Clone for Loader<D, V, C, F, KF>
where
    D: Dependencies,
    V: Cacheable,
    C: ?Sized + Send + Sync + 'static,
    F: DataFetcher<D, V, C>,
    KF: KeyFormatter<D>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            fetcher: Arc::clone(&self.fetcher),
            key_formatter: Arc::clone(&self.key_formatter),
        }
    }
}

impl<D, V, C, F, KF> Loader<D, V, C, F, KF>
where
    D: Dependencies,
    V: Cacheable,
    C: ?Sized + Send + Sync + 'static,
    F: DataFetcher<D, V, C>,
    KF: KeyFormatter<D>,
{
    /// Create a loader for one view instance
    pub fn new(
        store: CacheStore,
        config: &CacheConfig,
        ctx: Arc<C>,
        fetcher: F,
        key_formatter: KF,
    ) -> Self {
        let ttl = config.ttl_for(key_formatter.namespace());
        let (state, _) = watch::channel(ViewState::default());

        Self {
            inner: Arc::new(LoaderInner {
                store,
                ctx,
                ttl,
                guard: GenerationGuard::new(),
                state,
                last_deps: Mutex::new(None),
            }),
            fetcher: Arc::new(fetcher),
            key_formatter: Arc::new(key_formatter),
        }
    }

    /// TTL applied to this view's namespace
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Snapshot of the current view state
    pub fn state(&self) -> ViewState<V> {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to view state changes
    pub fn subscribe(&self) -> watch::Receiver<ViewState<V>> {
        self.inner.state.subscribe()
    }

    /// Start a cycle for `deps`, publishing cached data if there is any
    pub fn begin(&self, deps: D) -> Cycle<D> {
        let key = self.key_formatter.format_key(&deps);
        let cached: Option<V> = self.inner.store.get(&key, self.inner.ttl);
        let hydrated = cached.is_some();

        *self
            .inner
            .last_deps
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(deps.clone());

        // Minted under the state lock so a settle in progress finishes first
        let mut generation = self.inner.guard.current();
        self.inner.state.send_modify(|state| {
            generation = self.inner.guard.mint();
            *state = ViewState::started(generation, cached);
        });

        debug!(
            "Began cycle {} for key {} ({})",
            generation,
            key,
            if hydrated { "hydrated" } else { "loading" }
        );

        Cycle {
            generation,
            key,
            deps,
            hydrated,
        }
    }

    /// Issue the request(s) of a cycle
    pub async fn fetch(&self, cycle: &Cycle<D>) -> Result<V, RequestError> {
        self.fetcher.fetch(&*self.inner.ctx, &cycle.deps).await
    }

    /// Apply the result of a cycle if it is still current
    pub fn settle(&self, cycle: Cycle<D>, result: Result<V, RequestError>) -> Settled {
        let mut outcome = Settled::Discarded;

        self.inner.state.send_if_modified(|state| {
            if !self.inner.guard.is_current(cycle.generation) {
                return false;
            }

            match result {
                Ok(value) => {
                    self.inner.store.set(&cycle.key, &value);
                    *state = ViewState {
                        phase: Phase::Success,
                        data: Some(value),
                        error: None,
                        notice: None,
                        refreshing: false,
                        generation: Some(cycle.generation),
                    };
                    outcome = Settled::Success;
                }
                Err(e) => {
                    error!("Load failed for key {}: {}", cycle.key, e);
                    let classified = classify(&e);
                    state.refreshing = false;
                    if cycle.hydrated {
                        state.notice = Some(classified.clone());
                    } else {
                        state.phase = Phase::Error;
                        state.data = None;
                        state.error = Some(classified.clone());
                    }
                    outcome = Settled::Failed(classified);
                }
            }
            true
        });

        if outcome == Settled::Discarded {
            debug!(
                "Discarding response for key {} (cycle {} superseded)",
                cycle.key, cycle.generation
            );
        }
        outcome
    }

    /// Run a full cycle for `deps`
    pub async fn load(&self, deps: D) -> Settled {
        let cycle = self.begin(deps);
        let result = self.fetch(&cycle).await;
        self.settle(cycle, result)
    }

    /// Re-run the most recent dependency tuple; `None` if nothing was loaded yet
    pub async fn reload(&self) -> Option<Settled> {
        let deps = self
            .inner
            .last_deps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        Some(self.load(deps).await)
    }

    /// Invalidate the current cycle; in-flight responses become no-ops
    ///
    /// Blocks until a settle that is already committing has finished; once
    /// this returns, no earlier cycle can publish or write through.
    pub fn teardown(&self) {
        self.inner.state.send_if_modified(|_| {
            self.inner.guard.invalidate();
            false
        });
        debug!("Loader torn down");
    }
}
