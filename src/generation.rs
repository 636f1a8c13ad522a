//! Generation tokens for discarding superseded responses
//!
//! Every load cycle captures a [`Generation`] when it starts. Starting another
//! cycle or tearing the view down moves the guard past it, and a response is
//! only applied if its generation is still the current one. The underlying
//! request is never cancelled; its result is simply ignored.

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque token identifying one load cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-view epoch counter
#[derive(Debug, Default)]
pub struct GenerationGuard {
    current: AtomicU64,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, invalidating every earlier one
    pub fn mint(&self) -> Generation {
        Generation(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Invalidate the current generation without starting a new cycle
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    /// The most recently minted or invalidated generation
    pub fn current(&self) -> Generation {
        Generation(self.current.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current.load(Ordering::SeqCst) == generation.0
    }
}
