//! Single cached value with TTL and hit accounting

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Type-erased cached value
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// A timestamped value holder
#[derive(Clone)]
pub struct CacheEntry {
    value: CachedValue,
    created_at: Instant,
    ttl: Duration,
    hits: u64,
}

impl CacheEntry {
    pub fn new(value: CachedValue, created_at: Instant, ttl: Duration) -> Self {
        Self {
            value,
            created_at,
            ttl,
            hits: 0,
        }
    }

    /// An entry is expired once strictly more than `ttl` has passed
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    pub fn touch(&mut self) {
        self.hits += 1;
    }

    pub fn value(&self) -> &CachedValue {
        &self.value
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("created_at", &self.created_at)
            .field("ttl", &self.ttl)
            .field("hits", &self.hits)
            .finish_non_exhaustive()
    }
}
