//! Categorized in-memory metadata cache
//!
//! Every category is an independently bounded LRU keyed by string. Entries
//! carry their own TTL; an expired entry is never returned and is dropped the
//! moment a read observes it. All operations go through one re-entrant lock,
//! so a fetch callback running under [`GlobalCache::memoize`] may read or
//! write the same cache without deadlocking.

mod entry;
mod memoize;

pub use self::entry::{CacheEntry, CachedValue};
pub use self::memoize::Memoized;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ValidationError};
use globset::GlobBuilder;
use log::{debug, info};
use lru::LruCache;
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Well-known category names
pub mod categories {
    pub const OBJECT_METADATA: &str = "object_metadata";
    pub const FIELD_DEFINITIONS: &str = "field_definitions";
    pub const VALIDATION_RULES: &str = "validation_rules";
    pub const APEX_CLASSES: &str = "apex_classes";
    pub const QUERY_RESULTS: &str = "query_results";
    pub const ORG_INFO: &str = "org_info";
    pub const TRIGGER_BODIES: &str = "trigger_bodies";
    pub const DEPENDENCIES: &str = "dependencies";
}

/// Configuration for the global cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries held per category
    pub max_entries_per_category: usize,
    /// TTL for categories without their own entry
    pub default_ttl_secs: u64,
    /// Per-category TTL overrides
    pub category_ttl_secs: BTreeMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let category_ttl_secs = [
            (categories::OBJECT_METADATA, 600),
            (categories::FIELD_DEFINITIONS, 600),
            (categories::VALIDATION_RULES, 300),
            (categories::APEX_CLASSES, 300),
            (categories::QUERY_RESULTS, 60),
            (categories::ORG_INFO, 3600),
        ]
        .into_iter()
        .map(|(name, secs)| (name.to_string(), secs))
        .collect();

        Self {
            max_entries_per_category: 1000,
            default_ttl_secs: 300,
            category_ttl_secs,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_entries_per_category == 0 {
            return Err(ValidationError::invalid_configuration(
                "cache.max_entries_per_category must be greater than 0",
            )
            .into());
        }
        Ok(())
    }

    /// TTL applied when a write does not specify one
    pub fn ttl_for(&self, category: &str) -> Duration {
        let secs = self
            .category_ttl_secs
            .get(category)
            .copied()
            .unwrap_or(self.default_ttl_secs);
        Duration::from_secs(secs)
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub categories: BTreeMap<String, usize>,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Percentage rounded to two decimals
    pub hit_rate_percent: f64,
}

enum Lookup {
    Missing,
    Expired,
    WrongType,
    Live,
    Hit(CachedValue),
}

#[derive(Default)]
struct CacheState {
    categories: HashMap<String, LruCache<String, CacheEntry>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheState {
    fn category_mut(&mut self, category: &str) -> &mut LruCache<String, CacheEntry> {
        self.categories
            .entry(category.to_string())
            .or_insert_with(LruCache::unbounded)
    }

    fn reset_counters(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }
}

/// Thread-safe categorized cache
pub struct GlobalCache {
    state: ReentrantMutex<RefCell<CacheState>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl GlobalCache {
    /// Create a cache with default configuration
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(CacheState::default())),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut CacheState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    fn lookup(
        &self,
        category: &str,
        key: &str,
        accept: impl Fn(&CachedValue) -> bool,
    ) -> Option<CachedValue> {
        let now = self.clock.now();
        let outcome = self.with_state(|state| {
            let outcome = match state.categories.get_mut(category) {
                None => Lookup::Missing,
                Some(cache) => {
                    let status = cache.peek(key).map(|entry| {
                        if entry.is_expired(now) {
                            Lookup::Expired
                        } else if accept(entry.value()) {
                            Lookup::Live
                        } else {
                            Lookup::WrongType
                        }
                    });
                    match status {
                        None => Lookup::Missing,
                        Some(Lookup::Expired) => {
                            cache.pop(key);
                            Lookup::Expired
                        }
                        Some(Lookup::Live) => match cache.get_mut(key) {
                            Some(entry) => {
                                entry.touch();
                                Lookup::Hit(Arc::clone(entry.value()))
                            }
                            None => Lookup::Missing,
                        },
                        Some(other) => other,
                    }
                }
            };
            if matches!(outcome, Lookup::Hit(_)) {
                state.hits += 1;
            } else {
                state.misses += 1;
            }
            outcome
        });

        match outcome {
            Lookup::Hit(value) => {
                debug!("Cache hit: {category}/{key}");
                Some(value)
            }
            Lookup::Expired => {
                debug!("Cache expired: {category}/{key}");
                None
            }
            Lookup::WrongType => {
                debug!("Cache type mismatch: {category}/{key}");
                None
            }
            Lookup::Missing | Lookup::Live => {
                debug!("Cache miss: {category}/{key}");
                None
            }
        }
    }

    /// Fetch a live value without caring about its type
    pub fn get_raw(&self, category: &str, key: &str) -> Option<CachedValue> {
        self.lookup(category, key, |_| true)
    }

    /// Fetch a live value of type `T`
    ///
    /// A stored value of a different type counts as a miss and is left in place.
    pub fn get<T: Any + Send + Sync>(&self, category: &str, key: &str) -> Option<Arc<T>> {
        self.lookup(category, key, |value| value.is::<T>())?
            .downcast::<T>()
            .ok()
    }

    /// Store `value`, using the category TTL when `ttl` is `None`
    pub fn set<T: Any + Send + Sync>(
        &self,
        category: &str,
        key: &str,
        value: T,
        ttl: Option<Duration>,
    ) {
        self.set_shared(category, key, Arc::new(value), ttl);
    }

    /// Store an already shared value
    pub fn set_shared<T: Any + Send + Sync>(
        &self,
        category: &str,
        key: &str,
        value: Arc<T>,
        ttl: Option<Duration>,
    ) {
        let ttl = ttl.unwrap_or_else(|| self.config.ttl_for(category));
        let max = self.config.max_entries_per_category;
        let now = self.clock.now();

        self.with_state(|state| {
            let mut evicted = 0;
            let cache = state.category_mut(category);
            if !cache.contains(key) {
                while cache.len() >= max {
                    match cache.pop_lru() {
                        Some((old_key, _)) => {
                            evicted += 1;
                            debug!("Cache eviction: {category}/{old_key}");
                        }
                        None => break,
                    }
                }
            }
            cache.put(key.to_string(), CacheEntry::new(value, now, ttl));
            state.evictions += evicted;
        });
        debug!("Cache set: {category}/{key} (TTL: {}s)", ttl.as_secs());
    }

    /// Remove one entry, reporting whether it existed
    pub fn delete(&self, category: &str, key: &str) -> bool {
        let removed = self.with_state(|state| {
            state
                .categories
                .get_mut(category)
                .and_then(|cache| cache.pop(key))
                .is_some()
        });
        if removed {
            debug!("Cache delete: {category}/{key}");
        }
        removed
    }

    /// Empty one category, returning how many entries it held
    pub fn clear_category(&self, category: &str) -> usize {
        let count = self.with_state(|state| {
            state.categories.get_mut(category).map_or(0, |cache| {
                let count = cache.len();
                cache.clear();
                count
            })
        });
        if count > 0 {
            info!("Cache cleared: {category} ({count} entries)");
        }
        count
    }

    /// Empty every category and reset the counters
    pub fn clear_all(&self) -> usize {
        let total = self.with_state(|state| {
            let total = state.categories.values().map(LruCache::len).sum();
            state.categories.clear();
            state.reset_counters();
            total
        });
        info!("Cache cleared: all ({total} entries)");
        total
    }

    /// Remove every key in `category` matching the glob `pattern`
    pub fn invalidate_pattern(&self, category: &str, pattern: &str) -> Result<usize> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| ValidationError::invalid_pattern(pattern, &e.to_string()))?
            .compile_matcher();

        let removed = self.with_state(|state| {
            let Some(cache) = state.categories.get_mut(category) else {
                return 0;
            };
            let doomed: Vec<String> = cache
                .iter()
                .filter(|(key, _)| matcher.is_match(key.as_str()))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &doomed {
                cache.pop(key);
            }
            doomed.len()
        });
        info!("Cache invalidated: {category}/{pattern} ({removed} entries)");
        Ok(removed)
    }

    /// Drop everything cached about `object` after it changed in the org
    pub fn invalidate_object(&self, object: &str) -> Result<usize> {
        let _guard = self.state.lock();
        let mut removed = 0;
        for category in [
            categories::OBJECT_METADATA,
            categories::FIELD_DEFINITIONS,
            categories::VALIDATION_RULES,
        ] {
            if self.delete(category, object) {
                removed += 1;
            }
        }
        let pattern = format!("*{}*", globset_escape(object));
        removed += self.invalidate_pattern(categories::QUERY_RESULTS, &pattern)?;
        info!("Invalidated cache for object: {object}");
        Ok(removed)
    }

    /// Sweep all categories for expired entries
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = self.with_state(|state| {
            let mut removed = 0;
            for cache in state.categories.values_mut() {
                let expired: Vec<String> = cache
                    .iter()
                    .filter(|(_, entry)| entry.is_expired(now))
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in &expired {
                    cache.pop(key);
                }
                removed += expired.len();
            }
            removed
        });
        if removed > 0 {
            info!("Cache cleanup: removed {removed} expired entries");
        }
        removed
    }

    pub fn get_stats(&self) -> CacheStats {
        self.with_state(|state| {
            let categories: BTreeMap<String, usize> = state
                .categories
                .iter()
                .map(|(name, cache)| (name.clone(), cache.len()))
                .collect();
            let lookups = state.hits + state.misses;
            let hit_rate = if lookups > 0 {
                state.hits as f64 / lookups as f64 * 100.0
            } else {
                0.0
            };

            CacheStats {
                total_entries: categories.values().sum(),
                categories,
                hits: state.hits,
                misses: state.misses,
                evictions: state.evictions,
                hit_rate_percent: (hit_rate * 100.0).round() / 100.0,
            }
        })
    }

    /// Return the cached value or run `fetch` and cache its result
    ///
    /// The cache lock is held for the whole call, so concurrent misses on the
    /// same key fetch once. Errors from `fetch` are returned untouched and
    /// nothing is stored.
    pub fn memoize<T, E, F>(
        &self,
        category: &str,
        key: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> std::result::Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let _guard = self.state.lock();
        if let Some(value) = self.get::<T>(category, key) {
            return Ok(value);
        }

        let value = Arc::new(fetch()?);
        self.set_shared(category, key, Arc::clone(&value), ttl);
        Ok(value)
    }
}

impl Default for GlobalCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GlobalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalCache")
            .field("config", &self.config)
            .field("stats", &self.get_stats())
            .finish()
    }
}

/// Escape glob metacharacters so `text` matches literally
pub(crate) fn globset_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '*' | '?' | '[' | ']' | '{' | '}' | '\\' => {
                escaped.push('[');
                escaped.push(ch);
                escaped.push(']');
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}
