//! Named, reusable memoized fetches

use super::{GlobalCache, globset_escape};
use crate::error::Result;
use std::any::Any;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

type KeyFn<A> = Box<dyn Fn(&A) -> String + Send + Sync>;

/// A fetch operation whose results are cached under a fixed category
///
/// The default key is `"{name}:{args:?}"`. [`Memoized::clear`] drops every
/// entry this operation produced.
pub struct Memoized<A, T> {
    name: String,
    category: String,
    ttl: Option<Duration>,
    key_fn: Option<KeyFn<A>>,
    _value: PhantomData<fn() -> T>,
}

impl<A: Debug, T: Any + Send + Sync> Memoized<A, T> {
    pub fn new(name: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            ttl: None,
            key_fn: None,
            _value: PhantomData,
        }
    }

    /// Derive keys with `key_fn` instead of the default format
    pub fn with_key(mut self, key_fn: impl Fn(&A) -> String + Send + Sync + 'static) -> Self {
        self.key_fn = Some(Box::new(key_fn));
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn key_for(&self, args: &A) -> String {
        match &self.key_fn {
            Some(key_fn) => key_fn(args),
            None => format!("{}:{:?}", self.name, args),
        }
    }

    /// Return the cached result for `args`, running `fetch` on a miss
    pub fn call<E, F>(&self, cache: &GlobalCache, args: &A, fetch: F) -> std::result::Result<Arc<T>, E>
    where
        F: FnOnce(&A) -> std::result::Result<T, E>,
    {
        let key = self.key_for(args);
        cache.memoize(&self.category, &key, self.ttl, || fetch(args))
    }

    /// Invalidate every entry stored under this operation's name prefix
    pub fn clear(&self, cache: &GlobalCache) -> Result<usize> {
        let pattern = format!("{}:*", globset_escape(&self.name));
        cache.invalidate_pattern(&self.category, &pattern)
    }
}

impl<A, T> Debug for Memoized<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("ttl", &self.ttl)
            .field("custom_key", &self.key_fn.is_some())
            .finish()
    }
}
