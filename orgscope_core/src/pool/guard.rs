//! Scoped acquisition of pooled connections

use super::ConnectionPool;
use std::ops::Deref;
use std::sync::Arc;

/// A checked-out connection that goes back to the pool when dropped
///
/// Call [`complete`](Self::complete) on success or [`fail`](Self::fail) with
/// the error text. A guard dropped without either, including while unwinding
/// from a panic, is released as a failure.
pub struct PooledConnection<'a, H: ?Sized + Send + Sync> {
    pool: &'a ConnectionPool<H>,
    identity: String,
    handle: Arc<H>,
    released: bool,
}

impl<'a, H: ?Sized + Send + Sync> PooledConnection<'a, H> {
    pub(super) fn new(pool: &'a ConnectionPool<H>, identity: &str, handle: Arc<H>) -> Self {
        Self {
            pool,
            identity: identity.to_string(),
            handle,
            released: false,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Shared handle, usable beyond the guard's lifetime
    pub fn handle(&self) -> Arc<H> {
        Arc::clone(&self.handle)
    }

    /// Release as successful
    pub fn complete(mut self) {
        self.release(true, None);
    }

    /// Release as failed, recording `error`
    pub fn fail(mut self, error: &str) {
        self.release(false, Some(error));
    }

    fn release(&mut self, success: bool, error: Option<&str>) {
        if !self.released {
            self.released = true;
            self.pool.release_connection(&self.identity, success, error);
        }
    }
}

impl<H: ?Sized + Send + Sync> Deref for PooledConnection<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.handle
    }
}

impl<H: ?Sized + Send + Sync> Drop for PooledConnection<'_, H> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.release(false, Some("panicked while connection was in use"));
        } else {
            self.release(false, Some("connection dropped without completion"));
        }
    }
}
