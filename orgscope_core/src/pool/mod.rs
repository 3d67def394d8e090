//! Registry of reusable external sessions, one per caller identity
//!
//! Connections are kept in insertion order; when the pool is full the oldest
//! registration is dropped. A connection that failed three times or outlived
//! `max_age` is never handed out again. Like the cache, every operation runs
//! under one re-entrant lock so a factory or probe may call back into the
//! pool.

mod guard;

pub use self::guard::PooledConnection;

use crate::clock::{Clock, SystemClock};
use crate::error::{ClientError, Result, ValidationError};
use log::{debug, error, info, warn};
use lru::LruCache;
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Errors before a connection is marked failed
pub const FAILURE_THRESHOLD: u32 = 3;

const MAX_IDENTITY_LEN: usize = 255;

/// Pool limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: usize,
    /// Age after which a connection is stale
    pub max_age_secs: u64,
    /// Idle time after which an available connection may be cleaned up
    pub max_idle_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            max_age_secs: 3600,
            max_idle_secs: 300,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(ValidationError::invalid_configuration(
                "pool.max_connections must be greater than 0",
            )
            .into());
        }
        Ok(())
    }

    fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    fn max_idle(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }
}

/// Lifecycle state of a pooled connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Available,
    InUse,
    Stale,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in_use",
            Self::Stale => "stale",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct ConnectionInfo<H: ?Sized> {
    handle: Arc<H>,
    endpoint: String,
    created_at: Instant,
    last_used: Instant,
    state: ConnectionState,
    use_count: u64,
    error_count: u32,
    last_error: Option<String>,
}

impl<H: ?Sized> ConnectionInfo<H> {
    fn new(handle: Arc<H>, endpoint: &str, now: Instant, state: ConnectionState) -> Self {
        Self {
            handle,
            endpoint: endpoint.to_string(),
            created_at: now,
            last_used: now,
            state,
            use_count: 0,
            error_count: 0,
            last_error: None,
        }
    }

    fn is_stale(&self, now: Instant, max_age: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > max_age
    }

    fn is_idle(&self, now: Instant, max_idle: Duration) -> bool {
        now.saturating_duration_since(self.last_used) > max_idle
    }

    fn touch(&mut self, now: Instant) {
        self.last_used = now;
        self.use_count += 1;
    }

    fn mark_error(&mut self, message: &str) {
        self.error_count += 1;
        self.last_error = Some(message.to_string());
        if self.error_count >= FAILURE_THRESHOLD {
            self.state = ConnectionState::Failed;
        }
    }
}

/// Per-connection entry in [`PoolStats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionSnapshot {
    pub identity: String,
    pub endpoint: String,
    pub state: ConnectionState,
    pub use_count: u64,
    pub error_count: u32,
    pub age_seconds: f64,
    pub idle_seconds: f64,
}

/// Pool counters and per-connection details, oldest registration first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub total_connections: usize,
    pub active_connections: usize,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate_percent: f64,
    pub reconnections: u64,
    pub errors: u64,
    pub connections: Vec<ConnectionSnapshot>,
}

/// Outcome of probing one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Failed,
    Stale,
    CheckFailed,
    Error(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::Failed => f.write_str("failed"),
            Self::Stale => f.write_str("stale"),
            Self::CheckFailed => f.write_str("check_failed"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}

impl Serialize for HealthStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthDetail {
    pub identity: String,
    pub status: HealthStatus,
    pub error_count: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub unhealthy: usize,
    pub details: Vec<HealthDetail>,
}

#[derive(Debug, Default)]
struct PoolCounters {
    total_requests: u64,
    cache_hits: u64,
    cache_misses: u64,
    reconnections: u64,
    errors: u64,
}

struct PoolState<H: ?Sized> {
    // Only peek/peek_mut/pop are used, so order is registration order.
    connections: LruCache<String, ConnectionInfo<H>>,
    counters: PoolCounters,
}

/// Thread-safe pool of session handles keyed by identity
pub struct ConnectionPool<H: ?Sized> {
    state: ReentrantMutex<RefCell<PoolState<H>>>,
    config: PoolConfig,
    clock: Arc<dyn Clock>,
}

/// Liveness probe for [`ConnectionPool::health_check`]
pub type Probe<'a, H> = &'a dyn Fn(&H) -> Result<bool>;

impl<H: ?Sized + Send + Sync> ConnectionPool<H> {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: PoolConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(PoolState {
                connections: LruCache::unbounded(),
                counters: PoolCounters::default(),
            })),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PoolState<H>) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Return a usable pooled handle for `identity`, if one exists
    pub fn get_connection(&self, identity: &str) -> Result<Option<Arc<H>>> {
        self.checkout(identity, None::<fn() -> Result<Arc<H>>>)
    }

    /// Return a usable pooled handle, creating one with `factory` on a miss
    ///
    /// A failing factory is logged and counted; the result is `Ok(None)` and
    /// retrying is up to the caller.
    pub fn get_or_connect<F>(&self, identity: &str, factory: F) -> Result<Option<Arc<H>>>
    where
        F: FnOnce() -> Result<Arc<H>>,
    {
        self.checkout(identity, Some(factory))
    }

    fn checkout<F>(&self, identity: &str, factory: Option<F>) -> Result<Option<Arc<H>>>
    where
        F: FnOnce() -> Result<Arc<H>>,
    {
        validate_identity(identity)?;
        let _guard = self.state.lock();
        let now = self.clock.now();
        let max_age = self.config.max_age();

        let pooled = self.with_state(|state| {
            state.counters.total_requests += 1;
            let mut unusable = false;
            if let Some(info) = state.connections.peek_mut(identity) {
                if info.state == ConnectionState::Failed {
                    unusable = true;
                } else if info.is_stale(now, max_age) {
                    info.state = ConnectionState::Stale;
                    unusable = true;
                } else {
                    info.touch(now);
                    info.state = ConnectionState::InUse;
                    state.counters.cache_hits += 1;
                    return Some(Arc::clone(&info.handle));
                }
            }
            if unusable {
                info!("Removing stale/failed connection for {identity}");
                state.connections.pop(identity);
            }
            state.counters.cache_misses += 1;
            None
        });

        if let Some(handle) = pooled {
            debug!("Pool hit for {identity}");
            return Ok(Some(handle));
        }

        let Some(factory) = factory else {
            return Ok(None);
        };
        match factory() {
            Ok(handle) => {
                self.register(identity, Arc::clone(&handle), "", ConnectionState::InUse);
                Ok(Some(handle))
            }
            Err(e) => {
                error!("Failed to create connection for {identity}: {e}");
                self.with_state(|state| state.counters.errors += 1);
                Ok(None)
            }
        }
    }

    fn register(&self, identity: &str, handle: Arc<H>, endpoint: &str, state: ConnectionState) {
        let now = self.clock.now();
        let max = self.config.max_connections;
        self.with_state(|pool| {
            while pool.connections.len() >= max {
                match pool.connections.pop_lru() {
                    Some((oldest, _)) => info!("Evicting connection for {oldest}"),
                    None => break,
                }
            }
            pool.connections.put(
                identity.to_string(),
                ConnectionInfo::new(handle, endpoint, now, state),
            );
        });
        info!("Added new connection for {identity}");
    }

    /// Return a connection to the pool after use
    ///
    /// Failures are counted; the third one marks the connection failed.
    pub fn release_connection(&self, identity: &str, success: bool, error: Option<&str>) {
        let failed = self.with_state(|state| {
            let info = state.connections.peek_mut(identity)?;
            if success {
                info.state = ConnectionState::Available;
                None
            } else {
                info.mark_error(error.unwrap_or("Unknown error"));
                Some(info.state == ConnectionState::Failed)
            }
        });
        if failed == Some(true) {
            warn!("Connection marked failed for {identity}");
        }
    }

    /// Replace the handle for `identity`, or register it if absent
    pub fn update_connection(&self, identity: &str, handle: Arc<H>, endpoint: &str) -> Result<()> {
        validate_identity(identity)?;
        let _guard = self.state.lock();
        let now = self.clock.now();

        let mut handle = Some(handle);
        let updated = self.with_state(|state| {
            let Some(info) = state.connections.peek_mut(identity) else {
                return false;
            };
            if let Some(handle) = handle.take() {
                info.handle = handle;
            }
            info.endpoint = endpoint.to_string();
            info.state = ConnectionState::Available;
            info.error_count = 0;
            info.last_error = None;
            info.touch(now);
            state.counters.reconnections += 1;
            true
        });

        if updated {
            info!("Updated connection for {identity}");
        } else if let Some(handle) = handle {
            self.register(identity, handle, endpoint, ConnectionState::InUse);
        }
        Ok(())
    }

    /// Drop the connection for `identity`, returning whether one was pooled
    pub fn remove_connection(&self, identity: &str) -> bool {
        let removed = self.with_state(|state| state.connections.pop(identity).is_some());
        if removed {
            info!("Removed connection for {identity}");
        }
        removed
    }

    /// Acquire a connection that is released when the guard goes away
    pub fn acquire<F>(&self, identity: &str, factory: Option<F>) -> Result<PooledConnection<'_, H>>
    where
        F: FnOnce() -> Result<Arc<H>>,
    {
        match self.checkout(identity, factory)? {
            Some(handle) => Ok(PooledConnection::new(self, identity, handle)),
            None => Err(ClientError::connection_unavailable(identity).into()),
        }
    }

    /// Run `work` with a pooled connection, releasing it by outcome
    ///
    /// Errors that are not the session's fault (see
    /// [`crate::Error::is_connection_fault`]) release the connection as a success.
    pub fn with_connection<F, W, R>(&self, identity: &str, factory: Option<F>, work: W) -> Result<R>
    where
        F: FnOnce() -> Result<Arc<H>>,
        W: FnOnce(&H) -> Result<R>,
    {
        let connection = self.acquire(identity, factory)?;
        match work(&connection) {
            Ok(value) => {
                connection.complete();
                Ok(value)
            }
            Err(e) if e.is_connection_fault() => {
                connection.fail(&e.to_string());
                Err(e)
            }
            Err(e) => {
                connection.complete();
                Err(e)
            }
        }
    }

    /// Drop available connections idle longer than `max_idle`
    pub fn cleanup_idle_connections(&self) -> usize {
        let now = self.clock.now();
        let max_idle = self.config.max_idle();
        let removed = self.remove_where(|info| {
            info.state == ConnectionState::Available && info.is_idle(now, max_idle)
        });
        if removed > 0 {
            info!("Cleaned up {removed} idle connections");
        }
        removed
    }

    pub fn cleanup_failed_connections(&self) -> usize {
        let removed = self.remove_where(|info| info.state == ConnectionState::Failed);
        if removed > 0 {
            info!("Cleaned up {removed} failed connections");
        }
        removed
    }

    /// Idle and failed cleanup in one pass
    pub fn cleanup(&self) -> usize {
        let _guard = self.state.lock();
        self.cleanup_idle_connections() + self.cleanup_failed_connections()
    }

    fn remove_where(&self, doomed: impl Fn(&ConnectionInfo<H>) -> bool) -> usize {
        self.with_state(|state| {
            let identities: Vec<String> = state
                .connections
                .iter()
                .filter(|(_, info)| doomed(info))
                .map(|(identity, _)| identity.clone())
                .collect();
            for identity in &identities {
                state.connections.pop(identity);
            }
            identities.len()
        })
    }

    /// Drop every connection and reset the counters
    pub fn clear(&self) -> usize {
        let count = self.with_state(|state| {
            let count = state.connections.len();
            state.connections.clear();
            state.counters = PoolCounters::default();
            count
        });
        info!("Cleared {count} connections from pool");
        count
    }

    pub fn len(&self) -> usize {
        self.with_state(|state| state.connections.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state_of(&self, identity: &str) -> Option<ConnectionState> {
        self.with_state(|state| state.connections.peek(identity).map(|info| info.state))
    }

    pub fn get_stats(&self) -> PoolStats {
        let now = self.clock.now();
        self.with_state(|state| {
            let connections: Vec<ConnectionSnapshot> = state
                .connections
                .iter()
                .rev()
                .map(|(identity, info)| ConnectionSnapshot {
                    identity: identity.clone(),
                    endpoint: info.endpoint.clone(),
                    state: info.state,
                    use_count: info.use_count,
                    error_count: info.error_count,
                    age_seconds: round_to(now.saturating_duration_since(info.created_at), 10.0),
                    idle_seconds: round_to(now.saturating_duration_since(info.last_used), 10.0),
                })
                .collect();
            let active = connections
                .iter()
                .filter(|c| matches!(c.state, ConnectionState::Available | ConnectionState::InUse))
                .count();
            let counters = &state.counters;
            let hit_rate = if counters.total_requests > 0 {
                counters.cache_hits as f64 / counters.total_requests as f64 * 100.0
            } else {
                0.0
            };

            PoolStats {
                total_connections: connections.len(),
                active_connections: active,
                total_requests: counters.total_requests,
                cache_hits: counters.cache_hits,
                cache_misses: counters.cache_misses,
                hit_rate_percent: (hit_rate * 100.0).round() / 100.0,
                reconnections: counters.reconnections,
                errors: counters.errors,
                connections,
            }
        })
    }

    /// Classify every connection, optionally probing the live ones
    ///
    /// A probe error marks that connection unhealthy and the scan continues.
    pub fn health_check(&self, probe: Option<Probe<'_, H>>) -> HealthReport {
        let _guard = self.state.lock();
        let now = self.clock.now();
        let max_age = self.config.max_age();

        let entries: Vec<_> = self.with_state(|state| {
            state
                .connections
                .iter()
                .rev()
                .map(|(identity, info)| {
                    let status = if info.state == ConnectionState::Failed {
                        Some(HealthStatus::Failed)
                    } else if info.is_stale(now, max_age) {
                        Some(HealthStatus::Stale)
                    } else {
                        None
                    };
                    (
                        identity.clone(),
                        Arc::clone(&info.handle),
                        status,
                        info.error_count,
                        info.last_error.clone(),
                    )
                })
                .collect()
        });

        let mut report = HealthReport::default();
        for (identity, handle, status, error_count, last_error) in entries {
            let status = status.unwrap_or_else(|| match probe {
                None => HealthStatus::Healthy,
                Some(probe) => match probe(&handle) {
                    Ok(true) => HealthStatus::Healthy,
                    Ok(false) => HealthStatus::CheckFailed,
                    Err(e) => HealthStatus::Error(e.to_string()),
                },
            });

            if status.is_healthy() {
                report.healthy += 1;
            } else {
                report.unhealthy += 1;
            }
            report.details.push(HealthDetail {
                identity,
                status,
                error_count,
                last_error,
            });
        }
        report
    }
}

impl<H: ?Sized + Send + Sync> Default for ConnectionPool<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> fmt::Debug for ConnectionPool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn round_to(elapsed: Duration, scale: f64) -> f64 {
    (elapsed.as_secs_f64() * scale).round() / scale
}

/// Reject identities that cannot be a pool key
pub fn validate_identity(identity: &str) -> Result<()> {
    let reason = if identity.trim().is_empty() {
        Some("must not be empty")
    } else if identity.len() > MAX_IDENTITY_LEN {
        Some("must be at most 255 bytes")
    } else if identity.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => {
            Err(ValidationError::invalid_identifier("identity", identity, reason).into())
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::Error;

    #[derive(Debug, PartialEq)]
    struct Session(u32);

    fn pool_with_clock(max: usize) -> (ConnectionPool<Session>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = PoolConfig {
            max_connections: max,
            ..PoolConfig::default()
        };
        (ConnectionPool::with_clock(config, clock.clone()), clock)
    }

    fn connect(pool: &ConnectionPool<Session>, identity: &str, id: u32) -> Arc<Session> {
        pool.get_or_connect(identity, || Ok(Arc::new(Session(id))))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_factory_only_runs_on_miss() {
        let (pool, _clock) = pool_with_clock(4);
        let first = connect(&pool, "org-a", 1);
        pool.release_connection("org-a", true, None);

        let second = pool
            .get_or_connect("org-a", || -> Result<Arc<Session>> { panic!("factory called on hit") })
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = pool.get_stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.hit_rate_percent, 50.0);
        assert_eq!(stats.connections[0].use_count, 1);
    }

    #[test]
    fn test_three_failures_mark_failed() {
        let (pool, _clock) = pool_with_clock(4);
        connect(&pool, "org-a", 1);

        pool.release_connection("org-a", false, Some("timeout"));
        pool.release_connection("org-a", false, None);
        assert_ne!(pool.state_of("org-a"), Some(ConnectionState::Failed));
        pool.release_connection("org-a", false, Some("reset"));
        assert_eq!(pool.state_of("org-a"), Some(ConnectionState::Failed));

        assert!(pool.get_connection("org-a").unwrap().is_none());
        assert_eq!(pool.state_of("org-a"), None);
    }

    #[test]
    fn test_capacity_evicts_oldest_registration() {
        let (pool, _clock) = pool_with_clock(2);
        connect(&pool, "a", 1);
        connect(&pool, "b", 2);
        pool.release_connection("a", true, None);
        assert!(pool.get_connection("a").unwrap().is_some());

        connect(&pool, "c", 3);
        assert_eq!(pool.state_of("a"), None);
        assert!(pool.state_of("b").is_some());
        assert!(pool.state_of("c").is_some());
    }

    #[test]
    fn test_stale_connection_is_replaced() {
        let (pool, clock) = pool_with_clock(2);
        connect(&pool, "a", 1);
        clock.advance(Duration::from_secs(3601));

        assert!(pool.get_connection("a").unwrap().is_none());
        let fresh = connect(&pool, "a", 2);
        assert_eq!(*fresh, Session(2));
    }

    #[test]
    fn test_factory_failure_returns_none_and_counts() {
        let (pool, _clock) = pool_with_clock(2);
        let result = pool
            .get_or_connect("a", || Err(ClientError::transport("refused").into()))
            .unwrap();

        assert!(result.is_none());
        assert_eq!(pool.get_stats().errors, 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_malformed_identity_is_rejected() {
        let (pool, _clock) = pool_with_clock(2);
        for identity in ["", "   ", "bad\nidentity"] {
            let err = pool.get_connection(identity).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert_eq!(pool.get_stats().total_requests, 0);
    }

    #[test]
    fn test_update_connection_resets_errors() {
        let (pool, _clock) = pool_with_clock(2);
        connect(&pool, "a", 1);
        pool.release_connection("a", false, Some("oops"));

        pool.update_connection("a", Arc::new(Session(9)), "https://example.my.site")
            .unwrap();
        let stats = pool.get_stats();
        assert_eq!(stats.reconnections, 1);
        assert_eq!(stats.connections[0].error_count, 0);
        assert_eq!(stats.connections[0].endpoint, "https://example.my.site");
        assert_eq!(stats.connections[0].state, ConnectionState::Available);

        pool.update_connection("b", Arc::new(Session(2)), "https://other")
            .unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get_stats().reconnections, 1);
    }

    #[test]
    fn test_cleanup_idle_and_failed() {
        let (pool, clock) = pool_with_clock(4);
        connect(&pool, "idle", 1);
        pool.release_connection("idle", true, None);
        connect(&pool, "busy", 2);
        connect(&pool, "broken", 3);
        for _ in 0..3 {
            pool.release_connection("broken", false, Some("dead"));
        }

        clock.advance(Duration::from_secs(301));
        assert_eq!(pool.cleanup(), 2);
        assert_eq!(pool.state_of("busy"), Some(ConnectionState::InUse));
    }

    #[test]
    fn test_health_check_statuses() {
        let (pool, _clock) = pool_with_clock(4);
        connect(&pool, "ok", 1);
        connect(&pool, "down", 2);
        connect(&pool, "flaky", 3);
        connect(&pool, "failed", 4);
        for _ in 0..3 {
            pool.release_connection("failed", false, Some("dead"));
        }

        let probe = |session: &Session| -> Result<bool> {
            match session.0 {
                2 => Ok(false),
                3 => Err(ClientError::transport("probe exploded").into()),
                _ => Ok(true),
            }
        };
        let report = pool.health_check(Some(&probe));

        assert_eq!(report.healthy, 1);
        assert_eq!(report.unhealthy, 3);
        let statuses: Vec<String> = report.details.iter().map(|d| d.status.to_string()).collect();
        assert_eq!(statuses[0], "healthy");
        assert_eq!(statuses[1], "check_failed");
        assert!(statuses[2].starts_with("error: "));
        assert_eq!(statuses[3], "failed");
        assert_eq!(report.details[3].last_error.as_deref(), Some("dead"));
    }

    #[test]
    fn test_clear_resets_counters() {
        let (pool, _clock) = pool_with_clock(4);
        connect(&pool, "a", 1);
        assert_eq!(pool.clear(), 1);
        assert_eq!(pool.get_stats(), PoolStats::default());
    }

    #[test]
    fn test_factory_may_reenter_pool() {
        let (pool, _clock) = pool_with_clock(4);
        let handle = pool
            .get_or_connect("outer", || {
                assert!(pool.get_connection("inner").unwrap().is_none());
                Ok(Arc::new(Session(1)))
            })
            .unwrap();
        assert!(handle.is_some());
    }
}
