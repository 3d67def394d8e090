//! Shared runtime state: one cache and one connection pool per process

use crate::CoreConfig;
use crate::cache::GlobalCache;
use crate::client::QueryClient;
use crate::clock::{Clock, SystemClock};
use crate::diagnostics::{DiagnosticRequest, Diagnosis, Diagnostician};
use crate::error::Result;
use crate::pool::ConnectionPool;
use crate::source::MetadataSource;
use crate::usage::{FieldUsageAnalyzer, UsageReport};
use std::sync::Arc;

/// Entry point tying the cache, the pool and the engines together
///
/// Every operation checks a client out of the pool for `identity`, creating
/// it with `factory` when the pool has none, and releases it by outcome.
pub struct OrgScope {
    config: CoreConfig,
    cache: GlobalCache,
    pool: ConnectionPool<dyn QueryClient>,
}

impl OrgScope {
    pub fn new(config: CoreConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: GlobalCache::with_clock(config.cache.clone(), Arc::clone(&clock)),
            pool: ConnectionPool::with_clock(config.pool.clone(), clock),
            config,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn cache(&self) -> &GlobalCache {
        &self.cache
    }

    pub fn pool(&self) -> &ConnectionPool<dyn QueryClient> {
        &self.pool
    }

    pub fn analyze_field_usage<F>(
        &self,
        identity: &str,
        factory: F,
        object: &str,
        field: Option<&str>,
        include_reports: bool,
    ) -> Result<UsageReport>
    where
        F: FnOnce() -> Result<Arc<dyn QueryClient>>,
    {
        self.pool.with_connection(identity, Some(factory), |client| {
            let source = MetadataSource::new(client, &self.cache);
            FieldUsageAnalyzer::new(source, self.config.usage.clone()).analyze(object, field, include_reports)
        })
    }

    pub fn diagnose<F>(&self, identity: &str, factory: F, request: &DiagnosticRequest) -> Result<Diagnosis>
    where
        F: FnOnce() -> Result<Arc<dyn QueryClient>>,
    {
        self.pool.with_connection(identity, Some(factory), |client| {
            Diagnostician::new(MetadataSource::new(client, &self.cache)).diagnose(request)
        })
    }
}

impl std::fmt::Debug for OrgScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgScope")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
