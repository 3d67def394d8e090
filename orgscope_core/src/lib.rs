//! OrgScope Core Library
//!
//! Org diagnostics and field-usage auditing for a hosted CRM platform: a
//! categorized metadata cache, a pool of per-identity API sessions, a
//! field-usage engine and a diagnostic dispatcher built on top of both.

pub mod cache;
pub mod client;
pub mod clock;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod metadata;
pub mod pool;
pub mod response;
pub mod soql;
pub mod source;
pub mod usage;

// Re-export main types
pub use cache::{CacheConfig, CacheStats, GlobalCache, Memoized, categories};
pub use client::{QueryClient, QueryResult, RestClient, RestClientConfig};
pub use context::OrgScope;
pub use diagnostics::{DiagnosticRequest, Diagnosis, Diagnostician, IssueType};
pub use error::{Error, ErrorCategory, Result};
pub use pool::{ConnectionPool, HealthReport, PoolConfig, PoolStats, PooledConnection};
pub use response::{ErrorReport, OperationResult};
pub use source::MetadataSource;
pub use usage::{FieldUsageAnalyzer, FieldUsageRecord, UsageCategory, UsageConfig, UsageReport};

use serde::{Deserialize, Serialize};

/// Core configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub cache: CacheConfig,
    pub pool: PoolConfig,
    pub usage: UsageConfig,
}

impl CoreConfig {
    /// Reject settings that would make a component unusable
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.pool.validate()?;
        self.usage.validate()
    }
}
