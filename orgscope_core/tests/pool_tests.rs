//! Connection pool lifecycle, and the pool driving the engines through `OrgScope`

use orgscope_core::clock::ManualClock;
use orgscope_core::error::{ClientError, Result};
use orgscope_core::pool::{ConnectionPool, ConnectionState, HealthStatus, PoolConfig};
use orgscope_core::{CoreConfig, DiagnosticRequest, OrgScope, QueryClient};
use orgscope_test_utils::{MockQueryClient, account_describe};
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn session(name: &str) -> Option<impl FnOnce() -> Result<Arc<String>>> {
    let name = name.to_string();
    Some(move || Ok(Arc::new(name)))
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_factory_runs_once_per_identity() {
        let pool: ConnectionPool<String> = ConnectionPool::new();
        let created = AtomicUsize::new(0);
        let factory = || {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new("s".to_string()))
        };

        pool.acquire("org-a", Some(factory)).unwrap().complete();
        pool.acquire("org-a", Some(factory)).unwrap().complete();

        assert_eq!(created.load(Ordering::SeqCst), 1);
        let stats = pool.get_stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.connections[0].use_count, 1);
    }

    #[test]
    fn test_third_failure_retires_connection() {
        let pool: ConnectionPool<String> = ConnectionPool::new();
        for _ in 0..3 {
            pool.acquire("org", session("s")).unwrap().fail("INVALID_SESSION_ID");
        }
        assert_eq!(pool.state_of("org"), Some(ConnectionState::Failed));

        let report = pool.health_check(None);
        assert_eq!(report.details[0].status, HealthStatus::Failed);

        let fresh = pool.acquire("org", session("new")).unwrap();
        assert_eq!(fresh.as_str(), "new");
    }

    #[test]
    fn test_removed_connection_is_rebuilt_on_next_acquire() {
        let pool: ConnectionPool<String> = ConnectionPool::new();
        pool.acquire("org", session("old")).unwrap().complete();
        assert_eq!(pool.len(), 1);

        assert!(pool.remove_connection("org"));
        assert!(!pool.remove_connection("org"));
        assert!(pool.is_empty());
        assert!(pool.get_connection("org").unwrap().is_none());

        let fresh = pool.acquire("org", session("new")).unwrap();
        assert_eq!(fresh.as_str(), "new");
    }

    #[test]
    fn test_stale_and_idle_connections() {
        let clock = Arc::new(ManualClock::new());
        let config = PoolConfig {
            max_connections: 5,
            max_age_secs: 100,
            max_idle_secs: 10,
        };
        let pool: ConnectionPool<String> = ConnectionPool::with_clock(config, clock.clone());

        pool.acquire("idle", session("a")).unwrap().complete();
        pool.acquire("busy", session("b")).unwrap().complete();
        clock.advance(Duration::from_secs(11));
        pool.acquire("busy", session("b")).unwrap().complete();

        assert_eq!(pool.cleanup_idle_connections(), 1);
        assert_eq!(pool.len(), 1);

        clock.advance(Duration::from_secs(100));
        assert!(pool.get_connection("busy").unwrap().is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_probe_errors_mark_unhealthy() {
        let pool: ConnectionPool<String> = ConnectionPool::new();
        pool.acquire("good", session("ok")).unwrap().complete();
        pool.acquire("bad", session("broken")).unwrap().complete();

        let probe = |handle: &String| -> Result<bool> {
            if handle == "broken" {
                Err(ClientError::transport("connection reset").into())
            } else {
                Ok(true)
            }
        };
        let report = pool.health_check(Some(&probe));

        assert_eq!(report.healthy, 1);
        assert_eq!(report.unhealthy, 1);
        assert!(matches!(report.details[1].status, HealthStatus::Error(_)));
        assert_eq!(
            serde_json::to_value(&report.details[0].status).unwrap(),
            "healthy"
        );
    }
}

proptest! {
    #[test]
    fn test_pool_never_exceeds_capacity(
        capacity in 1usize..6,
        identities in proptest::collection::vec("[a-d][0-9]", 1..40),
    ) {
        let config = PoolConfig { max_connections: capacity, ..PoolConfig::default() };
        let pool: ConnectionPool<String> = ConnectionPool::with_config(config);

        for identity in &identities {
            let connection = pool.acquire(identity, session(identity)).unwrap();
            connection.complete();
            prop_assert!(pool.len() <= capacity);
        }

        let last = identities.last().unwrap();
        prop_assert_eq!(pool.state_of(last), Some(ConnectionState::Available));
    }
}

#[cfg(test)]
mod orgscope_tests {
    use super::*;

    fn client() -> Arc<dyn QueryClient> {
        Arc::new(MockQueryClient::new().with_describe(account_describe()))
    }

    #[test]
    fn test_operations_share_one_pooled_client() {
        let scope = OrgScope::new(CoreConfig::default()).unwrap();
        let created = AtomicUsize::new(0);
        let factory = || {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(client())
        };

        let report = scope
            .analyze_field_usage("prod", factory, "Account", Some("Region__c"), false)
            .unwrap();
        assert_eq!(report.total_fields_analyzed, 1);

        let request = DiagnosticRequest::new("field", "region not visible")
            .object("Account")
            .field("Region__c");
        let diagnosis = scope.diagnose("prod", factory, &request).unwrap();
        assert!(diagnosis.has_cause("Field Level Security"));

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(scope.pool().state_of("prod"), Some(ConnectionState::Available));
    }

    #[test]
    fn test_missing_field_does_not_count_against_connection() {
        let scope = OrgScope::new(CoreConfig::default()).unwrap();
        let created = AtomicUsize::new(0);
        let factory = || {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(client())
        };

        for _ in 0..4 {
            let err = scope
                .analyze_field_usage("prod", factory, "Account", Some("Typo__c"), false)
                .unwrap_err();
            assert!(err.is_not_found());
        }
        let err = scope
            .analyze_field_usage("prod", factory, "Account; DROP", None, false)
            .unwrap_err();
        assert!(!err.is_connection_fault());

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(scope.pool().state_of("prod"), Some(ConnectionState::Available));
        let stats = scope.pool().get_stats();
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.connections[0].error_count, 0);
    }

    #[test]
    fn test_platform_failures_count_against_connection() {
        let scope = OrgScope::new(CoreConfig::default()).unwrap();
        let created = AtomicUsize::new(0);
        let factory = || {
            created.fetch_add(1, Ordering::SeqCst);
            let expired = MockQueryClient::new()
                .with_describe(account_describe())
                .fail_on("Account", "INVALID_SESSION_ID", "Session expired or invalid");
            Ok(Arc::new(expired) as Arc<dyn QueryClient>)
        };

        for expected in 1..=3 {
            let err = scope
                .analyze_field_usage("prod", factory, "Account", None, false)
                .unwrap_err();
            assert_eq!(err.provider_code(), Some("INVALID_SESSION_ID"));
            assert_eq!(scope.pool().get_stats().connections[0].error_count, expected);
        }
        assert_eq!(scope.pool().state_of("prod"), Some(ConnectionState::Failed));

        // The failed session is replaced on the next checkout
        let _ = scope.analyze_field_usage("prod", factory, "Account", None, false);
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_factory_failure_is_connection_unavailable() {
        let scope = OrgScope::new(CoreConfig::default()).unwrap();

        let err = scope
            .analyze_field_usage(
                "prod",
                || Err(ClientError::api("INVALID_LOGIN", "bad credentials").into()),
                "Account",
                None,
                false,
            )
            .unwrap_err();

        assert!(err.to_string().contains("No connection available for 'prod'"));
        assert_eq!(scope.pool().get_stats().errors, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = CoreConfig::default();
        config.usage.progress_every = 0;
        assert!(OrgScope::new(config).is_err());
    }
}
