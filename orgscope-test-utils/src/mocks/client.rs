//! Scripted query client for testing

use orgscope_core::client::{QueryClient, QueryResult};
use orgscope_core::error::ClientError;
use orgscope_core::metadata::{ObjectDescribe, ReportMetadata};
use orgscope_core::Result;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// Which client method a call went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Query,
    QueryAll,
    Tooling,
    Describe,
    ReportMetadata,
}

/// Data API or tooling API; `query` and `query_all` share routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Api {
    Data,
    Tooling,
}

#[derive(Debug, Clone)]
struct Route {
    api: Api,
    needle: String,
    records: Vec<Value>,
}

#[derive(Debug, Clone)]
struct Failure {
    needle: String,
    code: String,
    message: String,
}

#[derive(Debug, Default)]
struct MockState {
    routes: Vec<Route>,
    describes: HashMap<String, ObjectDescribe>,
    reports: HashMap<String, ReportMetadata>,
    failures: Vec<Failure>,
    calls: Vec<(Endpoint, String)>,
}

/// In-memory [`QueryClient`] answering from scripted responses
///
/// SOQL is routed by substring: the first route whose needle occurs in the
/// query answers it, and an unrouted query returns no rows. Describes and
/// report lookups answer from fixtures and fail with `NOT_FOUND` otherwise.
/// Failures registered with [`fail_on`](Self::fail_on) win over everything.
///
/// # Examples
///
/// ```rust
/// use orgscope_core::QueryClient;
/// use orgscope_test_utils::MockQueryClient;
/// use serde_json::json;
///
/// let client = MockQueryClient::new()
///     .with_query("FROM ApexClass", vec![json!({"Name": "Util", "Body": "x"})]);
///
/// let result = client.query_all("SELECT Id, Name, Body FROM ApexClass").unwrap();
/// assert_eq!(result.records.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockQueryClient {
    state: Mutex<MockState>,
}

impl MockQueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer data API queries containing `needle`
    pub fn with_query(self, needle: &str, records: Vec<Value>) -> Self {
        self.route(Api::Data, needle, records)
    }

    /// Answer tooling API queries containing `needle`
    pub fn with_tooling(self, needle: &str, records: Vec<Value>) -> Self {
        self.route(Api::Tooling, needle, records)
    }

    fn route(self, api: Api, needle: &str, records: Vec<Value>) -> Self {
        self.state.lock().routes.push(Route {
            api,
            needle: needle.to_string(),
            records,
        });
        self
    }

    pub fn with_describe(self, describe: ObjectDescribe) -> Self {
        self.state
            .lock()
            .describes
            .insert(describe.name.clone(), describe);
        self
    }

    pub fn with_report(self, report_id: &str, metadata: ReportMetadata) -> Self {
        self.state
            .lock()
            .reports
            .insert(report_id.to_string(), metadata);
        self
    }

    /// Fail any call whose SOQL, object name or report id contains `needle`
    pub fn fail_on(self, needle: &str, code: &str, message: &str) -> Self {
        self.state.lock().failures.push(Failure {
            needle: needle.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        });
        self
    }

    /// Drop every registered failure
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Number of calls made through `endpoint`
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Every call made so far, in order
    pub fn call_log(&self) -> Vec<(Endpoint, String)> {
        self.state.lock().calls.clone()
    }

    /// Number of calls whose argument contains `needle`
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(_, arg)| arg.contains(needle))
            .count()
    }

    fn record(&self, endpoint: Endpoint, argument: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push((endpoint, argument.to_string()));
        match state.failures.iter().find(|f| argument.contains(&f.needle)) {
            Some(failure) => Err(ClientError::api(&failure.code, &failure.message).into()),
            None => Ok(()),
        }
    }

    fn answer(&self, endpoint: Endpoint, api: Api, soql: &str) -> Result<QueryResult> {
        self.record(endpoint, soql)?;
        let state = self.state.lock();
        let records = state
            .routes
            .iter()
            .find(|route| route.api == api && soql.contains(&route.needle))
            .map(|route| route.records.clone())
            .unwrap_or_default();
        Ok(QueryResult::from_records(records))
    }
}

impl QueryClient for MockQueryClient {
    fn query(&self, soql: &str) -> Result<QueryResult> {
        self.answer(Endpoint::Query, Api::Data, soql)
    }

    fn query_all(&self, soql: &str) -> Result<QueryResult> {
        self.answer(Endpoint::QueryAll, Api::Data, soql)
    }

    fn tooling_query(&self, soql: &str) -> Result<QueryResult> {
        self.answer(Endpoint::Tooling, Api::Tooling, soql)
    }

    fn describe(&self, object: &str) -> Result<ObjectDescribe> {
        self.record(Endpoint::Describe, object)?;
        self.state
            .lock()
            .describes
            .get(object)
            .cloned()
            .ok_or_else(|| {
                ClientError::api("NOT_FOUND", &format!("The requested resource does not exist: {object}"))
                    .into()
            })
    }

    fn report_metadata(&self, report_id: &str) -> Result<ReportMetadata> {
        self.record(Endpoint::ReportMetadata, report_id)?;
        self.state
            .lock()
            .reports
            .get(report_id)
            .cloned()
            .ok_or_else(|| ClientError::api("NOT_FOUND", "Report not found").into())
    }
}
