//! Query client contract for the external platform
//!
//! Everything above this module talks to the org through [`QueryClient`].
//! Implementations are blocking; a call returns when the platform answered
//! or failed.

mod rest;

pub use self::rest::{RestClient, RestClientConfig};

use crate::error::{ClientError, Error, Result};
use crate::metadata::{ObjectDescribe, ReportMetadata};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One page, or all pages, of query rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub total_size: u64,
    #[serde(default = "default_done")]
    pub done: bool,
    #[serde(default)]
    pub records: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_records_url: Option<String>,
}

fn default_done() -> bool {
    true
}

impl Default for QueryResult {
    fn default() -> Self {
        Self::from_records(Vec::new())
    }
}

impl QueryResult {
    pub fn from_records(records: Vec<Value>) -> Self {
        Self {
            total_size: records.len() as u64,
            done: true,
            records,
            next_records_url: None,
        }
    }

    /// Decode every row into `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.records
            .iter()
            .map(|record| {
                T::deserialize(record).map_err(|e| {
                    Error::from(ClientError::decode(std::any::type_name::<T>(), e.to_string()))
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Blocking access to the org's data and metadata endpoints
pub trait QueryClient: Send + Sync {
    /// Run a query, returning the first page
    fn query(&self, soql: &str) -> Result<QueryResult>;

    /// Run a query and follow pagination to the end
    fn query_all(&self, soql: &str) -> Result<QueryResult>;

    /// Run a query against the tooling endpoint
    fn tooling_query(&self, soql: &str) -> Result<QueryResult>;

    /// Describe an object's schema
    fn describe(&self, object: &str) -> Result<ObjectDescribe>;

    /// Fetch a report's column layout
    fn report_metadata(&self, report_id: &str) -> Result<ReportMetadata>;
}

impl<C: QueryClient + ?Sized> QueryClient for Arc<C> {
    fn query(&self, soql: &str) -> Result<QueryResult> {
        (**self).query(soql)
    }

    fn query_all(&self, soql: &str) -> Result<QueryResult> {
        (**self).query_all(soql)
    }

    fn tooling_query(&self, soql: &str) -> Result<QueryResult> {
        (**self).tooling_query(soql)
    }

    fn describe(&self, object: &str) -> Result<ObjectDescribe> {
        (**self).describe(object)
    }

    fn report_metadata(&self, report_id: &str) -> Result<ReportMetadata> {
        (**self).report_metadata(report_id)
    }
}
