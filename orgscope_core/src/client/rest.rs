//! Blocking REST implementation of [`QueryClient`]

use super::{QueryClient, QueryResult};
use crate::error::{ClientError, Error, Result, ValidationError};
use crate::metadata::{ObjectDescribe, ReportDescribe, ReportMetadata};
use crate::soql;
use log::debug;
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for [`RestClient`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestClientConfig {
    pub instance_url: String,
    pub access_token: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            instance_url: String::new(),
            access_token: String::new(),
            api_version: "v59.0".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_code: String,
}

/// Bearer-token client for the data, tooling and analytics endpoints
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base: Url,
    access_token: String,
    api_version: String,
}

impl RestClient {
    pub fn new(config: &RestClientConfig) -> Result<Self> {
        if config.access_token.is_empty() {
            return Err(ValidationError::invalid_configuration("org.access_token is not set").into());
        }
        let base = Url::parse(config.instance_url.trim_end_matches('/')).map_err(|e| {
            ValidationError::invalid_configuration(&format!(
                "org.instance_url '{}' is not a valid URL: {e}",
                config.instance_url
            ))
        })?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::transport(e.to_string()))?;

        Ok(Self {
            http,
            base,
            access_token: config.access_token.clone(),
            api_version: config.api_version.clone(),
        })
    }

    pub fn instance_url(&self) -> &str {
        self.base.as_str()
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::transport(format!("bad request path '{path}': {e}")).into())
    }

    fn data_path(&self, suffix: &str) -> String {
        format!("/services/data/{}/{}", self.api_version, suffix)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url.path());
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|e| ClientError::transport(e.to_string()))?;
        let response = check_status(response)?;
        response
            .json::<T>()
            .map_err(|e| ClientError::decode(std::any::type_name::<T>(), e.to_string()).into())
    }

    fn run_query(&self, endpoint: &str, soql: &str, follow: bool) -> Result<QueryResult> {
        let mut url = self.url(&self.data_path(endpoint))?;
        url.query_pairs_mut().append_pair("q", soql);
        let mut result: QueryResult = self.get_json(url)?;

        while follow && !result.done {
            let Some(next) = result.next_records_url.take() else {
                break;
            };
            let page: QueryResult = self.get_json(self.url(&next)?)?;
            result.records.extend(page.records);
            result.done = page.done;
            result.next_records_url = page.next_records_url;
        }
        Ok(result)
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().unwrap_or_default();
    let error = match serde_json::from_str::<Vec<ApiErrorBody>>(&text) {
        Ok(errors) if !errors.is_empty() => {
            ClientError::api(&errors[0].error_code, &errors[0].message)
        }
        _ if status.as_u16() == 404 => ClientError::api("NOT_FOUND", &text),
        _ => ClientError::api(&format!("HTTP_{}", status.as_u16()), &text),
    };
    Err(Error::Client(error))
}

impl QueryClient for RestClient {
    fn query(&self, soql: &str) -> Result<QueryResult> {
        self.run_query("query", soql, false)
    }

    fn query_all(&self, soql: &str) -> Result<QueryResult> {
        self.run_query("query", soql, true)
    }

    fn tooling_query(&self, soql: &str) -> Result<QueryResult> {
        self.run_query("tooling/query", soql, true)
    }

    fn describe(&self, object: &str) -> Result<ObjectDescribe> {
        soql::validate_api_name("object", object)?;
        let url = self.url(&self.data_path(&format!("sobjects/{object}/describe")))?;
        self.get_json(url)
    }

    fn report_metadata(&self, report_id: &str) -> Result<ReportMetadata> {
        if !report_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(
                ValidationError::invalid_identifier("report id", report_id, "must be alphanumeric")
                    .into(),
            );
        }
        let url = self.url(&self.data_path(&format!("analytics/reports/{report_id}/describe")))?;
        let describe: ReportDescribe = self.get_json(url)?;
        Ok(describe.report_metadata)
    }
}
