//! Cached metadata reads shared by the usage engine and the diagnostics
//!
//! Every read here goes through [`GlobalCache::memoize`], so repeated
//! lookups of the same object inside one TTL window cost one API call.

use crate::cache::{GlobalCache, categories};
use crate::client::QueryClient;
use crate::error::Result;
use crate::metadata::{
    ApexTriggerRecord, FlowRecord, ObjectDescribe, ProfileRecord, ValidationRuleRecord,
};
use crate::soql::{self, quote};
use log::debug;
use std::sync::Arc;

const VALIDATION_RULE_COLUMNS: &str = "Id, ValidationName, Active, Description, \
    ErrorConditionFormula, ErrorDisplayField, ErrorMessage";

/// Borrowed view of a client plus the cache it should read through
#[derive(Clone, Copy)]
pub struct MetadataSource<'a> {
    client: &'a dyn QueryClient,
    cache: &'a GlobalCache,
}

impl<'a> MetadataSource<'a> {
    pub fn new(client: &'a dyn QueryClient, cache: &'a GlobalCache) -> Self {
        Self { client, cache }
    }

    /// Uncached access for one-off queries
    pub fn client(&self) -> &'a dyn QueryClient {
        self.client
    }

    pub fn cache(&self) -> &'a GlobalCache {
        self.cache
    }

    /// Describe `object`, cached under `object_metadata/{object}`
    pub fn describe(&self, object: &str) -> Result<Arc<ObjectDescribe>> {
        soql::validate_api_name("object", object)?;
        self.cache
            .memoize(categories::OBJECT_METADATA, object, None, || {
                debug!("Describing {object}");
                self.client.describe(object)
            })
    }

    /// Active validation rules on `object`, cached under `validation_rules/{object}`
    pub fn active_validation_rules(&self, object: &str) -> Result<Arc<Vec<ValidationRuleRecord>>> {
        soql::validate_api_name("object", object)?;
        self.cache
            .memoize(categories::VALIDATION_RULES, object, None, || {
                let query = format!(
                    "SELECT {VALIDATION_RULE_COLUMNS} FROM ValidationRule \
                     WHERE EntityDefinition.QualifiedApiName = {} AND Active = true",
                    quote(object)
                );
                self.client.tooling_query(&query)?.decode()
            })
    }

    /// Every validation rule on `object`, active or not, optionally narrowed to one name
    pub fn validation_rules(
        &self,
        object: &str,
        rule_name: Option<&str>,
    ) -> Result<Arc<Vec<ValidationRuleRecord>>> {
        soql::validate_api_name("object", object)?;
        let key = format!("validation_rules:{object}:{}", rule_name.unwrap_or("*"));
        self.cache
            .memoize(categories::QUERY_RESULTS, &key, None, || {
                let mut query = format!(
                    "SELECT {VALIDATION_RULE_COLUMNS} FROM ValidationRule \
                     WHERE EntityDefinition.QualifiedApiName = {}",
                    quote(object)
                );
                if let Some(name) = rule_name {
                    query.push_str(&format!(" AND ValidationName = {}", quote(name)));
                }
                query.push_str(" LIMIT 50");
                self.client.tooling_query(&query)?.decode()
            })
    }

    /// Active triggers defined on `object`, bodies included
    pub fn triggers(&self, object: &str) -> Result<Arc<Vec<ApexTriggerRecord>>> {
        soql::validate_api_name("object", object)?;
        self.cache
            .memoize(categories::TRIGGER_BODIES, object, None, || {
                let query = format!(
                    "SELECT Id, Name, Body, TableEnumOrId, Status FROM ApexTrigger \
                     WHERE TableEnumOrId = {} AND Status = 'Active'",
                    quote(object)
                );
                self.client.tooling_query(&query)?.decode()
            })
    }

    /// One trigger by name, `None` if the org has no such trigger on `object`
    pub fn trigger(&self, object: &str, name: &str) -> Result<Arc<Option<ApexTriggerRecord>>> {
        soql::validate_api_name("object", object)?;
        soql::validate_api_name("trigger", name)?;
        let key = format!("{object}:{name}");
        self.cache
            .memoize(categories::TRIGGER_BODIES, &key, None, || {
                let query = format!(
                    "SELECT Id, Name, Body, TableEnumOrId, Status FROM ApexTrigger \
                     WHERE Name = {} AND TableEnumOrId = {} LIMIT 1",
                    quote(name),
                    quote(object)
                );
                let mut rows: Vec<ApexTriggerRecord> = self.client.tooling_query(&query)?.decode()?;
                Ok(rows.pop())
            })
    }

    /// Active flows triggered by `object`
    pub fn active_flows(&self, object: &str) -> Result<Arc<Vec<FlowRecord>>> {
        soql::validate_api_name("object", object)?;
        let key = format!("active_flows:{object}");
        self.cache
            .memoize(categories::QUERY_RESULTS, &key, None, || {
                let query = format!(
                    "SELECT Id, ApiName, Label, Status, ProcessType FROM Flow \
                     WHERE TriggerObjectOrEvent.QualifiedApiName = {} \
                     AND Status = 'Active' LIMIT 50",
                    quote(object)
                );
                self.client.tooling_query(&query)?.decode()
            })
    }

    /// A profile by its display name, cached under `org_info/profile:{name}`
    pub fn profile(&self, name: &str) -> Result<Arc<Option<ProfileRecord>>> {
        let key = format!("profile:{name}");
        self.cache.memoize(categories::ORG_INFO, &key, None, || {
            let query = format!("SELECT Id, Name FROM Profile WHERE Name = {} LIMIT 1", quote(name));
            let mut rows: Vec<ProfileRecord> = self.client.query(&query)?.decode()?;
            Ok(rows.pop())
        })
    }

    /// Latest version of a flow by label or API name
    pub fn flow(&self, name: &str) -> Result<Option<FlowRecord>> {
        let query = format!(
            "SELECT Id, ApiName, Label, Status, ProcessType FROM Flow \
             WHERE Label = {0} OR ApiName = {0} ORDER BY VersionNumber DESC LIMIT 1",
            quote(name)
        );
        let mut rows: Vec<FlowRecord> = self.client.tooling_query(&query)?.decode()?;
        Ok(rows.pop())
    }
}

impl std::fmt::Debug for MetadataSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataSource").finish_non_exhaustive()
    }
}
