//! Issue diagnosis
//!
//! A request names an issue type (or `auto`) and describes the problem in
//! free text. The description is first matched against a table of known
//! scenarios, then routed to one analyzer per issue type, and finally,
//! when an object or component is named, annotated with a dependency
//! cross-reference. All metadata reads go through [`MetadataSource`] and
//! therefore through the shared cache.

mod analyzers;
mod dependencies;
mod scenario;

pub use self::dependencies::{Dependency, DependencyReport, analyze_dependencies};
pub use self::scenario::{DetectedScenario, IssueType, Scenario, classify, scenarios};

use crate::error::{Result, ValidationError};
use crate::soql;
use crate::source::MetadataSource;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A problem to diagnose
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticRequest {
    /// Issue type or one of its aliases; `auto` uses the detected scenario
    pub issue_type: String,
    pub description: String,
    pub object: Option<String>,
    pub field: Option<String>,
    /// Trigger, flow, validation rule or layout name, depending on the type
    pub component: Option<String>,
    /// Attach generated fixes; nothing is ever deployed
    pub auto_fix: bool,
}

impl DiagnosticRequest {
    pub fn new(issue_type: &str, description: &str) -> Self {
        Self {
            issue_type: issue_type.to_string(),
            description: description.to_string(),
            ..Self::default()
        }
    }

    pub fn object(mut self, object: &str) -> Self {
        self.object = Some(object.to_string());
        self
    }

    pub fn field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn component(mut self, component: &str) -> Self {
        self.component = Some(component.to_string());
        self
    }

    pub fn auto_fix(mut self, enabled: bool) -> Self {
        self.auto_fix = enabled;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.issue_type.trim().is_empty() {
            return Err(ValidationError::invalid_parameter("issue_type", "must not be empty").into());
        }
        if let Some(object) = &self.object {
            soql::validate_api_name("object", object)?;
        }
        if let Some(field) = &self.field {
            soql::validate_api_name("field", field)?;
        }
        if let Some(component) = &self.component {
            if component.trim().is_empty() || component.chars().any(char::is_control) {
                return Err(ValidationError::invalid_identifier(
                    "component",
                    component,
                    "must be non-blank printable text",
                )
                .into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootCause {
    pub cause: String,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<u8>,
}

impl RootCause {
    pub fn new(cause: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
            explanation: explanation.into(),
            severity: None,
            scenario_id: None,
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn scenario(mut self, id: u8) -> Self {
        self.scenario_id = Some(id);
        self
    }
}

/// A suggested action; lower priority numbers come first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub priority: u8,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
}

impl Recommendation {
    pub fn new(priority: u8, action: impl Into<String>) -> Self {
        Self {
            priority,
            action: action.into(),
            details: None,
            steps: Vec::new(),
            code_example: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn code(mut self, example: impl Into<String>) -> Self {
        self.code_example = Some(example.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FixStatus {
    Generated,
    Failed,
}

/// Fix text produced for the user to apply by hand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedFix {
    pub fix_type: String,
    pub status: FixStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
}

/// Outcome of one diagnosis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub issue_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub root_causes: Vec<RootCause>,
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub generated_fixes: Vec<GeneratedFix>,
    /// Analyzer-specific observations (trigger events, field details, ...)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub findings: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_scenario: Option<DetectedScenario>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_analysis: Option<DependencyReport>,
}

impl Diagnosis {
    fn new(issue_type: &str, request: &DiagnosticRequest) -> Self {
        Self {
            issue_type: issue_type.to_string(),
            description: request.description.clone(),
            object: request.object.clone(),
            field: request.field.clone(),
            component: request.component.clone(),
            root_causes: Vec::new(),
            recommendations: Vec::new(),
            generated_fixes: Vec::new(),
            findings: BTreeMap::new(),
            detected_scenario: None,
            dependency_analysis: None,
        }
    }

    pub fn has_cause(&self, cause: &str) -> bool {
        self.root_causes.iter().any(|c| c.cause == cause)
    }

    pub(crate) fn add_cause(&mut self, cause: RootCause) {
        self.root_causes.push(cause);
    }

    pub(crate) fn recommend(&mut self, recommendation: Recommendation) {
        self.recommendations.push(recommendation);
    }

    pub(crate) fn record(&mut self, key: &str, value: Value) {
        self.findings.insert(key.to_string(), value);
    }
}

/// Routes diagnostic requests to the analyzer for their issue type
#[derive(Debug, Clone, Copy)]
pub struct Diagnostician<'a> {
    source: MetadataSource<'a>,
}

impl<'a> Diagnostician<'a> {
    pub fn new(source: MetadataSource<'a>) -> Self {
        Self { source }
    }

    /// Diagnose `request`
    ///
    /// Only malformed requests are errors. Metadata that cannot be fetched
    /// is logged and the diagnosis carries on with what it has.
    pub fn diagnose(&self, request: &DiagnosticRequest) -> Result<Diagnosis> {
        request.validate()?;

        let requested = request.issue_type.trim().to_lowercase();
        let detected = classify(&request.description);
        if let Some(scenario) = detected {
            info!(
                "Auto-detected scenario: {} (#{})",
                scenario.key, scenario.id
            );
        }

        let issue_type = match (requested.as_str(), detected) {
            ("auto" | "detect", Some(scenario)) => Some(scenario.issue_type),
            _ => IssueType::from_alias(&requested),
        };

        let context = analyzers::Context::new(self.source, request, detected.map(|s| s.id));
        let mut diagnosis = match issue_type {
            Some(issue_type) => {
                let mut diagnosis = Diagnosis::new(issue_type.as_str(), request);
                analyzers::run(issue_type, &context, &mut diagnosis);
                diagnosis
            }
            None => {
                let mut diagnosis = Diagnosis::new(&requested, request);
                analyzers::generic(&requested, &mut diagnosis);
                diagnosis
            }
        };

        diagnosis.detected_scenario = detected.map(DetectedScenario::from);

        if request.object.is_some() || request.component.is_some() {
            info!("Analyzing dependencies...");
            let dependencies = analyze_dependencies(
                &self.source,
                request.object.as_deref(),
                request.field.as_deref(),
                request.component.as_deref(),
            );
            if !dependencies.is_empty() {
                diagnosis.dependency_analysis = Some(dependencies);
            }
        }

        Ok(diagnosis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = DiagnosticRequest::new("trigger", "recursion")
            .object("Opportunity")
            .component("OppTrigger")
            .auto_fix(true);
        assert_eq!(request.object.as_deref(), Some("Opportunity"));
        assert!(request.auto_fix);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_rejects_bad_names() {
        assert!(DiagnosticRequest::new(" ", "x").validate().is_err());
        assert!(
            DiagnosticRequest::new("field", "x")
                .object("Account'--")
                .validate()
                .is_err()
        );
        assert!(
            DiagnosticRequest::new("flow", "x")
                .component("bad\nname")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_recommendation_serialization_skips_empty() {
        let json = serde_json::to_value(Recommendation::new(1, "Do it")).unwrap();
        assert_eq!(json, serde_json::json!({"priority": 1, "action": "Do it"}));
    }

    #[test]
    fn test_root_cause_builder() {
        let cause = RootCause::new("Trigger Recursion", "loops")
            .severity(Severity::High)
            .scenario(2);
        let json = serde_json::to_value(cause).unwrap();
        assert_eq!(json["severity"], "high");
        assert_eq!(json["scenario_id"], 2);
    }
}
