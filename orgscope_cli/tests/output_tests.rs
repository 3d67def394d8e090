//! Formatter tests over reports produced from a scripted org

use orgscope_cli::output::{JsonFormatter, OutputFormatter, TextFormatter};
use orgscope_core::error::NotFoundError;
use orgscope_core::{CoreConfig, DiagnosticRequest, Diagnosis, Error, OrgScope, QueryClient, UsageReport};
use orgscope_test_utils::builders::apex_class;
use orgscope_test_utils::{MockQueryClient, account_describe};
use serde_json::Value;
use std::sync::Arc;

fn scripted_org() -> Arc<dyn QueryClient> {
    Arc::new(
        MockQueryClient::new()
            .with_describe(account_describe())
            .with_query(
                "FROM ApexClass",
                vec![apex_class("AccountService", "acc.Region__c = region; update acc;")],
            ),
    )
}

fn usage_report() -> UsageReport {
    let scope = OrgScope::new(CoreConfig::default()).unwrap();
    scope
        .analyze_field_usage("test-org", || Ok(scripted_org()), "Account", None, false)
        .unwrap()
}

fn diagnosis(request: &DiagnosticRequest) -> Diagnosis {
    let scope = OrgScope::new(CoreConfig::default()).unwrap();
    scope.diagnose("test-org", || Ok(scripted_org()), request).unwrap()
}

#[cfg(test)]
mod text_tests {
    use super::*;

    #[test]
    fn test_usage_lists_references_per_category() {
        let report = usage_report();
        let text = TextFormatter::new(false).format_usage(&report).unwrap();

        assert!(text.contains("Field usage for Account"));
        assert!(text.contains("Region__c (Region) [string]"));
        assert!(text.contains("  Apex Classes: AccountService"));
        assert!(text.contains("References by category:"));
        // No escape codes when color is off
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_diagnosis_sections() {
        let request = DiagnosticRequest::new("auto", "Maximum trigger depth exceeded on update")
            .object("Opportunity")
            .auto_fix(true);
        let text = TextFormatter::new(false).format_diagnosis(&diagnosis(&request)).unwrap();

        assert!(text.contains("Diagnosis: trigger"));
        assert!(text.contains("Detected scenario #2"));
        assert!(text.contains("Root causes:"));
        assert!(text.contains("Trigger Recursion"));
        assert!(text.contains("Generated fixes:"));
        assert!(text.contains("[generated]"));
        assert!(text.contains("OpportunityTriggerHelper"));
    }

    #[test]
    fn test_text_failures_go_to_stderr_only() {
        let error = Error::from(NotFoundError::object("Nope__c"));
        assert!(TextFormatter::new(false).format_failure(&error).unwrap().is_none());
    }
}

#[cfg(test)]
mod json_tests {
    use super::*;

    #[test]
    fn test_usage_envelope() {
        let report = usage_report();
        let json = JsonFormatter::new(true).format_usage(&report).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["success"], true);
        assert!(value.get("error").is_none());
        assert_eq!(value["data"]["object"], "Account");
        assert_eq!(value["data"]["field_analyzed"], "ALL");
    }

    #[test]
    fn test_diagnosis_envelope() {
        let request = DiagnosticRequest::new("Workflowz", "something odd");
        let json = JsonFormatter::new(false).format_diagnosis(&diagnosis(&request)).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["issue_type"], "workflowz");
        assert_eq!(value["data"]["root_causes"][0]["cause"], "Unknown Issue Type");
    }

    #[test]
    fn test_failure_envelope() {
        let error = Error::from(NotFoundError::field("Account", "Missing__c"));
        let json = JsonFormatter::new(true).format_failure(&error).unwrap().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["success"], false);
        assert!(value.get("data").is_none());
        assert_eq!(value["error"]["category"], "not_found");
        assert_eq!(value["error"]["object_name"], "Account");
        assert_eq!(value["error"]["field_name"], "Missing__c");
    }
}
