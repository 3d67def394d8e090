//! Field-usage engine tests against a scripted org

use orgscope_core::cache::GlobalCache;
use orgscope_core::error::{Error, NotFoundError};
use orgscope_core::metadata::ReportMetadata;
use orgscope_core::usage::{self, FieldUsageAnalyzer, UsageCategory, UsageConfig};
use orgscope_core::MetadataSource;
use orgscope_test_utils::builders::{
    account_describe, apex_class, apex_trigger, email_template, flow, flow_metadata, layout,
    layout_item, report, validation_rule, workflow_rule,
};
use orgscope_test_utils::{Endpoint, MockQueryClient};
use serde_json::json;
use tempfile::TempDir;

fn org() -> MockQueryClient {
    MockQueryClient::new()
        .with_describe(account_describe())
        .with_query(
            "FROM ApexClass",
            vec![
                apex_class("AccountService", "acc.Region__c = region; update acc;"),
                apex_class("Util", "return null;"),
            ],
        )
}

#[cfg(test)]
mod analysis_tests {
    use super::*;

    #[test]
    fn test_single_field_round_trip() {
        let client = org();
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        let report = analyzer.analyze("Account", Some("Region__c"), false).unwrap();

        assert_eq!(report.field_analyzed, "Region__c");
        assert_eq!(report.total_fields_analyzed, 1);
        let record = report.field("Region__c").unwrap();
        assert_eq!(record.usages(UsageCategory::ApexClasses), ["AccountService"]);
        assert_eq!(record.usages(UsageCategory::FormulaFields), ["Region_Code__c"]);
        assert_eq!(record.total_usage(), 2);
        assert!(record.is_referenced());
        assert!(!report.is_degraded());
    }

    #[test]
    fn test_every_category_is_searched() {
        let client = org()
            .with_query(
                "FROM ApexTrigger",
                vec![apex_trigger("AccountTrigger", "Account", "if (a.Region__c == null) {}")],
            )
            .with_tooling("FROM Flow WHERE Id", vec![flow_metadata(json!({"filters": ["Region__c"]}))])
            .with_tooling("FROM Flow", vec![flow("301A", "Assign_Region", "Assign Region", "Active")])
            .with_tooling(
                "FROM ValidationRule",
                vec![validation_rule("Region_Required", "ISBLANK(Region__c)", "Pick a region")],
            )
            .with_tooling(
                "FROM WorkflowRule",
                vec![workflow_rule("Notify_Region_Change", "ISCHANGED(Region__c)")],
            )
            .with_tooling("FROM Layout", vec![layout("00h1", "Account Layout")])
            .with_tooling(
                "FROM FieldLayoutItem",
                vec![layout_item("Name"), layout_item(" Region__c "), layout_item("")],
            )
            .with_query(
                "FROM EmailTemplate",
                vec![email_template("Region Welcome", "Welcome to {!Account.Region__c}", "Hi")],
            )
            .with_query("FROM Report", vec![report("00O1", "Regional Pipeline")])
            .with_report(
                "00O1",
                ReportMetadata {
                    detail_columns: vec!["Account.Region__c".into()],
                    ..Default::default()
                },
            );
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        let report = analyzer.analyze("Account", Some("Region__c"), true).unwrap();
        let record = report.field("Region__c").unwrap();

        for category in UsageCategory::ALL {
            assert_eq!(record.usages(category).len(), 1, "expected one match in {category}");
        }
        assert_eq!(record.total_usage(), 9);
        assert_eq!(record.usages(UsageCategory::PageLayouts), ["Account Layout"]);
        assert_eq!(report.summary.category_totals[&UsageCategory::Flows], 1);
    }

    #[test]
    fn test_all_fields_and_unreferenced() {
        let client = org();
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        let report = analyzer.analyze("Account", None, false).unwrap();

        assert_eq!(report.field_analyzed, "ALL");
        assert_eq!(report.total_fields_analyzed, account_describe().fields.len());
        let unused = report.field("Unused__c").unwrap();
        assert_eq!(unused.total_usage(), 0);
        assert!(!unused.is_referenced());
        assert_eq!(
            report.summary.referenced_fields + report.summary.unreferenced_fields,
            report.total_fields_analyzed
        );
    }

    #[test]
    fn test_one_bulk_query_per_category_for_all_fields() {
        let client = org()
            .with_query(
                "FROM ApexTrigger",
                vec![
                    apex_trigger("AccountTrigger", "Account", "a.Name = a.Phone;"),
                    apex_trigger("RegionTrigger", "Account", "a.Region__c = 'EU';"),
                ],
            )
            .with_tooling("FROM Flow WHERE Id", vec![flow_metadata(json!({"filters": ["Tier__c"]}))])
            .with_tooling(
                "FROM Flow",
                vec![
                    flow("301A", "Assign_Region", "Assign Region", "Active"),
                    flow("301B", "Tier_Upgrade", "Tier Upgrade", "Active"),
                ],
            )
            .with_tooling(
                "FROM ValidationRule",
                vec![validation_rule("Phone_Required", "ISBLANK(Phone)", "Enter a phone")],
            )
            .with_tooling("FROM WorkflowRule", vec![workflow_rule("Tier_Alert", "ISCHANGED(Tier__c)")])
            .with_tooling(
                "FROM Layout",
                vec![layout("00h1", "Account Layout"), layout("00h2", "Partner Layout")],
            )
            .with_tooling("FROM FieldLayoutItem", vec![layout_item("Name"), layout_item("Phone")])
            .with_query("FROM EmailTemplate", vec![email_template("Hello", "Hi {!Account.Name}", "")]);
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        let report = analyzer.analyze("Account", None, false).unwrap();
        assert!(report.total_fields_analyzed > 5);

        for bulk in [
            "FROM ApexClass",
            "FROM ApexTrigger",
            "FROM Flow WHERE Status",
            "FROM ValidationRule",
            "FROM WorkflowRule",
            "FROM Layout",
            "FROM EmailTemplate",
        ] {
            assert_eq!(client.calls_matching(bulk), 1, "expected a single query for {bulk}");
        }
        // Per-component lookups scale with components, never with fields
        assert_eq!(client.calls_matching("FROM Flow WHERE Id"), 2);
        assert_eq!(client.calls_matching("FROM FieldLayoutItem"), 2);
        assert_eq!(client.calls(Endpoint::Describe), 1);

        assert_eq!(report.field("Phone").unwrap().usages(UsageCategory::PageLayouts).len(), 2);
        assert_eq!(report.field("Tier__c").unwrap().usages(UsageCategory::Flows).len(), 2);
    }

    #[test]
    fn test_zero_progress_interval_disables_progress_logging() {
        let client = org();
        let cache = GlobalCache::new();
        let config = UsageConfig {
            progress_every: 0,
            ..UsageConfig::default()
        };
        assert!(config.validate().is_err());
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), config);

        let report = analyzer.analyze("Account", None, false).unwrap();

        assert_eq!(report.total_fields_analyzed, account_describe().fields.len());
    }

    #[test]
    fn test_reports_skipped_unless_requested() {
        let client = org().with_query("FROM Report", vec![report("00O1", "Regional Pipeline")]);
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        let report = analyzer.analyze("Account", Some("Region__c"), false).unwrap();

        assert_eq!(client.calls_matching("FROM Report"), 0);
        assert_eq!(report.working_set_sizes[&UsageCategory::Reports], 0);
    }

    #[test]
    fn test_report_without_metadata_matches_by_name() {
        let client = org().with_query("FROM Report", vec![report("00O9", "Region__c Breakdown")]);
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        let report = analyzer.analyze("Account", Some("Region__c"), true).unwrap();

        assert_eq!(
            report.field("Region__c").unwrap().usages(UsageCategory::Reports),
            ["Region__c Breakdown"]
        );
    }

    #[test]
    fn test_describe_is_cached_between_runs() {
        let client = org();
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        analyzer.analyze("Account", Some("Region__c"), false).unwrap();
        analyzer.analyze("Account", Some("Phone"), false).unwrap();

        assert_eq!(client.calls(Endpoint::Describe), 1);
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[test]
    fn test_failing_category_degrades_instead_of_failing() {
        let client = org().fail_on("FROM ApexTrigger", "REQUEST_LIMIT_EXCEEDED", "Too many requests");
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        let report = analyzer.analyze("Account", Some("Region__c"), false).unwrap();

        assert_eq!(report.degraded_categories, vec![UsageCategory::Triggers]);
        let record = report.field("Region__c").unwrap();
        assert!(record.usages(UsageCategory::Triggers).is_empty());
        assert_eq!(record.total_usage(), 2);
    }

    #[test]
    fn test_unknown_field_is_not_found() {
        let client = org();
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        let err = analyzer.analyze("Account", Some("Missing__c"), false).unwrap_err();

        match err {
            Error::NotFound(NotFoundError::Field { object, field }) => {
                assert_eq!(object, "Account");
                assert_eq!(field, "Missing__c");
            }
            other => panic!("expected field not found, got {other:?}"),
        }
        assert_eq!(client.calls_matching("FROM ApexClass"), 0);
    }

    #[test]
    fn test_describe_failure_is_an_error() {
        let client = MockQueryClient::new();
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        let err = analyzer.analyze("Widget__c", None, false).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_malformed_names_rejected_before_any_call() {
        let client = org();
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());

        assert!(analyzer.analyze("Account' OR Name != '", None, false).is_err());
        assert!(analyzer.analyze("Account", Some("Region__c;"), false).is_err());
        assert_eq!(client.total_calls(), 0);
    }
}

#[cfg(test)]
mod export_tests {
    use super::*;

    #[test]
    fn test_csv_file_has_one_row_per_field() {
        let client = org();
        let cache = GlobalCache::new();
        let analyzer = FieldUsageAnalyzer::new(MetadataSource::new(&client, &cache), UsageConfig::default());
        let report = analyzer.analyze("Account", None, false).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(usage::default_file_name("Account", report.generated_at));
        usage::write_csv_file(&report, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 5 + 2 * UsageCategory::ALL.len() + 2);
        assert_eq!(&headers[5], "Apex Classes Count");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), report.total_fields_analyzed);
        let region = rows.iter().find(|r| &r[0] == "Region__c").unwrap();
        assert_eq!(&region[6], "AccountService");
        assert_eq!(&region[headers.len() - 1], "Yes");
    }
}
