//! Field-usage auditing
//!
//! [`FieldUsageAnalyzer`] answers "where is this field referenced?" for one
//! field or every field on an object. It fetches each metadata category
//! once into a [`MetadataWorkingSet`] and then matches all fields against
//! that snapshot in memory, so the number of API calls does not grow with
//! the number of fields.

mod export;
mod working_set;

pub use self::export::{default_file_name, write_csv, write_csv_file};
pub use self::working_set::{CategoryMatches, MetadataWorkingSet, TextIndex};

use crate::error::{NotFoundError, Result, ValidationError};
use crate::metadata::FieldDescribe;
use crate::soql;
use crate::source::MetadataSource;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Usage engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Maximum reports inspected when reports are included
    pub report_limit: usize,
    /// Maximum active email templates fetched
    pub email_template_limit: usize,
    /// Log progress every this many fields
    pub progress_every: usize,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            report_limit: 50,
            email_template_limit: 500,
            progress_every: 50,
        }
    }
}

impl UsageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.report_limit == 0 {
            return Err(ValidationError::invalid_configuration("usage.report_limit must be at least 1").into());
        }
        if self.email_template_limit == 0 {
            return Err(ValidationError::invalid_configuration(
                "usage.email_template_limit must be at least 1",
            )
            .into());
        }
        if self.progress_every == 0 {
            return Err(ValidationError::invalid_configuration("usage.progress_every must be at least 1").into());
        }
        Ok(())
    }
}

/// Metadata categories a field can be referenced from, in export order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCategory {
    ApexClasses,
    Triggers,
    Flows,
    ValidationRules,
    FormulaFields,
    WorkflowRules,
    PageLayouts,
    EmailTemplates,
    Reports,
}

impl UsageCategory {
    pub const ALL: [UsageCategory; 9] = [
        Self::ApexClasses,
        Self::Triggers,
        Self::Flows,
        Self::ValidationRules,
        Self::FormulaFields,
        Self::WorkflowRules,
        Self::PageLayouts,
        Self::EmailTemplates,
        Self::Reports,
    ];

    /// Human-readable name, also the CSV column name
    pub fn label(&self) -> &'static str {
        match self {
            Self::ApexClasses => "Apex Classes",
            Self::Triggers => "Triggers",
            Self::Flows => "Flows",
            Self::ValidationRules => "Validation Rules",
            Self::FormulaFields => "Formula Fields",
            Self::WorkflowRules => "Workflow Rules",
            Self::PageLayouts => "Page Layouts",
            Self::EmailTemplates => "Email Templates",
            Self::Reports => "Reports",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::ApexClasses => "apex_classes",
            Self::Triggers => "triggers",
            Self::Flows => "flows",
            Self::ValidationRules => "validation_rules",
            Self::FormulaFields => "formula_fields",
            Self::WorkflowRules => "workflow_rules",
            Self::PageLayouts => "page_layouts",
            Self::EmailTemplates => "email_templates",
            Self::Reports => "reports",
        }
    }
}

impl fmt::Display for UsageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where one field is referenced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldUsageRecord {
    field_name: String,
    field_label: String,
    field_type: String,
    is_custom: bool,
    is_required: bool,
    #[serde(flatten)]
    usage: CategoryMatches,
    total_usage: usize,
    is_referenced: bool,
}

impl FieldUsageRecord {
    pub fn new(field: &FieldDescribe, usage: CategoryMatches) -> Self {
        let total_usage = usage.values().map(Vec::len).sum();
        Self {
            field_name: field.name.clone(),
            field_label: field.label.clone(),
            field_type: field.field_type.clone(),
            is_custom: field.custom,
            is_required: field.is_required(),
            usage,
            total_usage,
            is_referenced: total_usage > 0,
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn field_label(&self) -> &str {
        &self.field_label
    }

    pub fn field_type(&self) -> &str {
        &self.field_type
    }

    pub fn is_custom(&self) -> bool {
        self.is_custom
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    /// Components in `category` that reference the field
    pub fn usages(&self, category: UsageCategory) -> &[String] {
        self.usage.get(&category).map_or(&[], Vec::as_slice)
    }

    pub fn usage(&self) -> &CategoryMatches {
        &self.usage
    }

    pub fn total_usage(&self) -> usize {
        self.total_usage
    }

    pub fn is_referenced(&self) -> bool {
        self.is_referenced
    }
}

/// Totals across every analyzed field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub referenced_fields: usize,
    pub unreferenced_fields: usize,
    /// Sum of matches per category
    pub category_totals: BTreeMap<UsageCategory, usize>,
}

impl UsageSummary {
    fn from_records(records: &[FieldUsageRecord]) -> Self {
        let referenced_fields = records.iter().filter(|r| r.is_referenced()).count();
        let category_totals = UsageCategory::ALL
            .iter()
            .map(|&category| {
                let total = records.iter().map(|r| r.usages(category).len()).sum();
                (category, total)
            })
            .collect();
        Self {
            referenced_fields,
            unreferenced_fields: records.len() - referenced_fields,
            category_totals,
        }
    }
}

/// Result of one usage analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub object: String,
    /// `"ALL"` or the single field analyzed
    pub field_analyzed: String,
    pub generated_at: DateTime<Utc>,
    pub total_fields_analyzed: usize,
    pub summary: UsageSummary,
    /// Components fetched per category
    pub working_set_sizes: BTreeMap<UsageCategory, usize>,
    /// Categories that could not be fetched and were treated as empty
    pub degraded_categories: Vec<UsageCategory>,
    pub fields: Vec<FieldUsageRecord>,
}

impl UsageReport {
    pub fn field(&self, name: &str) -> Option<&FieldUsageRecord> {
        self.fields.iter().find(|r| r.field_name() == name)
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded_categories.is_empty()
    }
}

/// Cross-references fields against the org's metadata
#[derive(Debug)]
pub struct FieldUsageAnalyzer<'a> {
    source: MetadataSource<'a>,
    config: UsageConfig,
}

impl<'a> FieldUsageAnalyzer<'a> {
    pub fn new(source: MetadataSource<'a>, config: UsageConfig) -> Self {
        Self { source, config }
    }

    /// Analyze `field`, or every field on `object` when `field` is `None`
    ///
    /// Failing to describe the object, or naming a field the object does not
    /// have, is an error. A category that cannot be fetched is not: it is
    /// reported empty and listed in [`UsageReport::degraded_categories`].
    pub fn analyze(
        &self,
        object: &str,
        field: Option<&str>,
        include_reports: bool,
    ) -> Result<UsageReport> {
        soql::validate_api_name("object", object)?;
        if let Some(name) = field {
            soql::validate_api_name("field", name)?;
        }
        info!("Starting field usage analysis for {object}.{}", field.unwrap_or("ALL"));

        let describe = self.source.describe(object)?;
        let targets: Vec<&FieldDescribe> = match field {
            Some(name) => {
                let found = describe
                    .field(name)
                    .ok_or_else(|| NotFoundError::field(object, name))?;
                vec![found]
            }
            None => describe.fields.iter().collect(),
        };
        info!("Analyzing {} fields", targets.len());

        let working_set =
            MetadataWorkingSet::fetch(&self.source, &describe, include_reports, &self.config);
        let records = self.match_fields(&working_set, &targets);

        Ok(UsageReport {
            object: object.to_string(),
            field_analyzed: field.unwrap_or("ALL").to_string(),
            generated_at: Utc::now(),
            total_fields_analyzed: records.len(),
            summary: UsageSummary::from_records(&records),
            working_set_sizes: working_set.sizes(),
            degraded_categories: working_set.degraded().to_vec(),
            fields: records,
        })
    }

    fn match_fields(
        &self,
        working_set: &MetadataWorkingSet,
        targets: &[&FieldDescribe],
    ) -> Vec<FieldUsageRecord> {
        let total = targets.len();
        let records = targets
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                // A zero interval (unvalidated config) just turns progress logging off
                if (idx + 1).checked_rem(self.config.progress_every) == Some(0) {
                    info!("Progress: [{}/{total}] fields analyzed", idx + 1);
                }
                FieldUsageRecord::new(field, working_set.matches(&field.name))
            })
            .collect::<Vec<_>>();
        info!("Completed analysis of {} fields", records.len());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> FieldDescribe {
        FieldDescribe {
            name: name.to_string(),
            label: name.trim_end_matches("__c").to_string(),
            field_type: "string".to_string(),
            custom: name.ends_with("__c"),
            nillable: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_totals() {
        let mut usage = CategoryMatches::new();
        usage.insert(UsageCategory::ApexClasses, vec!["A".into(), "B".into()]);
        usage.insert(UsageCategory::PageLayouts, vec!["Layout".into()]);
        let record = FieldUsageRecord::new(&field("Region__c"), usage);

        assert_eq!(record.total_usage(), 3);
        assert!(record.is_referenced());
        assert!(record.is_custom());
        assert!(!record.is_required());
        assert!(record.usages(UsageCategory::Flows).is_empty());
    }

    #[test]
    fn test_unreferenced_record() {
        let record = FieldUsageRecord::new(&field("Name"), CategoryMatches::new());
        assert_eq!(record.total_usage(), 0);
        assert!(!record.is_referenced());
    }

    #[test]
    fn test_summary_counts() {
        let mut usage = CategoryMatches::new();
        usage.insert(UsageCategory::Triggers, vec!["T".into()]);
        let records = vec![
            FieldUsageRecord::new(&field("A__c"), usage),
            FieldUsageRecord::new(&field("B__c"), CategoryMatches::new()),
        ];
        let summary = UsageSummary::from_records(&records);

        assert_eq!(summary.referenced_fields, 1);
        assert_eq!(summary.unreferenced_fields, 1);
        assert_eq!(summary.category_totals[&UsageCategory::Triggers], 1);
        assert_eq!(summary.category_totals.len(), 9);
    }

    #[test]
    fn test_record_serializes_categories_flat() {
        let mut usage = CategoryMatches::new();
        usage.insert(UsageCategory::EmailTemplates, vec!["Welcome".into()]);
        let json = serde_json::to_value(FieldUsageRecord::new(&field("Region__c"), usage)).unwrap();

        assert_eq!(json["email_templates"][0], "Welcome");
        assert_eq!(json["total_usage"], 1);
        assert_eq!(json["is_referenced"], true);
    }

    #[test]
    fn test_config_validation() {
        assert!(UsageConfig::default().validate().is_ok());
        let config = UsageConfig {
            progress_every: 0,
            ..UsageConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_category_labels_in_export_order() {
        let labels: Vec<&str> = UsageCategory::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(labels[0], "Apex Classes");
        assert_eq!(labels[4], "Formula Fields");
        assert_eq!(labels[8], "Reports");
    }
}
