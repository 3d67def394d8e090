//! Per-analysis snapshot of every metadata category a field can appear in
//!
//! The set is filled with one bulk fetch per category and then matched
//! against many fields entirely in memory.

use super::{UsageCategory, UsageConfig};
use crate::error::Result;
use crate::metadata::{
    ApexClassRecord, ApexTriggerRecord, EmailTemplateRecord, FlowMetadataRecord, FlowRecord,
    LayoutItemRecord, LayoutRecord, ObjectDescribe, ReportRecord, WorkflowRuleRecord,
};
use crate::soql::quote;
use crate::source::MetadataSource;
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Component name to its searchable text
pub type TextIndex = BTreeMap<String, String>;

/// Component names per category that mention one field
pub type CategoryMatches = BTreeMap<UsageCategory, Vec<String>>;

#[derive(Debug, Clone, Default)]
pub struct MetadataWorkingSet {
    texts: BTreeMap<UsageCategory, TextIndex>,
    layouts: BTreeMap<String, Vec<String>>,
    degraded: Vec<UsageCategory>,
}

impl MetadataWorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch every category for `object`
    ///
    /// A category whose fetch fails is logged, left empty and recorded in
    /// [`degraded`](Self::degraded); the other categories are unaffected.
    pub fn fetch(
        source: &MetadataSource<'_>,
        describe: &ObjectDescribe,
        include_reports: bool,
        config: &UsageConfig,
    ) -> Self {
        let object = describe.name.as_str();
        let mut set = Self::new();

        set.load(UsageCategory::ApexClasses, || fetch_apex_classes(source));
        set.load(UsageCategory::Triggers, || fetch_triggers(source));
        set.load(UsageCategory::Flows, || fetch_flows(source));
        set.load(UsageCategory::ValidationRules, || fetch_validation_rules(source, object));
        set.load(UsageCategory::WorkflowRules, || fetch_workflow_rules(source, object));
        set.load_layouts(|| fetch_layouts(source, object));
        if include_reports {
            set.load(UsageCategory::Reports, || fetch_reports(source, config.report_limit));
        } else {
            info!("Skipping reports; pass include_reports to analyze them");
        }
        set.load(UsageCategory::EmailTemplates, || {
            fetch_email_templates(source, config.email_template_limit)
        });
        set.texts
            .insert(UsageCategory::FormulaFields, formula_index(describe));

        set
    }

    fn load<F>(&mut self, category: UsageCategory, fetch: F)
    where
        F: FnOnce() -> Result<TextIndex>,
    {
        match fetch() {
            Ok(index) => {
                info!("Fetched {} {}", index.len(), category.label());
                self.texts.insert(category, index);
            }
            Err(e) => {
                warn!("Error fetching {}: {e}", category.label());
                self.texts.insert(category, TextIndex::new());
                self.degraded.push(category);
            }
        }
    }

    fn load_layouts<F>(&mut self, fetch: F)
    where
        F: FnOnce() -> Result<BTreeMap<String, Vec<String>>>,
    {
        match fetch() {
            Ok(layouts) => {
                info!("Fetched {} page layouts", layouts.len());
                self.layouts = layouts;
            }
            Err(e) => {
                warn!("Error fetching page layouts: {e}");
                self.degraded.push(UsageCategory::PageLayouts);
            }
        }
    }

    /// Add one text-searchable component
    pub fn insert_text(&mut self, category: UsageCategory, name: &str, text: &str) {
        self.texts
            .entry(category)
            .or_default()
            .insert(name.to_string(), text.to_string());
    }

    /// Add one page layout with the field names placed on it
    pub fn insert_layout(&mut self, name: &str, fields: Vec<String>) {
        self.layouts.insert(name.to_string(), fields);
    }

    /// Categories whose fetch failed
    pub fn degraded(&self) -> &[UsageCategory] {
        &self.degraded
    }

    /// Number of components held per category
    pub fn sizes(&self) -> BTreeMap<UsageCategory, usize> {
        UsageCategory::ALL
            .iter()
            .map(|&category| {
                let size = match category {
                    UsageCategory::PageLayouts => self.layouts.len(),
                    other => self.texts.get(&other).map_or(0, BTreeMap::len),
                };
                (category, size)
            })
            .collect()
    }

    /// Every component that mentions `field`, grouped by category
    ///
    /// Text categories use case-sensitive containment. Flows and reports
    /// also match when the field name appears in the component's own name,
    /// ignoring case. Layouts compare discrete field names.
    pub fn matches(&self, field: &str) -> CategoryMatches {
        let field_lower = field.to_lowercase();
        let mut found = CategoryMatches::new();

        for category in UsageCategory::ALL {
            let names: Vec<String> = match category {
                UsageCategory::PageLayouts => self
                    .layouts
                    .iter()
                    .filter(|(_, fields)| {
                        fields
                            .iter()
                            .any(|f| f == field || f.eq_ignore_ascii_case(field))
                    })
                    .map(|(name, _)| name.clone())
                    .collect(),
                UsageCategory::Flows | UsageCategory::Reports => self
                    .texts_for(category)
                    .filter(|(name, text)| {
                        text.contains(field) || name.to_lowercase().contains(&field_lower)
                    })
                    .map(|(name, _)| name.clone())
                    .collect(),
                UsageCategory::FormulaFields => self
                    .texts_for(category)
                    .filter(|(name, text)| name.as_str() != field && text.contains(field))
                    .map(|(name, _)| name.clone())
                    .collect(),
                _ => self
                    .texts_for(category)
                    .filter(|(_, text)| text.contains(field))
                    .map(|(name, _)| name.clone())
                    .collect(),
            };
            if !names.is_empty() {
                debug!("{field} found in {} {}", names.len(), category.label());
            }
            found.insert(category, names);
        }
        found
    }

    fn texts_for(&self, category: UsageCategory) -> impl Iterator<Item = (&String, &String)> {
        self.texts.get(&category).into_iter().flatten()
    }
}

fn fetch_apex_classes(source: &MetadataSource<'_>) -> Result<TextIndex> {
    let rows: Vec<ApexClassRecord> = source
        .client()
        .query_all("SELECT Id, Name, Body FROM ApexClass")?
        .decode()?;
    Ok(rows
        .into_iter()
        .map(|class| (class.name, class.body.unwrap_or_default()))
        .collect())
}

fn fetch_triggers(source: &MetadataSource<'_>) -> Result<TextIndex> {
    let rows: Vec<ApexTriggerRecord> = source
        .client()
        .query_all("SELECT Id, Name, Body FROM ApexTrigger")?
        .decode()?;
    Ok(rows
        .into_iter()
        .map(|trigger| (trigger.name, trigger.body.unwrap_or_default()))
        .collect())
}

/// Active flows, with their full definition when it can be fetched
fn fetch_flows(source: &MetadataSource<'_>) -> Result<TextIndex> {
    let client = source.client();
    let flows: Vec<FlowRecord> = client
        .tooling_query("SELECT Id, ApiName, Label, Status FROM Flow WHERE Status = 'Active'")?
        .decode()?;

    let mut index = TextIndex::new();
    for flow in flows {
        let label = flow.label.as_deref().unwrap_or_default();
        let api_name = flow.api_name.as_deref().unwrap_or_default();
        let metadata = flow.id.as_deref().map(|id| {
            client
                .tooling_query(&format!("SELECT Metadata FROM Flow WHERE Id = {}", quote(id)))
                .and_then(|result| result.decode::<FlowMetadataRecord>())
        });

        let text = match metadata {
            Some(Ok(rows)) => {
                let definition = rows
                    .into_iter()
                    .next()
                    .and_then(|row| row.metadata)
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                format!("{label} {api_name} {definition}")
            }
            Some(Err(e)) => {
                debug!("Could not fetch metadata for flow {label}: {e}");
                format!("{label} {api_name}")
            }
            None => format!("{label} {api_name}"),
        };
        index.insert(flow.display_name().to_string(), text);
    }
    Ok(index)
}

fn fetch_validation_rules(source: &MetadataSource<'_>, object: &str) -> Result<TextIndex> {
    let rules = source.active_validation_rules(object)?;
    Ok(rules
        .iter()
        .map(|rule| {
            let text = format!(
                "{} {} {}",
                rule.error_condition_formula.as_deref().unwrap_or_default(),
                rule.error_message.as_deref().unwrap_or_default(),
                rule.validation_name
            );
            (rule.validation_name.clone(), text)
        })
        .collect())
}

fn fetch_workflow_rules(source: &MetadataSource<'_>, object: &str) -> Result<TextIndex> {
    let query = format!(
        "SELECT Id, Name, Formula FROM WorkflowRule WHERE TableEnumOrId = {} AND IsActive = true",
        quote(object)
    );
    let rows: Vec<WorkflowRuleRecord> = source.client().tooling_query(&query)?.decode()?;
    Ok(rows
        .into_iter()
        .map(|rule| {
            let text = format!("{} {}", rule.formula.unwrap_or_default(), rule.name);
            (rule.name, text)
        })
        .collect())
}

/// Layout name to the field names placed on it, one lookup per layout
fn fetch_layouts(source: &MetadataSource<'_>, object: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let client = source.client();
    let query = format!(
        "SELECT Id, Name, TableEnumOrId FROM Layout WHERE TableEnumOrId = {}",
        quote(object)
    );
    let layouts: Vec<LayoutRecord> = client.tooling_query(&query)?.decode()?;

    let mut placed = BTreeMap::new();
    for layout in layouts {
        let items = client
            .tooling_query(&format!(
                "SELECT FieldName FROM FieldLayoutItem WHERE LayoutId = {}",
                quote(&layout.id)
            ))
            .and_then(|result| result.decode::<LayoutItemRecord>());
        let fields = match items {
            Ok(items) => items
                .into_iter()
                .filter_map(|item| item.field_name)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            Err(e) => {
                debug!("Error fetching fields for layout {}: {e}", layout.name);
                Vec::new()
            }
        };
        debug!("Layout '{}' has {} fields", layout.name, fields.len());
        placed.insert(layout.name, fields);
    }
    Ok(placed)
}

/// Reports, capped at `limit`, indexed by the columns they touch
fn fetch_reports(source: &MetadataSource<'_>, limit: usize) -> Result<TextIndex> {
    let client = source.client();
    let reports: Vec<ReportRecord> = client
        .query_all(&format!("SELECT Id, Name FROM Report LIMIT {limit}"))?
        .decode()?;

    let mut index = TextIndex::new();
    for report in reports.into_iter().take(limit) {
        let text = match client.report_metadata(&report.id) {
            Ok(metadata) => metadata.searchable_text(),
            Err(e) => {
                debug!("Skipping report {}: {e}", report.name);
                report.name.clone()
            }
        };
        index.insert(report.name, text);
    }
    Ok(index)
}

fn fetch_email_templates(source: &MetadataSource<'_>, limit: usize) -> Result<TextIndex> {
    let query = format!(
        "SELECT Id, Name, DeveloperName, Subject, HtmlValue, Body FROM EmailTemplate \
         WHERE IsActive = true LIMIT {limit}"
    );
    let rows: Vec<EmailTemplateRecord> = source.client().query_all(&query)?.decode()?;
    Ok(rows
        .iter()
        .map(|template| {
            let text = [
                template.subject.as_deref(),
                template.html_value.as_deref(),
                template.body.as_deref(),
                template.developer_name.as_deref(),
            ]
            .map(Option::unwrap_or_default)
            .join(" ");
            (template.display_name().to_string(), text)
        })
        .collect())
}

fn formula_index(describe: &ObjectDescribe) -> TextIndex {
    describe
        .formula_fields()
        .map(|field| {
            (
                field.name.clone(),
                field.calculated_formula.clone().unwrap_or_default(),
            )
        })
        .collect()
}
