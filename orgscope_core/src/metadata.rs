//! Typed records for schema describes and metadata query rows
//!
//! Responses are decoded into these structs at the client boundary so the
//! rest of the crate never pokes at untyped JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of describing an object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectDescribe {
    pub name: String,
    pub label: String,
    pub custom: bool,
    pub queryable: bool,
    pub createable: bool,
    pub updateable: bool,
    pub deletable: bool,
    pub fields: Vec<FieldDescribe>,
    pub child_relationships: Vec<ChildRelationship>,
}

impl ObjectDescribe {
    /// Look a field up by exact API name
    pub fn field(&self, name: &str) -> Option<&FieldDescribe> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Case-insensitive lookup, for user-typed names
    pub fn field_ignore_case(&self, name: &str) -> Option<&FieldDescribe> {
        self.field(name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
    }

    pub fn formula_fields(&self) -> impl Iterator<Item = &FieldDescribe> {
        self.fields
            .iter()
            .filter(|f| f.calculated_formula.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDescribe {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub custom: bool,
    pub nillable: bool,
    pub createable: bool,
    pub updateable: bool,
    pub calculated: bool,
    pub calculated_formula: Option<String>,
    pub reference_to: Vec<String>,
    pub relationship_name: Option<String>,
    pub cascade_delete: bool,
    pub picklist_values: Vec<PicklistValue>,
    pub restricted_picklist: bool,
    pub dependent_picklist: bool,
    pub controller_name: Option<String>,
    pub deprecated_and_hidden: bool,
    pub inline_help_text: Option<String>,
}

impl FieldDescribe {
    pub fn is_required(&self) -> bool {
        !self.nillable
    }

    pub fn is_reference(&self) -> bool {
        self.field_type == "reference"
    }

    pub fn is_picklist(&self) -> bool {
        matches!(self.field_type.as_str(), "picklist" | "multipicklist")
    }

    pub fn active_picklist_values(&self) -> impl Iterator<Item = &PicklistValue> {
        self.picklist_values.iter().filter(|v| v.active)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PicklistValue {
    pub value: String,
    pub label: Option<String>,
    pub active: bool,
    pub default_value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildRelationship {
    pub child_s_object: String,
    pub field: String,
    pub relationship_name: Option<String>,
    pub cascade_delete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApexClassRecord {
    pub id: Option<String>,
    pub name: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApexTriggerRecord {
    pub id: Option<String>,
    pub name: String,
    pub body: Option<String>,
    pub table_enum_or_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FlowRecord {
    pub id: Option<String>,
    pub api_name: Option<String>,
    pub label: Option<String>,
    pub status: Option<String>,
    pub process_type: Option<String>,
}

impl FlowRecord {
    /// Label when present, else API name
    pub fn display_name(&self) -> &str {
        self.label
            .as_deref()
            .filter(|l| !l.is_empty())
            .or(self.api_name.as_deref())
            .unwrap_or_default()
    }
}

/// Full flow definition, one per tooling lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FlowMetadataRecord {
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ValidationRuleRecord {
    pub id: Option<String>,
    pub validation_name: String,
    pub error_message: Option<String>,
    pub error_condition_formula: Option<String>,
    pub error_display_field: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WorkflowRuleRecord {
    pub id: Option<String>,
    pub name: String,
    pub formula: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LayoutRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LayoutItemRecord {
    pub field_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EmailTemplateRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub developer_name: Option<String>,
    pub subject: Option<String>,
    pub html_value: Option<String>,
    pub body: Option<String>,
}

impl EmailTemplateRecord {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.developer_name.as_deref())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ReportRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProfileRecord {
    pub id: String,
    pub name: String,
}

/// Column layout of a report, from the analytics describe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportMetadata {
    pub detail_columns: Vec<String>,
    pub aggregates: Vec<Value>,
    pub groupings_down: Vec<Value>,
    pub groupings_across: Vec<Value>,
    pub report_filters: Vec<ReportFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportFilter {
    pub column: String,
    pub operator: Option<String>,
    pub value: Option<String>,
}

/// Envelope returned by the analytics describe endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportDescribe {
    pub report_metadata: ReportMetadata,
}

impl ReportMetadata {
    /// Every column-like token the report touches, space separated
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<String> = self.detail_columns.clone();
        parts.extend(self.aggregates.iter().map(value_text));
        parts.extend(
            self.groupings_down
                .iter()
                .chain(&self.groupings_across)
                .map(value_text),
        );
        parts.extend(self.report_filters.iter().map(|f| f.column.clone()));
        parts.join(" ")
    }
}

/// Render a JSON value as plain text; strings lose their quotes
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
