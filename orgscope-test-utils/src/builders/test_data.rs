//! Test data builders for schema describes and metadata rows

use orgscope_core::metadata::{FieldDescribe, ObjectDescribe, PicklistValue};
use serde_json::{Value, json};

/// Builder for a single field describe
///
/// Fields start as a nillable, updateable `string`; names ending in `__c`
/// are marked custom.
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    field: FieldDescribe,
}

impl FieldBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            field: FieldDescribe {
                name: name.to_string(),
                label: name.trim_end_matches("__c").replace('_', " "),
                field_type: "string".to_string(),
                custom: name.ends_with("__c"),
                nillable: true,
                createable: true,
                updateable: true,
                ..Default::default()
            },
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.field.label = label.to_string();
        self
    }

    pub fn field_type(mut self, field_type: &str) -> Self {
        self.field.field_type = field_type.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.field.nillable = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.field.createable = false;
        self.field.updateable = false;
        self
    }

    /// Make this a formula field computing `formula`
    pub fn formula(mut self, formula: &str) -> Self {
        self.field.calculated = true;
        self.field.calculated_formula = Some(formula.to_string());
        self.read_only()
    }

    pub fn reference(mut self, target: &str) -> Self {
        self.field.field_type = "reference".to_string();
        self.field.reference_to = vec![target.to_string()];
        self
    }

    /// Picklist with `(value, active)` entries
    pub fn picklist(mut self, values: &[(&str, bool)]) -> Self {
        self.field.field_type = "picklist".to_string();
        self.field.picklist_values = values
            .iter()
            .map(|(value, active)| PicklistValue {
                value: value.to_string(),
                label: Some(value.to_string()),
                active: *active,
                default_value: false,
            })
            .collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.field.deprecated_and_hidden = true;
        self
    }

    pub fn build(self) -> FieldDescribe {
        self.field
    }
}

/// Builder for an object describe
#[derive(Debug, Clone)]
pub struct DescribeBuilder {
    describe: ObjectDescribe,
}

impl DescribeBuilder {
    pub fn new(object: &str) -> Self {
        Self {
            describe: ObjectDescribe {
                name: object.to_string(),
                label: object.trim_end_matches("__c").replace('_', " "),
                custom: object.ends_with("__c"),
                queryable: true,
                createable: true,
                updateable: true,
                deletable: true,
                ..Default::default()
            },
        }
    }

    pub fn field(mut self, field: impl Into<FieldDescribe>) -> Self {
        self.describe.fields.push(field.into());
        self
    }

    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = FieldBuilder>,
    {
        self.describe.fields.extend(fields.into_iter().map(FieldBuilder::build));
        self
    }

    pub fn build(self) -> ObjectDescribe {
        self.describe
    }
}

impl From<FieldBuilder> for FieldDescribe {
    fn from(builder: FieldBuilder) -> Self {
        builder.build()
    }
}

/// Account with a typical mix of standard, custom and formula fields
pub fn account_describe() -> ObjectDescribe {
    DescribeBuilder::new("Account")
        .fields([
            FieldBuilder::new("Id").field_type("id").required().read_only(),
            FieldBuilder::new("Name").required(),
            FieldBuilder::new("Phone").field_type("phone"),
            FieldBuilder::new("Region__c").label("Region"),
            FieldBuilder::new("Tier__c")
                .label("Tier")
                .picklist(&[("Gold", true), ("Silver", true), ("Bronze", false)]),
            FieldBuilder::new("Region_Code__c")
                .label("Region Code")
                .formula("LEFT(Region__c, 3)"),
            FieldBuilder::new("Parent_Account__c")
                .label("Parent Account")
                .reference("Account"),
            FieldBuilder::new("Unused__c").label("Unused"),
        ])
        .build()
}

// Row fixtures, shaped like query API records

pub fn apex_class(name: &str, body: &str) -> Value {
    json!({"attributes": {"type": "ApexClass"}, "Id": format!("01p{name}"), "Name": name, "Body": body})
}

pub fn apex_trigger(name: &str, object: &str, body: &str) -> Value {
    json!({
        "attributes": {"type": "ApexTrigger"},
        "Id": format!("01q{name}"),
        "Name": name,
        "Body": body,
        "TableEnumOrId": object,
        "Status": "Active"
    })
}

pub fn flow(id: &str, api_name: &str, label: &str, status: &str) -> Value {
    json!({
        "Id": id,
        "ApiName": api_name,
        "Label": label,
        "Status": status,
        "ProcessType": "AutoLaunchedFlow"
    })
}

pub fn flow_metadata(metadata: Value) -> Value {
    json!({"Metadata": metadata})
}

pub fn validation_rule(name: &str, formula: &str, message: &str) -> Value {
    json!({
        "Id": format!("03d{name}"),
        "ValidationName": name,
        "ErrorConditionFormula": formula,
        "ErrorMessage": message,
        "Active": true
    })
}

pub fn workflow_rule(name: &str, formula: &str) -> Value {
    json!({"Id": format!("01Q{name}"), "Name": name, "Formula": formula})
}

pub fn layout(id: &str, name: &str) -> Value {
    json!({"Id": id, "Name": name})
}

pub fn layout_item(field: &str) -> Value {
    json!({"FieldName": field})
}

pub fn report(id: &str, name: &str) -> Value {
    json!({"Id": id, "Name": name})
}

pub fn email_template(name: &str, subject: &str, body: &str) -> Value {
    json!({
        "Id": format!("00X{name}"),
        "Name": name,
        "DeveloperName": name.replace(' ', "_"),
        "Subject": subject,
        "HtmlValue": null,
        "Body": body
    })
}
