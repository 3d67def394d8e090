//! Field-level issues: fields, permissions, formulas, picklists, lookups

use super::{Context, insufficient, recommend_all, title_case};
use crate::diagnostics::{Diagnosis, FixStatus, GeneratedFix, Recommendation, RootCause, Severity};
use crate::error::Error;
use crate::metadata::FieldDescribe;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static PROFILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\w\s]+)\s+profile").expect("profile pattern compiles"));

static PICKLIST_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)value[:\s]+([^\s,\.]+)").expect("picklist value pattern compiles"));

fn describe_failed(diagnosis: &mut Diagnosis, error: &Error) {
    diagnosis.add_cause(RootCause::new(
        "Diagnosis Error",
        format!("Could not analyze field: {error}"),
    ));
}

pub(super) fn analyze_field(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    let (Some(object), Some(field_name)) = (ctx.object(), ctx.field()) else {
        insufficient(diagnosis, "Need both object_name and field_name to diagnose field issues");
        return;
    };
    let describe = match ctx.source.describe(object) {
        Ok(describe) => describe,
        Err(e) => return describe_failed(diagnosis, &e),
    };
    let Some(field) = describe.field_ignore_case(field_name) else {
        diagnosis.add_cause(
            RootCause::new(
                "Field Not Found",
                format!("Field '{field_name}' does not exist on {object}"),
            )
            .severity(Severity::High),
        );
        diagnosis.recommend(
            Recommendation::new(1, format!("Verify field API name (should it be {field_name}__c?)"))
                .details("Custom fields end with __c"),
        );
        return;
    };

    diagnosis.record(
        "field_details",
        json!({
            "label": field.label,
            "type": field.field_type,
            "required": field.is_required(),
            "updateable": field.updateable,
            "calculated": field.calculated,
            "visible": !field.deprecated_and_hidden,
        }),
    );

    if ctx.mentions("not visible") || ctx.mentions("cannot see") {
        diagnosis.add_cause(
            RootCause::new(
                "Field Level Security",
                "The field may be hidden by field-level security for the user's profile",
            )
            .severity(Severity::High),
        );
        recommend_all(
            diagnosis,
            [
                Recommendation::new(1, "Check field-level security settings").steps([
                    format!("1. Setup → Object Manager → {object} → Fields & Relationships"),
                    format!("2. Click '{}'", field.label),
                    "3. Click 'Set Field-Level Security'".to_string(),
                    "4. Make the field visible for the affected profiles".to_string(),
                ]),
                Recommendation::new(2, "Verify the field is on the page layout"),
            ],
        );
    } else if ctx.mentions("displays as multi-picklist") || ctx.mentions("wrong field type") {
        diagnosis.add_cause(
            RootCause::new(
                "Incorrect Field Type",
                format!("Field type is '{}', which may not match the requirement", field.field_type),
            )
            .severity(Severity::Medium),
        );
        diagnosis.recommend(
            Recommendation::new(1, "Change the field type in Setup")
                .details("Changing a field type can lose data; export the values first"),
        );
    } else if ctx.mentions("shows wrong records") && field.is_reference() {
        diagnosis.add_cause(
            RootCause::new(
                "Incorrect Lookup Configuration",
                format!("Current reference: {}", field.reference_to.join(", ")),
            )
            .severity(Severity::High),
        );
        diagnosis.recommend(Recommendation::new(1, "Verify the lookup points at the intended object"));
    } else if ctx.mentions("displays date and time") && field.field_type == "datetime" {
        diagnosis.add_cause(
            RootCause::new(
                "Wrong Field Type",
                "Field is DateTime but should be Date to show only the date",
            )
            .severity(Severity::Medium),
        );
        diagnosis.recommend(
            Recommendation::new(1, "Change the field type from DateTime to Date")
                .details("Existing values lose their time component"),
        );
    }
}

pub(super) fn analyze_permission(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    let profile = PROFILE_NAME
        .captures(&ctx.text)
        .and_then(|c| c.get(1))
        .map(|m| title_case(m.as_str().trim()));

    if ctx.mentions("cannot access")
        && let Some(field) = ctx.field()
    {
        let profile_label = profile.as_deref().unwrap_or("the user's");
        diagnosis.add_cause(
            RootCause::new(
                "Field Level Security",
                format!("The {profile_label} profile has no read access to '{field}'"),
            )
            .severity(Severity::High),
        );
        recommend_all(
            diagnosis,
            [
                Recommendation::new(1, "Grant field access to profile").steps([
                    format!(
                        "1. Setup → Object Manager → {} → Fields & Relationships",
                        ctx.object().unwrap_or("[Object]")
                    ),
                    format!("2. Click '{field}'"),
                    "3. Click 'Set Field-Level Security'".to_string(),
                    format!("4. Check 'Visible' for {profile_label} profile"),
                    "5. Save".to_string(),
                ]),
                Recommendation::new(2, "Alternatively, use Permission Set")
                    .details("Grant access to specific users without changing the profile"),
            ],
        );

        if ctx.auto_fix()
            && let (Some(profile), Some(object)) = (profile.as_deref(), ctx.object())
        {
            let fix = field_access_fix(ctx, profile, object, field);
            diagnosis.generated_fixes.push(fix);
        }
    } else if ctx.mentions("wrong license") || ctx.mentions("unable to access") {
        diagnosis.add_cause(
            RootCause::new(
                "User License Issue",
                "The user's license may not include access to this feature",
            )
            .severity(Severity::High),
        );
        recommend_all(
            diagnosis,
            [
                Recommendation::new(1, "Check the user's license type").details("Setup → Users → [User] → User License"),
                Recommendation::new(2, "Assign a permission set license if one is required"),
            ],
        );
    } else if ctx.mentions("wrong layout") {
        diagnosis.add_cause(
            RootCause::new(
                "Page Layout Assignment",
                "The profile is assigned a different page layout",
            )
            .severity(Severity::Medium),
        );
        diagnosis.recommend(Recommendation::new(1, "Review page layout assignments for the profile"));
    }
}

fn field_access_fix(ctx: &Context<'_>, profile: &str, object: &str, field: &str) -> GeneratedFix {
    let fix_type = "Field-Level Security Access".to_string();
    match ctx.source.profile(profile).as_deref() {
        Ok(None) => GeneratedFix {
            fix_type,
            status: FixStatus::Failed,
            message: format!("Profile '{profile}' not found"),
            name: None,
            content: None,
            steps: Vec::new(),
        },
        Ok(Some(_)) => GeneratedFix {
            fix_type,
            status: FixStatus::Generated,
            message: format!("Steps to grant {profile} access to {object}.{field}"),
            name: Some(format!("{object}.{field}")),
            content: None,
            steps: vec![
                format!("1. Setup → Profiles → {profile}"),
                format!("2. Object Settings → {object} → Edit"),
                format!("3. Field Permissions → {field} → check 'Read Access'"),
                "4. Save".to_string(),
            ],
        },
        Err(e) => GeneratedFix {
            fix_type,
            status: FixStatus::Failed,
            message: format!("Could not look up profile '{profile}': {e}"),
            name: None,
            content: None,
            steps: Vec::new(),
        },
    }
}

pub(super) fn analyze_formula(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    let (Some(object), Some(field_name)) = (ctx.object(), ctx.field()) else {
        insufficient(diagnosis, "Need both object_name and field_name");
        return;
    };
    let describe = match ctx.source.describe(object) {
        Ok(describe) => describe,
        Err(e) => return describe_failed(diagnosis, &e),
    };
    if let Some(field) = describe.field_ignore_case(field_name).filter(|f| f.calculated) {
        diagnosis.record(
            "field_details",
            json!({
                "label": field.label,
                "type": field.field_type,
                "formula": field.calculated_formula,
            }),
        );
    }

    if ctx.mentions("incorrect") || ctx.mentions("wrong value") {
        diagnosis.add_cause(
            RootCause::new(
                "Formula Logic Error",
                "The formula may have a logic error or not handle blank values",
            )
            .severity(Severity::High),
        );
        recommend_all(
            diagnosis,
            [
                Recommendation::new(1, "Review formula syntax")
                    .details("Check operator precedence and parentheses"),
                Recommendation::new(2, "Check for null value handling")
                    .details("Wrap inputs with BLANKVALUE() or check ISBLANK() first"),
                Recommendation::new(3, "Test formula with sample data"),
            ],
        );
    }

    if field_name.to_lowercase().contains("month") && ctx.mentions("invalid") {
        diagnosis.recommend(
            Recommendation::new(1, "Fix month calculation formula")
                .details("TEXT(MONTH(CloseDate)) returns the month number as text"),
        );
    }
}

pub(super) fn analyze_picklist(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    let (Some(object), Some(field_name)) = (ctx.object(), ctx.field()) else {
        return;
    };
    let describe = match ctx.source.describe(object) {
        Ok(describe) => describe,
        Err(e) => {
            warn!("Could not describe {object} for picklist analysis: {e}");
            return;
        }
    };
    let field = describe.field_ignore_case(field_name).filter(|f| f.is_picklist());
    if let Some(field) = field {
        diagnosis.record("field_details", picklist_details(field));
    }

    if ctx.mentions("cannot see") || ctx.mentions("missing") {
        let value = PICKLIST_VALUE
            .captures(&ctx.request.description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        diagnosis.add_cause(
            RootCause::new(
                "Picklist Value Not Available",
                "The value is inactive, missing, or not assigned to the record type",
            )
            .severity(Severity::Medium),
        );
        if let Some(value) = value {
            let known = field.and_then(|f| f.picklist_values.iter().find(|v| v.value == value));
            match known {
                Some(entry) if !entry.active => diagnosis.recommend(Recommendation::new(
                    1,
                    format!("Activate picklist value '{value}'"),
                )),
                Some(_) => {}
                None => diagnosis.recommend(Recommendation::new(
                    1,
                    format!("Add picklist value '{value}'"),
                )),
            }
        }
        diagnosis.recommend(
            Recommendation::new(2, "Check record type picklist value assignments")
                .details("Each record type exposes its own subset of values"),
        );
    }
}

fn picklist_details(field: &FieldDescribe) -> serde_json::Value {
    let all: Vec<&str> = field.picklist_values.iter().map(|v| v.value.as_str()).collect();
    let active: Vec<&str> = field.active_picklist_values().map(|v| v.value.as_str()).collect();
    json!({
        "type": field.field_type,
        "all_values": all,
        "active_values": active,
        "dependent": field.dependent_picklist,
    })
}

pub(super) fn analyze_lookup(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    if ctx.mentions("shows wrong records") || (ctx.mentions("shows") && ctx.mentions("instead of")) {
        diagnosis.add_cause(
            RootCause::new(
                "Incorrect Lookup Object",
                "The lookup field references the wrong object",
            )
            .severity(Severity::High),
        );
        recommend_all(
            diagnosis,
            [
                Recommendation::new(1, "Verify lookup field configuration")
                    .details("Setup → Object Manager → [Object] → Fields → [Lookup Field]"),
                Recommendation::new(2, "Delete and recreate lookup field")
                    .details("The target object of a lookup cannot be changed after creation"),
            ],
        );
    }
}
