//! Validation rule issues
//!
//! Rules cannot be deployed through the query API, so every remedy here is
//! a formula plus manual steps.

use super::{Context, recommend_all, title_case};
use crate::diagnostics::{Diagnosis, Recommendation, RootCause, Severity};
use crate::metadata::ValidationRuleRecord;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static PAST_DATE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w+)\s+(?:date\s+)?allows?\s+past").expect("past date pattern compiles")
});

static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?(\d[\d,]*)").expect("amount pattern compiles"));

static MISSING_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"without\s+(?:a\s+)?(\w+)").expect("missing field pattern compiles"));

pub(super) fn analyze(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    let rules = existing_rules(ctx, diagnosis);

    if ctx.is_scenario(&[20]) || ctx.mentions("allows past dates") {
        past_dates(ctx, diagnosis);
    } else if ctx.is_scenario(&[21]) || ctx.mentions("cannot exceed") {
        too_restrictive(ctx, diagnosis, &rules);
    } else if ctx.is_scenario(&[9, 24])
        || ctx.mentions("saved without")
        || ctx.mentions("without a phone")
    {
        missing_required(ctx, diagnosis);
    } else if ctx.is_scenario(&[25]) || ctx.mentions("unclear") {
        unclear_message(diagnosis);
    }
}

fn existing_rules(ctx: &Context<'_>, diagnosis: &mut Diagnosis) -> Vec<ValidationRuleRecord> {
    let Some(object) = ctx.object() else {
        return Vec::new();
    };
    match ctx.source.validation_rules(object, ctx.component()) {
        Ok(rules) => {
            if !rules.is_empty() {
                info!("Found {} validation rule(s) on {object}", rules.len());
                diagnosis.record("existing_rules", json!(*rules));
            }
            rules.to_vec()
        }
        Err(e) => {
            warn!("Could not fetch validation rules: {e}");
            Vec::new()
        }
    }
}

fn manual_steps(object: &str, rule_name: &str, formula: &str, message: &str, location: &str) -> Vec<String> {
    vec![
        format!("1. Go to Setup → Object Manager → {object} → Validation Rules"),
        "2. Click 'New'".to_string(),
        format!("3. Rule Name: {rule_name}"),
        format!("4. Error Condition Formula: {formula}"),
        format!("5. Error Message: {message}"),
        format!("6. Error Location: Field → {location}"),
        "7. Save".to_string(),
    ]
}

fn past_dates(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    let date_field = PAST_DATE_FIELD
        .captures(&ctx.text)
        .and_then(|c| c.get(1))
        .map(|m| format!("{}Date", title_case(m.as_str())))
        .unwrap_or_else(|| "CloseDate".to_string());
    let object = ctx.object().unwrap_or("Opportunity");

    diagnosis.add_cause(
        RootCause::new(
            "Missing Date Validation Rule",
            format!("The '{date_field}' field allows past dates, which can cause data quality issues."),
        )
        .severity(Severity::High)
        .scenario(20),
    );

    let formula = format!("{date_field} < TODAY()");
    let message = format!(
        "{} cannot be in the past. Please select today or a future date.",
        date_field.replace("Date", " Date")
    );
    let rule_name = format!("Prevent_Past_{date_field}");
    diagnosis.recommend(
        Recommendation::new(1, format!("Create validation rule to prevent past dates on {date_field}"))
            .code(formula.clone())
            .steps(manual_steps(object, &rule_name, &formula, &message, &date_field)),
    );
}

fn too_restrictive(ctx: &Context<'_>, diagnosis: &mut Diagnosis, rules: &[ValidationRuleRecord]) {
    let limit = AMOUNT
        .captures(&ctx.request.description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace(',', ""))
        .unwrap_or_else(|| "5000".to_string());

    diagnosis.add_cause(
        RootCause::new(
            "Overly Restrictive Validation Rule",
            format!(
                "Validation rule is blocking amounts over ${limit}. This may be too restrictive \
                 for legitimate business cases."
            ),
        )
        .severity(Severity::Medium)
        .scenario(21),
    );

    let offending = rules.iter().find(|rule| {
        let formula = rule
            .error_condition_formula
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        formula.contains("amount") && formula.contains('>')
    });
    let condition = match offending {
        Some(rule) => {
            let formula = rule.error_condition_formula.clone().unwrap_or_default();
            diagnosis.record(
                "current_rule_analysis",
                json!({
                    "rule_name": rule.validation_name,
                    "current_formula": formula,
                    "current_error_message": rule.error_message,
                    "is_active": rule.active,
                }),
            );
            formula
        }
        None => format!("Amount > {limit}"),
    };
    let corrected = format!(
        "AND(\n    {condition},\n    $Profile.Name <> \"System Administrator\",\n    \
         $Profile.Name <> \"Sales Manager\"\n)"
    );
    let rule_label = ctx
        .component()
        .map(str::to_string)
        .or_else(|| offending.map(|r| r.validation_name.clone()))
        .unwrap_or_else(|| "[Amount Validation Rule]".to_string());

    recommend_all(
        diagnosis,
        [
            Recommendation::new(1, "Add profile exemption to validation rule")
                .code(corrected)
                .steps([
                    format!(
                        "1. Go to Setup → Object Manager → {} → Validation Rules",
                        ctx.object().unwrap_or("Opportunity")
                    ),
                    format!("2. Edit the rule: {rule_label}"),
                    "3. Replace the Error Condition Formula with the corrected formula".to_string(),
                    "4. Make the Error Message explain how to get approval".to_string(),
                    "5. Save the rule".to_string(),
                ]),
            Recommendation::new(2, "Alternative: Increase the threshold").details(format!(
                "Raise the limit from ${limit} if business requirements have changed"
            )),
            Recommendation::new(3, "Alternative: Use Approval Process instead").details(
                "Route amounts over the threshold to an approval process instead of blocking them",
            ),
        ],
    );
}

fn missing_required(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    let field = MISSING_FIELD
        .captures(&ctx.text)
        .and_then(|c| c.get(1))
        .map(|m| title_case(m.as_str()))
        .unwrap_or_else(|| "Phone".to_string());
    let object = ctx.object().unwrap_or(if ctx.mentions("contact") {
        "Contact"
    } else {
        "Account"
    });

    diagnosis.add_cause(
        RootCause::new(
            "Missing Required Field Validation",
            format!(
                "{object} records can be saved without a {field}. A validation rule needs to be created."
            ),
        )
        .severity(Severity::High)
        .scenario(ctx.scenario.filter(|id| *id == 9).unwrap_or(24)),
    );

    let formula = format!("ISBLANK({field})");
    let message = format!("Please enter a {field} before saving.");
    let rule_name = format!("Require_{field}");
    diagnosis.recommend(
        Recommendation::new(1, format!("Create validation rule to require {field} field"))
            .code(formula.clone())
            .steps(manual_steps(object, &rule_name, &formula, &message, &field)),
    );
}

fn unclear_message(diagnosis: &mut Diagnosis) {
    diagnosis.add_cause(
        RootCause::new(
            "Confusing Validation Error Message",
            "The validation rule error message is not clear to users. Error messages should be \
             specific and actionable.",
        )
        .severity(Severity::Medium)
        .scenario(25),
    );
    recommend_all(
        diagnosis,
        [
            Recommendation::new(1, "Update validation rule error message to be clear and actionable")
                .steps([
                    "State what the user needs to do, not just what's wrong",
                    "Name the field that needs attention",
                    "List the valid values or format where applicable",
                    "Avoid technical jargon",
                ]),
            Recommendation::new(2, "Set Error Location to the specific field")
                .details("This highlights the problematic field for the user"),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_extraction() {
        let caps = AMOUNT.captures("Amount cannot exceed $10,000 for reps").unwrap();
        assert_eq!(caps[1].replace(',', ""), "10000");
    }

    #[test]
    fn test_past_date_field() {
        let caps = PAST_DATE_FIELD
            .captures("opportunity close date allows past dates")
            .unwrap();
        assert_eq!(format!("{}Date", title_case(&caps[1])), "CloseDate");
    }

    #[test]
    fn test_missing_field() {
        let caps = MISSING_FIELD.captures("accounts saved without a phone").unwrap();
        assert_eq!(title_case(&caps[1]), "Phone");
    }
}
