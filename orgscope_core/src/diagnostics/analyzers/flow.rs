//! Flow issues: blank-value handling, decision logic, inactive flows

use super::{Context, recommend_all, title_case};
use crate::diagnostics::{Diagnosis, Recommendation, RootCause, Severity};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static BLANK_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w+(?:\s+\w+)?)\s+field\s+is\s+blank").expect("blank field pattern compiles")
});

pub(super) fn analyze(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    if ctx.is_scenario(&[4]) || (ctx.mentions("fails when") && ctx.mentions("blank")) {
        blank_value(ctx, diagnosis);
    } else if ctx.is_scenario(&[5]) || (ctx.mentions("decision") && ctx.mentions("instead")) {
        diagnosis.add_cause(
            RootCause::new(
                "Incorrect Decision Logic",
                "Decision element has wrong condition or comparison",
            )
            .severity(Severity::Medium)
            .scenario(5),
        );
        recommend_all(
            diagnosis,
            [
                Recommendation::new(1, "Review Decision element conditions").details(
                    "Common mistakes: 'Closed' instead of 'Closed Won', Contains instead of Equals",
                ),
                Recommendation::new(2, "Check for exact field API names and values")
                    .details("Picklist values must match exactly (case-sensitive)"),
            ],
        );
    }

    if let Some(name) = ctx.component() {
        match ctx.source.flow(name) {
            Ok(Some(flow)) => {
                let status = flow.status.clone().unwrap_or_default();
                diagnosis.record(
                    "flow_details",
                    json!({
                        "label": flow.label,
                        "api_name": flow.api_name,
                        "type": flow.process_type,
                        "status": status,
                    }),
                );
                if status != "Active" {
                    diagnosis.add_cause(
                        RootCause::new(
                            "Flow Not Active",
                            format!("Flow status is '{status}' - needs to be activated"),
                        )
                        .severity(Severity::High),
                    );
                    diagnosis.recommend(Recommendation::new(1, "Activate the flow in Flow Builder"));
                }
            }
            Ok(None) => warn!("Flow '{name}' not found"),
            Err(e) => warn!("Could not fetch flow details: {e}"),
        }
    }
}

fn blank_value(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    let field = BLANK_FIELD
        .captures(&ctx.text)
        .and_then(|c| c.get(1))
        .map(|m| title_case(m.as_str()).replace(' ', ""))
        .unwrap_or_else(|| "Revenue".to_string());

    diagnosis.add_cause(
        RootCause::new(
            "Missing Null/Blank Value Handling",
            format!(
                "Flow fails when the '{field}' field is blank. Record-triggered flows must \
                 handle null values explicitly."
            ),
        )
        .severity(Severity::High)
        .scenario(4),
    );
    recommend_all(
        diagnosis,
        [
            Recommendation::new(1, "Add null check BEFORE using the field value")
                .details(format!(
                    "Add a Decision element at the start of the flow checking \
                     NOT(ISBLANK({{!$Record.{field}}}))"
                ))
                .steps([
                    "1. Open Flow Builder".to_string(),
                    "2. Add a Decision element BEFORE the Update element".to_string(),
                    format!("3. Create outcome 'Field Has Value': {{!$Record.{field}}} Is Null = False"),
                    "4. Route 'Field Has Value' to the Update element".to_string(),
                    "5. Route 'Default Outcome' to End".to_string(),
                ]),
            Recommendation::new(2, "Alternative: Use formula with BLANKVALUE()")
                .details(format!("BLANKVALUE({{!$Record.{field}}}, 0) supplies a default value")),
            Recommendation::new(3, "Add Entry Conditions to prevent flow from running on blank values")
                .details(format!("Entry condition: {{!$Record.{field}}} Is Null = False")),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_field_extraction() {
        let caps = BLANK_FIELD
            .captures("flow fails when account revenue field is blank")
            .unwrap();
        assert_eq!(title_case(&caps[1]).replace(' ', ""), "AccountRevenue");
    }
}
