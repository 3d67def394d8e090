//! Page layout and report visibility issues, plus the fallback for unknown types

use super::{Context, recommend_all, title_case};
use crate::diagnostics::{Diagnosis, IssueType, Recommendation, RootCause, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATED_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w+(?:\s+\w+)?)\s+related\s+list").expect("related list pattern compiles")
});

pub(super) fn analyze_layout(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    if ctx.is_scenario(&[7]) || ctx.mentions("wrong layout") || ctx.mentions("wrong page") {
        diagnosis.add_cause(
            RootCause::new(
                "Incorrect Layout Assignment",
                "The profile or record type is assigned a different page layout",
            )
            .severity(Severity::High)
            .scenario(7),
        );
        recommend_all(
            diagnosis,
            [
                Recommendation::new(1, "Check page layout assignment").steps([
                    "1. Setup → Object Manager → [Object] → Page Layouts",
                    "2. Click 'Page Layout Assignment'",
                    "3. Find the user's profile and record type",
                    "4. Assign the correct layout",
                ]),
                Recommendation::new(2, "Check Lightning record page activation")
                    .details("A Lightning page assigned by app, record type or profile overrides the layout"),
            ],
        );
    } else if ctx.is_scenario(&[18, 23]) || (ctx.mentions("related list") && ctx.mentions("missing")) {
        let list = RELATED_LIST
            .captures(&ctx.text)
            .and_then(|c| c.get(1))
            .map(|m| title_case(m.as_str()))
            .unwrap_or_else(|| "Related Records".to_string());
        diagnosis.add_cause(
            RootCause::new(
                format!("Missing Related List: {list}"),
                format!("The '{list}' related list is not on the page layout"),
            )
            .severity(Severity::Medium)
            .scenario(ctx.scenario.filter(|id| *id == 23).unwrap_or(18)),
        );
        diagnosis.recommend(
            Recommendation::new(1, format!("Add '{list}' related list to page layout")).steps([
                "1. Setup → Object Manager → [Object] → Page Layouts".to_string(),
                "2. Edit the layout".to_string(),
                "3. Select 'Related Lists' in the palette".to_string(),
                format!("4. Drag '{list}' onto the layout"),
                "5. Save".to_string(),
            ]),
        );
    } else if ctx.is_scenario(&[10]) || (ctx.mentions("count") && ctx.mentions("missing")) {
        diagnosis.add_cause(
            RootCause::new(
                "Related List Count Not Displayed",
                "Lightning related lists hide record counts unless the component is configured to show them",
            )
            .severity(Severity::Low)
            .scenario(10),
        );
        diagnosis.recommend(
            Recommendation::new(1, "Use the Related List - Single component")
                .details("Enable 'Show list view action bar' and record counts in Lightning App Builder"),
        );
    } else if ctx.is_scenario(&[15]) || (ctx.mentions("missing") && ctx.mentions("field")) {
        diagnosis.add_cause(
            RootCause::new(
                "Fields Missing from Related Record Component",
                "The related record component uses a layout or field set without those fields",
            )
            .severity(Severity::Medium)
            .scenario(15),
        );
        recommend_all(
            diagnosis,
            [
                Recommendation::new(1, "Edit the Related Record component in Lightning App Builder")
                    .details("Pick the layout that holds the missing fields"),
                Recommendation::new(2, "Add the fields to the layout the component uses"),
            ],
        );
    } else if ctx.mentions("missing") || ctx.mentions("not visible") {
        diagnosis.add_cause(
            RootCause::new(
                "Component Not on Layout",
                "The field or component is not on the assigned page layout",
            )
            .severity(Severity::Medium),
        );
        diagnosis.recommend(
            Recommendation::new(1, "Add the missing component to the page layout")
                .details("Setup → Object Manager → [Object] → Page Layouts → Edit"),
        );
    }
}

pub(super) fn analyze_report(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    if ctx.mentions("field is not visible") || ctx.mentions("missing") {
        diagnosis.add_cause(
            RootCause::new(
                "Field Not Available in Reports",
                "The field is hidden from the report runner or missing from the report type",
            )
            .severity(Severity::Medium),
        );
        recommend_all(
            diagnosis,
            [
                Recommendation::new(1, "Check field-level security for report runner's profile"),
                Recommendation::new(2, "Verify field is not hidden from reports")
                    .details("Setup → Report Types → [Type] → Edit Layout"),
            ],
        );
    }
}

/// Issue types nothing recognizes get a pointer at the supported ones
pub(crate) fn generic(issue_type: &str, diagnosis: &mut Diagnosis) {
    let supported = IssueType::ALL
        .iter()
        .map(IssueType::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    diagnosis.add_cause(RootCause::new(
        "Unknown Issue Type",
        format!("Issue type '{issue_type}' is not recognized. Supported types: {supported}"),
    ));
    diagnosis.recommend(
        Recommendation::new(1, "Use more specific issue_type").details(format!("Supported: {supported}")),
    );
}
