//! Trigger issues: fields not updating, recursion, SOQL in loops, read-only assignments

use super::{Context, recommend_all};
use crate::diagnostics::{Diagnosis, FixStatus, GeneratedFix, Recommendation, RootCause, Severity};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeSet;

static STALE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w+(?:__c)?)\s+(?:field\s+)?(?:is\s+)?not\s+(?:getting\s+)?updat")
        .expect("stale field pattern compiles")
});

static SOQL_IN_LOOP: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?is)for\s*\(.*?\)\s*\{[^}]*\[SELECT", "SOQL inside for loop"),
        (r"(?is)while\s*\(.*?\)\s*\{[^}]*\[SELECT", "SOQL inside while loop"),
        (r"(?is)for\s*\(.*?\)\s*\{[^}]*Database\.query", "Dynamic SOQL inside for loop"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).expect("loop pattern compiles"), label))
    .collect()
});

static FIELD_ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(\w+)\s*=\s*").expect("assignment pattern compiles"));

static TRIGGER_EVENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)trigger\s+\w+\s+on\s+\w+\s*\(([^)]*)\)").expect("trigger header pattern compiles")
});

pub(super) fn analyze(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    if ctx.is_scenario(&[1]) || (ctx.mentions("not") && ctx.mentions("updating")) {
        field_not_updating(ctx, diagnosis);
    } else if ctx.is_scenario(&[2])
        || ctx.mentions("maximum trigger depth exceeded")
        || ctx.mentions("recursion")
    {
        recursion(ctx, diagnosis);
    } else if ctx.is_scenario(&[3]) || ctx.mentions("too many soql queries") || ctx.mentions("101") {
        soql_limit(ctx, diagnosis);
    } else if ctx.mentions("field is not writable") || ctx.mentions("field not updating") {
        read_only_assignment(ctx, diagnosis);
    }

    if let Some(body) = ctx.trigger_body() {
        diagnosis.record(
            "trigger_details",
            json!({
                "events": trigger_events(&body),
                "lines": body.lines().count(),
            }),
        );
    }
}

/// Events declared in a trigger's header, lowercased
pub(crate) fn trigger_events(body: &str) -> Vec<String> {
    TRIGGER_EVENTS
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|events| {
            events
                .as_str()
                .split(',')
                .map(|e| e.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
                .filter(|e| !e.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn field_not_updating(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    let stale = STALE_FIELD
        .captures(&ctx.text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    diagnosis.add_cause(
        RootCause::new(
            "Field Not Updating in Trigger",
            format!(
                "The trigger is not correctly updating the '{}' field. Usual reasons: the \
                 assignment runs in the wrong context (before vs after), DML is never called, \
                 the update condition is never met, or the field lives on another object.",
                stale.as_deref().unwrap_or("specified")
            ),
        )
        .severity(Severity::High)
        .scenario(1),
    );

    if let (Some(body), Some(field)) = (ctx.trigger_body(), stale.as_deref()) {
        let assigned = Regex::new(&format!(r"(?i){}\s*=", regex::escape(field)))
            .is_ok_and(|pattern| pattern.is_match(&body));
        let lower = body.to_lowercase();
        if !assigned {
            diagnosis.add_cause(
                RootCause::new(
                    "Field Assignment Missing",
                    format!("Field '{field}' is NOT being assigned in the trigger code"),
                )
                .severity(Severity::Critical),
            );
        } else if (lower.contains("after update") || lower.contains("after insert"))
            && !lower.contains("update ")
        {
            diagnosis.add_cause(
                RootCause::new(
                    "Missing DML in After Trigger",
                    format!(
                        "Field '{field}' is assigned but no update DML was found. In 'after' \
                         triggers related records must be updated explicitly."
                    ),
                )
                .severity(Severity::High),
            );
        }
        diagnosis.record(
            "trigger_analysis",
            json!({
                "trigger_name": ctx.component(),
                "body_length": body.len(),
                "has_before_insert": lower.contains("before insert"),
                "has_after_insert": lower.contains("after insert"),
                "has_before_update": lower.contains("before update"),
                "has_after_update": lower.contains("after update"),
            }),
        );
    }

    let trigger = ctx.component().unwrap_or("MyTrigger");
    let object = ctx.object().unwrap_or("Account");
    let field = stale.as_deref().unwrap_or("Industry");
    recommend_all(
        diagnosis,
        [
            Recommendation::new(1, "Verify trigger context (before vs after)")
                .details(
                    "Same-record updates belong in a before trigger and need no DML. \
                     Related-record updates need an after trigger with explicit DML.",
                )
                .code(format!(
                    "trigger {trigger} on {object} (before insert, before update) {{\n    \
                     for ({object} record : Trigger.new) {{\n        \
                     record.{field} = 'Banking';\n    }}\n}}"
                )),
            Recommendation::new(2, "For related object updates, use explicit DML").code(format!(
                "List<Account> toUpdate = new List<Account>();\n\
                 // collect and modify related records, then:\n\
                 // acc.{field} = 'Banking'; toUpdate.add(acc);\n\
                 if (!toUpdate.isEmpty()) {{\n    update toUpdate;\n}}"
            )),
        ],
    );
}

fn recursion(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    diagnosis.add_cause(
        RootCause::new(
            "Trigger Recursion",
            "Trigger is calling itself repeatedly causing infinite loop",
        )
        .severity(Severity::High)
        .scenario(2),
    );
    recommend_all(
        diagnosis,
        [
            Recommendation::new(1, "Add static variable to prevent recursion").code(
                "public class TriggerHelper {\n    public static Boolean isFirstRun = true;\n}\n\n\
                 if (TriggerHelper.isFirstRun) {\n    TriggerHelper.isFirstRun = false;\n    \
                 // trigger logic\n}",
            ),
            Recommendation::new(2, "Use Set<Id> to track processed records").code(
                "public class TriggerHelper {\n    public static Set<Id> processedIds = new Set<Id>();\n}",
            ),
        ],
    );

    if let (true, Some(object)) = (ctx.auto_fix(), ctx.object()) {
        info!("Generating recursion guard helper for {object}");
        diagnosis.generated_fixes.push(recursion_helper(object));
    }
}

/// Helper class text that guards a trigger on `object` against re-entry
pub(crate) fn recursion_helper(object: &str) -> GeneratedFix {
    let class_name = format!("{object}TriggerHelper");
    let body = format!(
        r#"/**
 * Helper class for {object} trigger
 * Prevents recursion and tracks processed records
 */
public class {class_name} {{
    public static Boolean isFirstRun = true;
    public static Set<Id> processedIds = new Set<Id>();

    public static Boolean isAlreadyProcessed(Id recordId) {{
        return processedIds.contains(recordId);
    }}

    public static void markAsProcessed(Id recordId) {{
        processedIds.add(recordId);
    }}

    public static void markAsProcessed(Set<Id> recordIds) {{
        processedIds.addAll(recordIds);
    }}

    @TestVisible
    private static void reset() {{
        isFirstRun = true;
        processedIds.clear();
    }}
}}"#
    );
    GeneratedFix {
        fix_type: "Recursion Prevention Helper Class".to_string(),
        status: FixStatus::Generated,
        message: format!("Helper class '{class_name}' generated. Deploy it manually."),
        steps: vec![
            "1. Copy the class body".to_string(),
            "2. Setup → Apex Classes → New".to_string(),
            "3. Paste the code and save".to_string(),
            format!("4. Guard your trigger with {class_name}.isFirstRun or {class_name}.markAsProcessed()"),
        ],
        name: Some(class_name),
        content: Some(body),
    }
}

/// Line and label of every SOQL-in-loop construct in `body`
pub(crate) fn soql_in_loops(body: &str) -> Vec<(usize, &'static str)> {
    let mut found = Vec::new();
    for (pattern, label) in SOQL_IN_LOOP.iter() {
        for m in pattern.find_iter(body) {
            let line = body[..m.start()].matches('\n').count() + 1;
            found.push((line, *label));
        }
    }
    found
}

fn soql_limit(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    diagnosis.add_cause(
        RootCause::new(
            "SOQL Query Limit Exceeded (Governor Limit)",
            "Trigger is executing more than 100 SOQL queries, usually because a query sits \
             inside a loop or the trigger is not bulkified.",
        )
        .severity(Severity::Critical)
        .scenario(3),
    );

    if let Some(body) = ctx.trigger_body() {
        let issues = soql_in_loops(&body);
        if !issues.is_empty() {
            diagnosis.record(
                "detected_soql_issues",
                json!(
                    issues
                        .iter()
                        .map(|(line, issue)| json!({"line": line, "issue": issue}))
                        .collect::<Vec<_>>()
                ),
            );
            diagnosis.recommendations.insert(
                0,
                Recommendation::new(0, format!("CRITICAL: Found {} SOQL queries in loops", issues.len()))
                    .steps(issues.iter().map(|(line, issue)| format!("Line {line}: {issue}"))),
            );
        }
    }

    recommend_all(
        diagnosis,
        [
            Recommendation::new(1, "Bulkify trigger - query outside loop").code(
                "Set<Id> accountIds = new Set<Id>();\n\
                 for (Opportunity opp : Trigger.new) {\n    accountIds.add(opp.AccountId);\n}\n\
                 Map<Id, Account> accounts = new Map<Id, Account>(\n    \
                 [SELECT Id, Name FROM Account WHERE Id IN :accountIds]\n);",
            ),
            Recommendation::new(2, "Use Trigger.newMap and Trigger.oldMap for efficient lookups"),
        ],
    );
}

fn read_only_assignment(ctx: &Context<'_>, diagnosis: &mut Diagnosis) {
    diagnosis.add_cause(
        RootCause::new(
            "Field Not Updateable",
            "Attempting to update a read-only, formula, or system field",
        )
        .severity(Severity::Medium),
    );

    let (Some(object), Some(body)) = (ctx.object(), ctx.trigger_body()) else {
        return;
    };
    let describe = match ctx.source.describe(object) {
        Ok(describe) => describe,
        Err(e) => {
            warn!("Could not describe {object}: {e}");
            return;
        }
    };

    let assigned: BTreeSet<&str> = FIELD_ASSIGNMENT
        .captures_iter(&body)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let problems: Vec<_> = assigned
        .into_iter()
        .filter_map(|name| describe.field_ignore_case(name))
        .filter(|field| !field.updateable || field.calculated)
        .map(|field| {
            let reason = if field.calculated {
                "Formula field"
            } else {
                "Not updateable"
            };
            json!({
                "field": field.name,
                "reason": reason,
                "type": field.field_type,
            })
        })
        .collect();

    if !problems.is_empty() {
        let names: Vec<&str> = problems.iter().filter_map(|p| p["field"].as_str()).collect();
        diagnosis.recommend(Recommendation::new(
            1,
            format!("Remove updates to read-only fields: {}", names.join(", ")),
        ));
        diagnosis.record("problematic_fields", json!(problems));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soql_in_loop_lines() {
        let body = "trigger T on Account (before insert) {\n\
                    for (Account a : Trigger.new) {\n\
                        Contact c = [SELECT Id FROM Contact WHERE AccountId = :a.Id];\n\
                    }\n}";
        let issues = soql_in_loops(body);
        assert_eq!(issues, vec![(2, "SOQL inside for loop")]);
    }

    #[test]
    fn test_no_soql_in_loop() {
        let body = "List<Contact> cs = [SELECT Id FROM Contact];\nfor (Contact c : cs) { c.Title = 'x'; }";
        assert!(soql_in_loops(body).is_empty());
    }

    #[test]
    fn test_trigger_events() {
        let body = "trigger OppTrigger on Opportunity (before insert,  AFTER update) { }";
        assert_eq!(trigger_events(body), vec!["before insert", "after update"]);
    }

    #[test]
    fn test_recursion_helper_names_class() {
        let fix = recursion_helper("Opportunity");
        assert_eq!(fix.name.as_deref(), Some("OpportunityTriggerHelper"));
        assert!(fix.content.unwrap().contains("public class OpportunityTriggerHelper"));
        assert_eq!(fix.status, FixStatus::Generated);
    }
}
