//! Dependency cross-reference for fields and triggers
//!
//! Field dependencies are a coarse existence check: every validation rule,
//! active flow and active trigger on the field's object is listed, whether
//! or not it actually mentions the field. Trigger dependencies come from a
//! textual scan of the trigger body for `FROM` clauses and DML statements.

use crate::cache::categories;
use crate::source::MetadataSource;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::convert::Infallible;

/// Trigger references above this count earn a refactoring warning
const MANY_DEPENDENCIES: usize = 3;

static QUERIED_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)FROM\s+(\w+)").expect("FROM pattern compiles"));

static DML_TARGETS: Lazy<[Regex; 4]> = Lazy::new(|| {
    ["insert", "update", "delete", "upsert"]
        .map(|op| Regex::new(&format!(r"(?i){op}\s+(\w+)")).expect("DML pattern compiles"))
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub details: String,
}

impl Dependency {
    fn new(kind: &str, name: &str, details: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            details: details.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    /// Things the component relies on
    pub depends_on: Vec<Dependency>,
    /// Things that may rely on the component
    pub depended_by: Vec<Dependency>,
    pub potential_impacts: Vec<String>,
}

impl DependencyReport {
    pub fn is_empty(&self) -> bool {
        self.depends_on.is_empty() && self.depended_by.is_empty()
    }
}

/// Cross-reference a field (object + field) or a trigger (object + component)
///
/// Any other combination yields an empty report. Results are cached in the
/// `dependencies` category.
pub fn analyze_dependencies(
    source: &MetadataSource<'_>,
    object: Option<&str>,
    field: Option<&str>,
    component: Option<&str>,
) -> DependencyReport {
    let cache = source.cache();
    match (object, field, component) {
        (Some(object), Some(field), _) => {
            let key = format!("field_deps_{object}_{field}");
            let Ok(report) = cache.memoize(categories::DEPENDENCIES, &key, None, || {
                Ok::<_, Infallible>(field_dependencies(source, object))
            });
            (*report).clone()
        }
        (Some(object), None, Some(trigger)) => {
            let key = format!("trigger_deps_{object}_{trigger}");
            let Ok(report) = cache.memoize(categories::DEPENDENCIES, &key, None, || {
                Ok::<_, Infallible>(trigger_dependencies(source, object, trigger))
            });
            (*report).clone()
        }
        _ => DependencyReport::default(),
    }
}

fn field_dependencies(source: &MetadataSource<'_>, object: &str) -> DependencyReport {
    let mut report = DependencyReport::default();

    match source.validation_rules(object, None) {
        Ok(rules) => report.depended_by.extend(rules.iter().map(|rule| {
            Dependency::new(
                "ValidationRule",
                &rule.validation_name,
                "Uses this field in validation logic",
            )
        })),
        Err(e) => warn!("Could not check validation dependencies: {e}"),
    }

    match source.active_flows(object) {
        Ok(flows) => report.depended_by.extend(flows.iter().map(|flow| {
            let details = format!(
                "May reference this field ({})",
                flow.process_type.as_deref().unwrap_or("Unknown")
            );
            Dependency::new("Flow", flow.display_name(), &details)
        })),
        Err(e) => warn!("Could not check flow dependencies: {e}"),
    }

    match source.triggers(object) {
        Ok(triggers) => report.depended_by.extend(triggers.iter().map(|trigger| {
            Dependency::new(
                "ApexTrigger",
                &trigger.name,
                "May reference this field in trigger logic",
            )
        })),
        Err(e) => warn!("Could not check trigger dependencies: {e}"),
    }

    if !report.depended_by.is_empty() {
        report.potential_impacts.push(format!(
            "Changes to this field may affect {} component(s)",
            report.depended_by.len()
        ));
    }
    report
}

fn trigger_dependencies(source: &MetadataSource<'_>, object: &str, trigger: &str) -> DependencyReport {
    let mut report = DependencyReport::default();

    let body = match source.trigger(object, trigger) {
        Ok(found) => Option::as_ref(&found).and_then(|t| t.body.clone()),
        Err(e) => {
            warn!("Could not analyze trigger dependencies: {e}");
            None
        }
    };
    if let Some(body) = body {
        report.depends_on = scan_trigger_body(&body, object);
    }

    if report.depends_on.len() > MANY_DEPENDENCIES {
        report
            .potential_impacts
            .push("Trigger has many dependencies - consider refactoring for maintainability".into());
    }
    report
}

/// Objects a trigger body queries (other than its own) and the DML targets it names
pub fn scan_trigger_body(body: &str, object: &str) -> Vec<Dependency> {
    let queried: BTreeSet<&str> = QUERIED_OBJECT
        .captures_iter(body)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .filter(|name| *name != object)
        .collect();

    let mut found: Vec<Dependency> = queried
        .into_iter()
        .map(|name| Dependency::new("SObject", name, "Queried by this trigger"))
        .collect();

    for pattern in DML_TARGETS.iter() {
        found.extend(
            pattern
                .captures_iter(body)
                .filter_map(|c| c.get(1))
                .map(|m| Dependency::new("DML Operation", m.as_str(), "Modified by this trigger")),
        );
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"trigger OppTrigger on Opportunity (after insert) {
    List<Account> accs = [SELECT Id FROM Account WHERE Id IN :ids];
    List<Opportunity> opps = [SELECT Id from Opportunity];
    update accs;
    insert newTasks;
}"#;

    #[test]
    fn test_scan_finds_queries_and_dml() {
        let deps = scan_trigger_body(BODY, "Opportunity");
        let names: Vec<(&str, &str)> = deps
            .iter()
            .map(|d| (d.kind.as_str(), d.name.as_str()))
            .collect();

        assert_eq!(
            names,
            vec![
                ("SObject", "Account"),
                ("DML Operation", "newTasks"),
                ("DML Operation", "accs"),
            ]
        );
    }

    #[test]
    fn test_report_empty() {
        assert!(DependencyReport::default().is_empty());
    }
}
