use super::OutputFormatter;
use anyhow::Result;
use colored::*;
use orgscope_core::diagnostics::{FixStatus, Severity};
use orgscope_core::{Diagnosis, Error, OperationResult, UsageCategory, UsageReport};
use serde::Serialize;

/// Text formatter for human-readable output
pub struct TextFormatter {
    use_color: bool,
}

impl TextFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, text: &str, color: fn(&str) -> ColoredString) -> String {
        if self.use_color {
            color(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.colorize(text, |s| s.bold())
    }

    fn severity(&self, severity: Severity) -> String {
        match severity {
            Severity::Critical => self.colorize("CRITICAL", |s| s.red().bold()),
            Severity::High => self.colorize("HIGH", |s| s.red()),
            Severity::Medium => self.colorize("MEDIUM", |s| s.yellow()),
            Severity::Low => self.colorize("LOW", |s| s.cyan()),
        }
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}\n"))
        .collect()
}

impl OutputFormatter for TextFormatter {
    fn format_usage(&self, report: &UsageReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&format!(
            "{} {}\n",
            self.heading("Field usage for"),
            self.colorize(&report.object, |s| s.cyan())
        ));
        output.push_str(&format!(
            "Generated: {}\n",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!(
            "Fields analyzed: {} ({} referenced, {} unreferenced)\n",
            report.total_fields_analyzed,
            report.summary.referenced_fields,
            report.summary.unreferenced_fields
        ));

        if !report.degraded_categories.is_empty() {
            let names: Vec<&str> = report.degraded_categories.iter().map(UsageCategory::label).collect();
            let warning = format!("Could not read: {} (counts may be low)", names.join(", "));
            output.push_str(&format!("{}\n", self.colorize(&warning, |s| s.yellow())));
        }

        output.push('\n');
        for record in &report.fields {
            let name = if record.is_referenced() {
                self.colorize(record.field_name(), |s| s.green())
            } else {
                self.colorize(record.field_name(), |s| s.dimmed())
            };
            output.push_str(&format!(
                "{} ({}) [{}] - {} reference(s)\n",
                name,
                record.field_label(),
                record.field_type(),
                record.total_usage()
            ));

            for category in UsageCategory::ALL {
                let names = record.usages(category);
                if !names.is_empty() {
                    let label = self.colorize(category.label(), |s| s.yellow());
                    output.push_str(&format!("  {}: {}\n", label, names.join(", ")));
                }
            }
        }

        if report.fields.len() > 1 {
            output.push_str(&format!("\n{}\n", self.heading("References by category:")));
            for category in UsageCategory::ALL {
                let total = report.summary.category_totals.get(&category).copied().unwrap_or(0);
                output.push_str(&format!("  {}: {}\n", category.label(), total));
            }
        }

        Ok(output)
    }

    fn format_diagnosis(&self, diagnosis: &Diagnosis) -> Result<String> {
        let mut output = String::new();

        output.push_str(&format!(
            "{} {}\n",
            self.heading("Diagnosis:"),
            self.colorize(&diagnosis.issue_type, |s| s.cyan())
        ));
        output.push_str(&format!("Issue: {}\n", diagnosis.description));
        for (label, value) in [
            ("Object", &diagnosis.object),
            ("Field", &diagnosis.field),
            ("Component", &diagnosis.component),
        ] {
            if let Some(value) = value {
                output.push_str(&format!("{label}: {value}\n"));
            }
        }
        if let Some(scenario) = &diagnosis.detected_scenario {
            output.push_str(&format!(
                "Detected scenario #{}: {}\n",
                scenario.scenario_id, scenario.description
            ));
        }

        if !diagnosis.root_causes.is_empty() {
            output.push_str(&format!("\n{}\n", self.heading("Root causes:")));
            for (i, cause) in diagnosis.root_causes.iter().enumerate() {
                let severity = cause
                    .severity
                    .map(|s| format!(" [{}]", self.severity(s)))
                    .unwrap_or_default();
                output.push_str(&format!("  {}. {}{}\n", i + 1, cause.cause, severity));
                output.push_str(&indent(&cause.explanation, "     "));
            }
        }

        if !diagnosis.recommendations.is_empty() {
            output.push_str(&format!("\n{}\n", self.heading("Recommendations:")));
            for recommendation in &diagnosis.recommendations {
                let priority = self.colorize(&format!("P{}", recommendation.priority), |s| s.magenta());
                output.push_str(&format!("  [{}] {}\n", priority, recommendation.action));
                if let Some(details) = &recommendation.details {
                    output.push_str(&indent(details, "       "));
                }
                for step in &recommendation.steps {
                    output.push_str(&format!("       - {step}\n"));
                }
                if let Some(code) = &recommendation.code_example {
                    output.push_str(&indent(code, "         "));
                }
            }
        }

        if !diagnosis.generated_fixes.is_empty() {
            output.push_str(&format!("\n{}\n", self.heading("Generated fixes:")));
            for fix in &diagnosis.generated_fixes {
                let status = match fix.status {
                    FixStatus::Generated => self.colorize("generated", |s| s.green()),
                    FixStatus::Failed => self.colorize("failed", |s| s.red()),
                };
                let name = fix.name.as_deref().map(|n| format!(" {n}")).unwrap_or_default();
                output.push_str(&format!("  [{}] {}{}: {}\n", status, fix.fix_type, name, fix.message));
                if let Some(content) = &fix.content {
                    output.push_str(&indent(content, "       "));
                }
                for step in &fix.steps {
                    output.push_str(&format!("       - {step}\n"));
                }
            }
        }

        if let Some(dependencies) = &diagnosis.dependency_analysis {
            output.push_str(&format!("\n{}\n", self.heading("Dependencies:")));
            for dependency in &dependencies.depends_on {
                output.push_str(&format!("  depends on {} {}\n", dependency.kind, dependency.name));
            }
            for dependency in &dependencies.depended_by {
                output.push_str(&format!("  used by {} {}\n", dependency.kind, dependency.name));
            }
            for impact in &dependencies.potential_impacts {
                output.push_str(&format!("  {}\n", self.colorize(impact, |s| s.yellow())));
            }
        }

        Ok(output)
    }
}

/// JSON formatter for machine-readable output
///
/// Every document is an [`OperationResult`] envelope so scripts can check
/// `success` before looking at `data` or `error`.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_usage(&self, report: &UsageReport) -> Result<String> {
        self.render(&OperationResult::ok(report))
    }

    fn format_diagnosis(&self, diagnosis: &Diagnosis) -> Result<String> {
        self.render(&OperationResult::ok(diagnosis))
    }

    fn format_failure(&self, error: &Error) -> Result<Option<String>> {
        self.render(&OperationResult::<()>::failure(error)).map(Some)
    }
}
