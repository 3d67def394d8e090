//! CSV export of a [`UsageReport`]

use super::{UsageCategory, UsageReport};
use crate::error::{InternalError, Result};
use chrono::{DateTime, Utc};
use log::info;
use std::fs::File;
use std::io;
use std::path::Path;

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn header() -> Vec<String> {
    let mut columns: Vec<String> = ["Field Name", "Field Label", "Field Type", "Is Custom", "Is Required"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for category in UsageCategory::ALL {
        columns.push(format!("{} Count", category.label()));
        columns.push(category.label().to_string());
    }
    columns.push("Total Usage Count".to_string());
    columns.push("Is Referenced".to_string());
    columns
}

/// Write one row per analyzed field
pub fn write_csv<W: io::Write>(report: &UsageReport, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header())?;

    for record in &report.fields {
        let mut row = vec![
            record.field_name().to_string(),
            record.field_label().to_string(),
            record.field_type().to_string(),
            yes_no(record.is_custom()).to_string(),
            yes_no(record.is_required()).to_string(),
        ];
        for category in UsageCategory::ALL {
            let names = record.usages(category);
            row.push(names.len().to_string());
            row.push(names.join(", "));
        }
        row.push(record.total_usage().to_string());
        row.push(yes_no(record.is_referenced()).to_string());
        csv.write_record(&row)?;
    }

    csv.flush()
        .map_err(|e| InternalError::export(format!("flushing CSV: {e}")))?;
    Ok(())
}

/// Write the report to `path`, creating or truncating it
pub fn write_csv_file(report: &UsageReport, path: &Path) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| InternalError::export(format!("creating {}: {e}", path.display())))?;
    write_csv(report, file)?;
    info!("CSV exported to: {}", path.display());
    Ok(())
}

/// `{object}_field_usage_{YYYYmmdd_HHMMSS}.csv`
pub fn default_file_name(object: &str, now: DateTime<Utc>) -> String {
    format!("{object}_field_usage_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FieldDescribe;
    use crate::usage::{CategoryMatches, FieldUsageRecord, UsageSummary};
    use chrono::TimeZone;

    fn report() -> UsageReport {
        let field = FieldDescribe {
            name: "Region__c".into(),
            label: "Region".into(),
            field_type: "picklist".into(),
            custom: true,
            nillable: false,
            ..Default::default()
        };
        let mut usage = CategoryMatches::new();
        usage.insert(UsageCategory::ApexClasses, vec!["A".into(), "B".into()]);
        let fields = vec![FieldUsageRecord::new(&field, usage)];

        UsageReport {
            object: "Account".into(),
            field_analyzed: "ALL".into(),
            generated_at: Utc::now(),
            total_fields_analyzed: 1,
            summary: UsageSummary::default(),
            working_set_sizes: Default::default(),
            degraded_categories: Vec::new(),
            fields,
        }
    }

    #[test]
    fn test_header_column_order() {
        let columns = header();
        assert_eq!(columns.len(), 5 + 9 * 2 + 2);
        assert_eq!(columns[5], "Apex Classes Count");
        assert_eq!(columns[6], "Apex Classes");
        assert_eq!(columns[7], "Triggers Count");
        assert_eq!(columns[columns.len() - 1], "Is Referenced");
    }

    #[test]
    fn test_row_values() {
        let mut out = Vec::new();
        write_csv(&report(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let row = text.lines().nth(1).unwrap();

        assert!(row.starts_with("Region__c,Region,picklist,Yes,Yes,2,\"A, B\",0,,"));
        assert!(row.ends_with(",2,Yes"));
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv_file(&report(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_default_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            default_file_name("Account", now),
            "Account_field_usage_20240309_140507.csv"
        );
    }
}
