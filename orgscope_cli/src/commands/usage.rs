//! `orgscope usage`: where an object's fields are referenced

use super::{OutputSettings, build_scope, client_factory, emit, require_org, spinner};
use crate::config::AppConfig;
use crate::error::CliResult;
use chrono::Utc;
use colored::*;
use log::debug;
use orgscope_core::usage::{default_file_name, write_csv_file};
use std::path::PathBuf;

/// Arguments of one usage run
#[derive(Debug, Clone, Default)]
pub struct UsageArgs {
    pub object: String,
    pub field: Option<String>,
    pub include_reports: bool,
    /// `Some(None)` writes to the default file name in the current directory
    pub csv: Option<Option<PathBuf>>,
}

impl UsageArgs {
    fn csv_path(&self) -> Option<PathBuf> {
        self.csv.as_ref().map(|path| {
            path.clone()
                .unwrap_or_else(|| PathBuf::from(default_file_name(&self.object, Utc::now())))
        })
    }
}

pub fn run(config: &AppConfig, args: &UsageArgs, settings: &OutputSettings) -> CliResult<()> {
    let org = require_org(config)?;
    let scope = build_scope(config)?;
    debug!(
        "usage: object={} field={:?} include_reports={}",
        args.object, args.field, args.include_reports
    );

    let target = match &args.field {
        Some(field) => format!("{}.{}", args.object, field),
        None => format!("all fields on {}", args.object),
    };
    let progress = spinner(settings.show_progress, &format!("Analyzing {target}..."));

    let result = scope.analyze_field_usage(
        org.identity(),
        client_factory(org),
        &args.object,
        args.field.as_deref(),
        args.include_reports,
    );
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    let report = emit(settings, result, |formatter, report| formatter.format_usage(report))?;

    if let Some(path) = args.csv_path() {
        write_csv_file(&report, &path)?;
        eprintln!(
            "{}",
            format!("CSV written to {}", path.display()).green()
        );
    }

    Ok(())
}
