//! `orgscope diagnose`: root-cause analysis for a described problem

use super::{OutputSettings, build_scope, client_factory, emit, require_org, spinner};
use crate::config::AppConfig;
use crate::error::CliResult;
use log::debug;
use orgscope_core::DiagnosticRequest;

#[derive(Debug, Clone, Default)]
pub struct DiagnoseArgs {
    pub issue_type: String,
    pub description: String,
    pub object: Option<String>,
    pub field: Option<String>,
    pub component: Option<String>,
    pub auto_fix: bool,
}

impl DiagnoseArgs {
    pub fn request(&self) -> DiagnosticRequest {
        let mut request =
            DiagnosticRequest::new(&self.issue_type, &self.description).auto_fix(self.auto_fix);
        if let Some(object) = &self.object {
            request = request.object(object);
        }
        if let Some(field) = &self.field {
            request = request.field(field);
        }
        if let Some(component) = &self.component {
            request = request.component(component);
        }
        request
    }
}

pub fn run(config: &AppConfig, args: &DiagnoseArgs, settings: &OutputSettings) -> CliResult<()> {
    let org = require_org(config)?;
    let scope = build_scope(config)?;
    let request = args.request();
    debug!("diagnose: {request:?}");

    let progress = spinner(settings.show_progress, "Diagnosing...");
    let result = scope.diagnose(org.identity(), client_factory(org), &request);
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    emit(settings, result, |formatter, diagnosis| {
        formatter.format_diagnosis(diagnosis)
    })?;
    Ok(())
}
