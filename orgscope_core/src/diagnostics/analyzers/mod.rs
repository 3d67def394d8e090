//! Per-issue-type analyzers
//!
//! Analyzers never fail: metadata they cannot fetch is logged and the
//! diagnosis is built from whatever remains.

mod flow;
mod layout;
mod schema;
mod trigger;
mod validation;

use super::{DiagnosticRequest, Diagnosis, IssueType, Recommendation, RootCause};
use crate::source::MetadataSource;
use log::warn;

pub(super) use self::layout::generic;

/// What every analyzer gets to look at
pub(crate) struct Context<'a> {
    pub(crate) source: MetadataSource<'a>,
    pub(crate) request: &'a DiagnosticRequest,
    /// Lowercased description
    pub(crate) text: String,
    pub(crate) scenario: Option<u8>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        source: MetadataSource<'a>,
        request: &'a DiagnosticRequest,
        scenario: Option<u8>,
    ) -> Self {
        Self {
            source,
            request,
            text: request.description.to_lowercase(),
            scenario,
        }
    }

    pub(crate) fn mentions(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    pub(crate) fn is_scenario(&self, ids: &[u8]) -> bool {
        self.scenario.is_some_and(|id| ids.contains(&id))
    }

    pub(crate) fn object(&self) -> Option<&'a str> {
        self.request.object.as_deref()
    }

    pub(crate) fn field(&self) -> Option<&'a str> {
        self.request.field.as_deref()
    }

    pub(crate) fn component(&self) -> Option<&'a str> {
        self.request.component.as_deref()
    }

    pub(crate) fn auto_fix(&self) -> bool {
        self.request.auto_fix
    }

    /// Body of the named trigger on the named object, when both are given and it exists
    pub(crate) fn trigger_body(&self) -> Option<String> {
        let (object, name) = (self.object()?, self.component()?);
        match self.source.trigger(object, name) {
            Ok(found) => Option::as_ref(&found).and_then(|t| t.body.clone()),
            Err(e) => {
                warn!("Could not fetch trigger {name} for analysis: {e}");
                None
            }
        }
    }
}

pub(super) fn run(issue_type: IssueType, context: &Context<'_>, diagnosis: &mut Diagnosis) {
    match issue_type {
        IssueType::Trigger => trigger::analyze(context, diagnosis),
        IssueType::Flow => flow::analyze(context, diagnosis),
        IssueType::Validation => validation::analyze(context, diagnosis),
        IssueType::Field => schema::analyze_field(context, diagnosis),
        IssueType::Permission => schema::analyze_permission(context, diagnosis),
        IssueType::Formula => schema::analyze_formula(context, diagnosis),
        IssueType::Picklist => schema::analyze_picklist(context, diagnosis),
        IssueType::Lookup => schema::analyze_lookup(context, diagnosis),
        IssueType::Layout => layout::analyze_layout(context, diagnosis),
        IssueType::Report => layout::analyze_report(context, diagnosis),
    }
}

/// Capitalize each word, lowercase the rest
pub(crate) fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn insufficient(diagnosis: &mut Diagnosis, explanation: &str) {
    diagnosis.add_cause(RootCause::new("Insufficient Information", explanation));
}

fn recommend_all(diagnosis: &mut Diagnosis, recommendations: impl IntoIterator<Item = Recommendation>) {
    diagnosis.recommendations.extend(recommendations);
}
