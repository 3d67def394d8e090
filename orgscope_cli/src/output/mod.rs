mod formatters;

pub use formatters::{JsonFormatter, TextFormatter};

use anyhow::Result;
use clap::ValueEnum;
use orgscope_core::{Diagnosis, Error, UsageReport};

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn from_string(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Unknown output format: {}", s),
        }
    }
}

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Format a field-usage report
    fn format_usage(&self, report: &UsageReport) -> Result<String>;

    /// Format a diagnosis
    fn format_diagnosis(&self, diagnosis: &Diagnosis) -> Result<String>;

    /// Format a failed operation for stdout
    ///
    /// `None` means the failure is only reported on stderr.
    fn format_failure(&self, error: &Error) -> Result<Option<String>> {
        let _ = error;
        Ok(None)
    }
}

/// Create a formatter based on output format
pub fn create_formatter(format: OutputFormat, use_color: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(use_color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
