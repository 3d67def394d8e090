use colored::*;
use orgscope_core::{ErrorCategory as CoreCategory, ErrorReport};
use std::error::Error as StdError;
use std::fmt;

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    /// Source error if any
    source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Error categories that map to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    Network,
    NotFound,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    NetworkError = 3,
    NotFound = 4,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
}

impl CliError {
    fn new(category: ErrorCategory, message: &str) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Create a general error
    pub fn general(message: &str) -> Self {
        Self::new(ErrorCategory::General, message)
    }

    /// Create a command misuse error
    pub fn misuse(message: &str) -> Self {
        let mut error = Self::new(ErrorCategory::Misuse, message);
        error
            .suggestions
            .push("Run 'orgscope --help' for usage information".to_string());
        error
    }

    /// No org credentials have been configured yet
    pub fn not_configured() -> Self {
        Self::new(ErrorCategory::Misuse, "No org configured")
            .with_suggestion("Run 'orgscope config set org.instance_url https://<your-domain>'")
            .with_suggestion("Run 'orgscope config set org.access_token <token>'")
            .with_suggestion("Or export ORGSCOPE_ORG__INSTANCE_URL and ORGSCOPE_ORG__ACCESS_TOKEN")
    }

    /// Create a network error
    pub fn network(message: &str) -> Self {
        let mut error = Self::new(ErrorCategory::Network, message);
        error.suggestions = vec![
            "Check your internet connection".to_string(),
            "Verify org.instance_url points at your org".to_string(),
            "Try again later".to_string(),
        ];
        error
    }

    /// Create a not-found error
    pub fn not_found(message: &str) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    /// Translate a library error, keeping its friendly message and suggestions
    pub fn from_core(error: orgscope_core::Error) -> Self {
        let report = ErrorReport::from_error(&error);
        let category = match report.category {
            CoreCategory::NotFound => ErrorCategory::NotFound,
            CoreCategory::Network => ErrorCategory::Network,
            CoreCategory::Validation | CoreCategory::Syntax | CoreCategory::Configuration => {
                ErrorCategory::Misuse
            }
            _ => ErrorCategory::General,
        };

        let mut cli_error = Self::new(category, &report.message);
        cli_error.suggestions = report.suggestions;
        cli_error
            .context
            .push(("code".to_string(), report.error_code));
        if let Some(object) = report.object_name {
            cli_error.context.push(("object".to_string(), object));
        }
        if let Some(field) = report.field_name {
            cli_error.context.push(("field".to_string(), field));
        }
        cli_error.source = Some(Box::new(error));
        cli_error
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::Network => ExitCode::NetworkError,
            ErrorCategory::NotFound => ExitCode::NotFound,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::Network => "Network Error",
            ErrorCategory::NotFound => "Not Found",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse => self.label().yellow(),
            _ => self.label().red(),
        };
        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        // Error chain in debug mode
        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }
}

impl From<orgscope_core::Error> for CliError {
    fn from(error: orgscope_core::Error) -> Self {
        Self::from_core(error)
    }
}

/// Convert anyhow errors to CLI errors
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        // Keep the whole chain; anyhow's top message is usually just the context
        Self::general(&format!("{error:#}"))
    }
}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        let mut cli_error = Self::general(&format!("IO error: {error}"));
        cli_error.source = Some(Box::new(error));
        cli_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgscope_core::error::{ClientError, NotFoundError, ValidationError};

    #[test]
    fn test_exit_codes_follow_core_categories() {
        let not_found = CliError::from(orgscope_core::Error::from(NotFoundError::field("Account", "X__c")));
        let network = CliError::from(orgscope_core::Error::from(ClientError::transport("reset")));
        let misuse = CliError::from(orgscope_core::Error::from(ValidationError::invalid_identifier(
            "object",
            "1Bad",
            "must start with a letter",
        )));
        let general = CliError::from(orgscope_core::Error::from(ClientError::api("UNKNOWN_EXCEPTION", "boom")));

        assert_eq!(not_found.exit_code(), ExitCode::NotFound);
        assert_eq!(network.exit_code(), ExitCode::NetworkError);
        assert_eq!(misuse.exit_code(), ExitCode::Misuse);
        assert_eq!(general.exit_code(), ExitCode::GeneralError);
    }

    #[test]
    fn test_core_error_keeps_context_and_suggestions() {
        let error = CliError::from(orgscope_core::Error::from(ClientError::api(
            "INVALID_SESSION_ID",
            "Session expired or invalid",
        )));

        let text = error.to_string();
        assert!(text.contains("(code: INVALID_SESSION_ID)"));
        assert!(!error.suggestions.is_empty());
    }

    #[test]
    fn test_debug_output_shows_cause_chain() {
        let error = CliError::from(orgscope_core::Error::from(ClientError::transport("connection reset")));

        let plain = error.format_for_user(false);
        let debug = error.format_for_user(true);
        assert!(!plain.contains("Caused by"));
        assert!(debug.contains("Caused by"));
        assert!(debug.contains("connection reset"));
    }

    #[test]
    fn test_not_configured_is_misuse() {
        let error = CliError::not_configured();
        assert_eq!(error.exit_code(), ExitCode::Misuse);
        assert!(error.suggestions.iter().any(|s| s.contains("org.access_token")));
    }

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success as i32, 0);
        assert_eq!(ExitCode::NotFound as i32, 4);
    }
}
