//! Error types for the orgscope core library
//!
//! Errors are grouped by where they originate, each group living in its own
//! module. The top-level [`Error`] is a transparent sum of those groups.

use serde::Serialize;
use thiserror::Error;

pub mod client;
pub mod internal;
pub mod not_found;
pub mod validation;

pub use self::client::ClientError;
pub use self::internal::InternalError;
pub use self::not_found::NotFoundError;
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the orgscope core library
///
/// - Client errors: failures reported by, or while talking to, the external platform
/// - Validation errors: malformed input rejected before any state changes
/// - Not-found errors: an explicitly named object, field or component does not exist
/// - Internal errors: export, serialization and invariant failures
#[derive(Error, Debug)]
pub enum Error {
    /// External platform errors
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Named lookups that found nothing
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Internal library errors
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Coarse classification used when reporting errors to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    Authorization,
    Validation,
    ApiLimit,
    DataIntegrity,
    NotFound,
    Configuration,
    Network,
    Syntax,
    System,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::ApiLimit => "api_limit",
            Self::DataIntegrity => "data_integrity",
            Self::NotFound => "not_found",
            Self::Configuration => "configuration",
            Self::Network => "network",
            Self::Syntax => "syntax",
            Self::System => "system",
            Self::Unknown => "unknown",
        }
    }
}

impl Error {
    /// Classify this error for user-facing reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Client(err) => err.category(),
            Self::Validation(ValidationError::InvalidConfiguration { .. }) => {
                ErrorCategory::Configuration
            }
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Internal(_) => ErrorCategory::System,
        }
    }

    /// Provider-specific error code, when the platform supplied one
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            Self::Client(err) => err.code(),
            _ => None,
        }
    }

    /// Check if this error reports a missing object, field or component
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
            || self.provider_code().is_some_and(|code| code == "NOT_FOUND")
    }

    /// Whether the session that produced this error should be held responsible
    ///
    /// Only platform and transport failures count; bad input and missing
    /// objects or fields say nothing about the session's health.
    pub fn is_connection_fault(&self) -> bool {
        matches!(self, Self::Client(_)) && !self.is_not_found()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(InternalError::serialization(err.to_string()))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::Internal(InternalError::export(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_field_not_found_error_creation() {
        let error = Error::NotFound(NotFoundError::field("Account", "Missing__c"));

        match &error {
            Error::NotFound(NotFoundError::Field { object, field }) => {
                assert_eq!(object, "Account");
                assert_eq!(field, "Missing__c");
            }
            _ => panic!("Expected NotFound::Field error"),
        }
        assert!(error.is_not_found());
        assert_eq!(error.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_api_error_keeps_provider_code() {
        let error = Error::Client(ClientError::api("INVALID_SESSION_ID", "Session expired"));

        assert_eq!(error.provider_code(), Some("INVALID_SESSION_ID"));
        assert_eq!(error.category(), ErrorCategory::Authentication);
        assert!(error.to_string().contains("INVALID_SESSION_ID"));
        assert!(error.to_string().contains("Session expired"));
    }

    #[test]
    fn test_provider_not_found_counts_as_not_found() {
        let error = Error::Client(ClientError::api("NOT_FOUND", "The requested resource does not exist"));
        assert!(error.is_not_found());
    }

    #[test]
    fn test_only_platform_failures_are_connection_faults() {
        assert!(Error::Client(ClientError::transport("connection reset")).is_connection_fault());
        assert!(Error::Client(ClientError::api("INVALID_SESSION_ID", "expired")).is_connection_fault());

        assert!(!Error::Client(ClientError::api("NOT_FOUND", "no such object")).is_connection_fault());
        assert!(!Error::NotFound(NotFoundError::field("Account", "Typo__c")).is_connection_fault());
        assert!(
            !Error::Validation(ValidationError::invalid_identifier("field", "1x", "bad start"))
                .is_connection_fault()
        );
    }

    #[test]
    fn test_configuration_errors_are_classified_separately() {
        let config = Error::Validation(ValidationError::invalid_configuration("max_connections is 0"));
        let pattern = Error::Validation(ValidationError::invalid_pattern("[", "unclosed class"));

        assert_eq!(config.category(), ErrorCategory::Configuration);
        assert_eq!(pattern.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: Error = json_err.into();

        assert!(matches!(
            error,
            Error::Internal(InternalError::Serialization { .. })
        ));
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = Error::Internal(InternalError::assertion("Test error"));
        let _: &dyn StdError = &error;
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_error_display_formatting() {
        let errors = vec![
            Error::Client(ClientError::transport("connection reset")),
            Error::Client(ClientError::connection_unavailable("org-1")),
            Error::Validation(ValidationError::invalid_identifier("object", "1Bad", "must start with a letter")),
            Error::NotFound(NotFoundError::object("Widget__c")),
            Error::Internal(InternalError::export("disk full")),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_category_names_are_snake_case() {
        assert_eq!(ErrorCategory::ApiLimit.as_str(), "api_limit");
        assert_eq!(
            serde_json::to_string(&ErrorCategory::DataIntegrity).unwrap(),
            "\"data_integrity\""
        );
    }
}
