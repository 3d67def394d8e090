//! Validation related error types

use thiserror::Error;

/// Input and configuration errors, raised before any state is touched
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Malformed identifier (identity, category, object or field name)
    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        kind: String,
        value: String,
        reason: String,
    },

    /// Glob pattern that does not compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Invalid input parameter
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },
}

impl ValidationError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(message: &str) -> Self {
        Self::InvalidConfiguration {
            message: message.to_string(),
        }
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(kind: &str, value: &str, reason: &str) -> Self {
        Self::InvalidIdentifier {
            kind: kind.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: &str, reason: &str) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &str, reason: &str) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_error() {
        let error = ValidationError::invalid_configuration("Bad config");
        assert!(error.to_string().contains("Invalid configuration"));
        assert!(error.to_string().contains("Bad config"));
    }

    #[test]
    fn test_invalid_identifier_error() {
        let error = ValidationError::invalid_identifier("field", "Bad Name", "contains whitespace");
        assert!(error.to_string().contains("Invalid field"));
        assert!(error.to_string().contains("Bad Name"));
        assert!(error.to_string().contains("contains whitespace"));
    }

    #[test]
    fn test_invalid_pattern_error() {
        let error = ValidationError::invalid_pattern("a[", "unclosed character class");
        assert!(error.to_string().contains("Invalid pattern"));
        assert!(error.to_string().contains("a["));
    }

    #[test]
    fn test_invalid_parameter_error() {
        let error = ValidationError::invalid_parameter("ttl", "must be positive");
        assert!(error.to_string().contains("Invalid parameter"));
        assert!(error.to_string().contains("ttl"));
        assert!(error.to_string().contains("must be positive"));
    }
}
