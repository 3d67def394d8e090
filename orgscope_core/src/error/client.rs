//! External platform error types

use super::ErrorCategory;
use thiserror::Error;

/// Errors raised by the query client or while acquiring a session
#[derive(Error, Debug)]
pub enum ClientError {
    /// The platform rejected the request with an error code
    #[error("Platform API error: {code} - {message}")]
    Api { code: String, message: String },

    /// The request never produced a platform response
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// A response could not be decoded into the expected shape
    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    /// No session could be established for the identity
    #[error("No connection available for '{identity}'")]
    ConnectionUnavailable { identity: String },
}

impl ClientError {
    /// Create an API error with a provider error code
    pub fn api(code: &str, message: &str) -> Self {
        Self::Api {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(context: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            context: context.to_string(),
            message: message.into(),
        }
    }

    /// Create a connection-unavailable error
    pub fn connection_unavailable(identity: &str) -> Self {
        Self::ConnectionUnavailable {
            identity: identity.to_string(),
        }
    }

    /// Provider error code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if this error is transient and the caller may retry
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::ConnectionUnavailable { .. } => true,
            Self::Api { code, .. } => matches!(
                code.as_str(),
                "QUERY_TIMEOUT" | "UNABLE_TO_LOCK_ROW" | "SERVER_UNAVAILABLE" | "TIMEOUT"
            ),
            Self::Decode { .. } => false,
        }
    }

    pub(crate) fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { .. } | Self::ConnectionUnavailable { .. } => ErrorCategory::Network,
            Self::Decode { .. } => ErrorCategory::System,
            Self::Api { code, .. } => category_for_code(code),
        }
    }
}

/// Map a provider error code to a category
pub fn category_for_code(code: &str) -> ErrorCategory {
    match code {
        "INVALID_SESSION_ID" | "INVALID_LOGIN" | "INVALID_GRANT" => ErrorCategory::Authentication,
        "INSUFFICIENT_ACCESS" | "INSUFFICIENT_ACCESS_OR_READONLY" => ErrorCategory::Authorization,
        "FIELD_CUSTOM_VALIDATION_EXCEPTION" | "CANNOT_INSERT_UPDATE_ACTIVATE_ENTITY" => {
            ErrorCategory::Validation
        }
        "REQUIRED_FIELD_MISSING" | "DUPLICATE_VALUE" | "DELETE_FAILED" | "ENTITY_IS_DELETED"
        | "UNABLE_TO_LOCK_ROW" => ErrorCategory::DataIntegrity,
        "REQUEST_LIMIT_EXCEEDED" | "QUERY_TIMEOUT" | "TOO_MANY_SOQL_QUERIES"
        | "STORAGE_LIMIT_EXCEEDED" => ErrorCategory::ApiLimit,
        "NOT_FOUND" => ErrorCategory::NotFound,
        "INVALID_FIELD" | "INVALID_TYPE" | "MALFORMED_QUERY" | "INVALID_QUERY_FILTER_OPERATOR" => {
            ErrorCategory::Syntax
        }
        "CONNECTION_RESET" | "TIMEOUT" | "SERVER_UNAVAILABLE" => ErrorCategory::Network,
        _ => ErrorCategory::Unknown,
    }
}
