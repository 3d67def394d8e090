//! Uniform success/failure envelope for callers outside the library
//!
//! Errors are turned into an [`ErrorReport`] with a friendly message and a
//! list of things to try, keyed by the platform's error code when there is
//! one and by keywords in the error text otherwise.

use crate::error::{ClientError, Error, ErrorCategory, Result};
use serde::Serialize;

/// Outcome of one operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorReport::from_error(error)),
        }
    }

    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(&e),
        }
    }
}

/// User-facing description of a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub message: String,
    pub error_code: String,
    pub category: ErrorCategory,
    pub suggestions: Vec<String>,
    /// Underlying error text
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
}

struct KnownCode {
    code: &'static str,
    message: &'static str,
    suggestions: &'static [&'static str],
}

static KNOWN_CODES: &[KnownCode] = &[
    KnownCode {
        code: "INVALID_SESSION_ID",
        message: "Your session has expired or is invalid.",
        suggestions: &[
            "Refresh the access token and update org.access_token",
            "Check if your access token has expired",
            "Verify your connected app settings",
            "Ensure IP restrictions are not blocking your connection",
        ],
    },
    KnownCode {
        code: "INVALID_LOGIN",
        message: "Login credentials are invalid.",
        suggestions: &[
            "Verify your username and password are correct",
            "Check if your account is locked or requires a password reset",
            "Ensure you're using the correct login URL (test.salesforce.com for sandbox)",
        ],
    },
    KnownCode {
        code: "INVALID_GRANT",
        message: "OAuth grant is invalid or expired.",
        suggestions: &[
            "Re-authenticate and store the new access token",
            "Check if the refresh token has been revoked",
            "Verify Connected App permissions",
        ],
    },
    KnownCode {
        code: "INSUFFICIENT_ACCESS",
        message: "You don't have permission to access this resource.",
        suggestions: &[
            "Check user profile permissions for the object",
            "Verify field-level security settings",
            "Ensure the user has the appropriate permission sets assigned",
            "Check sharing rules and record ownership",
        ],
    },
    KnownCode {
        code: "INSUFFICIENT_ACCESS_OR_READONLY",
        message: "Insufficient access rights or the record is read-only.",
        suggestions: &[
            "Check if the user has Edit permission on the object",
            "Verify the record is not locked by an approval process",
            "Ensure the record type allows modifications",
        ],
    },
    KnownCode {
        code: "FIELD_CUSTOM_VALIDATION_EXCEPTION",
        message: "A validation rule is preventing this operation.",
        suggestions: &[
            "Run `orgscope diagnose validation` to identify the rule",
            "Check active validation rules on the object",
            "Ensure all required fields have valid values",
        ],
    },
    KnownCode {
        code: "CANNOT_INSERT_UPDATE_ACTIVATE_ENTITY",
        message: "A trigger or process is preventing this operation.",
        suggestions: &[
            "Check for triggers on the object that may be failing",
            "Review Flow automations",
            "Look for recursion issues in triggers",
            "Run `orgscope diagnose trigger` for analysis",
        ],
    },
    KnownCode {
        code: "REQUIRED_FIELD_MISSING",
        message: "A required field is missing.",
        suggestions: &[
            "Describe the object to see all required fields",
            "Ensure all fields marked as required have values",
            "Review field-level security to ensure fields are visible",
        ],
    },
    KnownCode {
        code: "DUPLICATE_VALUE",
        message: "A duplicate value was found for a unique field.",
        suggestions: &[
            "Query existing records to find the duplicate",
            "Check for duplicate rules on the object",
            "Consider using upsert with an external ID instead",
        ],
    },
    KnownCode {
        code: "REQUEST_LIMIT_EXCEEDED",
        message: "API request limit has been exceeded.",
        suggestions: &[
            "Check current API usage in the org's limits",
            "Lean on the cache to reduce redundant API calls",
            "Wait for the limit to reset (usually 24 hours)",
        ],
    },
    KnownCode {
        code: "QUERY_TIMEOUT",
        message: "The query took too long to execute.",
        suggestions: &[
            "Add selective filters to reduce the result set",
            "Use a LIMIT clause to reduce returned records",
            "Break complex queries into smaller parts",
        ],
    },
    KnownCode {
        code: "NOT_FOUND",
        message: "The requested resource was not found.",
        suggestions: &[
            "Verify the record ID or API name is correct",
            "Check if the object or field exists in the org",
            "Ensure you have visibility to the resource",
        ],
    },
    KnownCode {
        code: "INVALID_FIELD",
        message: "One or more field names are invalid.",
        suggestions: &[
            "Describe the object to see valid field names",
            "Use field API names, not labels; custom fields end with __c",
            "Verify field-level security allows access to the field",
        ],
    },
    KnownCode {
        code: "INVALID_TYPE",
        message: "The object type is invalid or doesn't exist.",
        suggestions: &[
            "Check the object API name (not label)",
            "Verify custom object deployment is complete",
            "Ensure the object is enabled for your user profile",
        ],
    },
    KnownCode {
        code: "MALFORMED_QUERY",
        message: "The SOQL query has a syntax error.",
        suggestions: &[
            "Check for missing or misplaced keywords (SELECT, FROM, WHERE)",
            "Verify all field names are valid",
            "Ensure string values are quoted with single quotes",
        ],
    },
    KnownCode {
        code: "UNABLE_TO_LOCK_ROW",
        message: "Unable to obtain exclusive access to this record.",
        suggestions: &[
            "Another transaction is currently modifying this record",
            "Retry the operation after a brief delay",
            "Check for long-running batch jobs that may lock records",
        ],
    },
    KnownCode {
        code: "TIMEOUT",
        message: "Request timed out.",
        suggestions: &[
            "Retry the request",
            "Reduce the complexity of the operation",
            "Check the platform status page for service issues",
        ],
    },
];

const KEYWORD_SUGGESTIONS: &[(&[&str], &[&str])] = &[
    (
        &["session", "token", "login", "auth"],
        &[
            "Check that org.access_token is current",
            "Verify your session hasn't timed out",
        ],
    ),
    (
        &["permission", "access", "denied", "insufficient"],
        &[
            "Verify field-level security and object permissions",
            "Check sharing rules and ownership",
        ],
    ),
    (
        &["query", "soql", "select", "from"],
        &[
            "Check field and object API names are correct",
            "Ensure WHERE clause values are properly formatted",
        ],
    ),
    (
        &["trigger", "flow", "process", "workflow"],
        &[
            "Run `orgscope diagnose` to analyze automation issues",
            "Check for recursion in triggers",
        ],
    ),
    (
        &["validation", "required", "invalid"],
        &[
            "Check validation rules on the object",
            "Ensure all required fields have values",
        ],
    ),
];

const GENERIC_SUGGESTIONS: &[&str] = &[
    "Check the org's debug logs for more details",
    "Verify the operation and data are correct",
    "Re-run with --debug for a detailed trace",
];

impl ErrorReport {
    pub fn from_error(error: &Error) -> Self {
        let details = error.to_string();
        let error_code = error_code(error);
        let known = KNOWN_CODES.iter().find(|k| k.code == error_code);

        let message = match (error, known) {
            // The library's own not-found message names the missing item
            (Error::NotFound(e), _) => e.to_string(),
            (_, Some(known)) => known.message.to_string(),
            _ => details.clone(),
        };
        let suggestions = match known {
            Some(known) => known.suggestions.iter().map(|s| s.to_string()).collect(),
            None => keyword_suggestions(&details),
        };
        let (object_name, field_name) = match error {
            Error::NotFound(e) => (
                e.object_name().map(str::to_string),
                e.field_name().map(str::to_string),
            ),
            _ => (None, None),
        };

        Self {
            message,
            error_code,
            category: error.category(),
            suggestions,
            details,
            object_name,
            field_name,
        }
    }
}

fn error_code(error: &Error) -> String {
    let code = match error {
        Error::Client(ClientError::Api { code, .. }) => code.as_str(),
        Error::Client(ClientError::Transport { .. }) => "TRANSPORT_ERROR",
        Error::Client(ClientError::Decode { .. }) => "DECODE_ERROR",
        Error::Client(ClientError::ConnectionUnavailable { .. }) => "CONNECTION_UNAVAILABLE",
        Error::Validation(_) => "INVALID_INPUT",
        Error::NotFound(_) => "NOT_FOUND",
        Error::Internal(_) => "INTERNAL_ERROR",
    };
    code.to_string()
}

fn keyword_suggestions(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let found: Vec<String> = KEYWORD_SUGGESTIONS
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .flat_map(|(_, suggestions)| suggestions.iter().map(|s| s.to_string()))
        .collect();
    if found.is_empty() {
        GENERIC_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
    } else {
        found
    }
}
