//! Helpers for interpolating user input into SOQL

use crate::error::{Result, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;

static API_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z][a-zA-Z0-9_]*(__c|__mdt|__e|__b|__x|__kav|__ka|__Feed|__Share|__History|__Tag)?$",
    )
    .expect("API name pattern compiles")
});

const MAX_API_NAME_LEN: usize = 255;

/// Escape a value for use inside a single-quoted SOQL literal
///
/// Backslashes and quotes are escaped, NUL bytes dropped, and line breaks
/// flattened to spaces.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\0' => {}
            '\n' | '\r' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape and single-quote a literal
pub fn quote(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}

/// Check that `name` is a well-formed API name
///
/// `kind` names the thing being checked in the error ("object", "field", ...).
pub fn validate_api_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ValidationError::invalid_identifier(kind, name, "must not be empty").into());
    }
    if name.len() > MAX_API_NAME_LEN {
        return Err(
            ValidationError::invalid_identifier(kind, name, "must be at most 255 characters")
                .into(),
        );
    }
    if !API_NAME.is_match(name) {
        return Err(ValidationError::invalid_identifier(
            kind,
            name,
            "must start with a letter and contain only letters, digits and underscores",
        )
        .into());
    }
    Ok(())
}
