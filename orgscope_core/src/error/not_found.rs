//! Not-found error types

use thiserror::Error;

/// An explicitly named item that does not exist in the org
#[derive(Error, Debug)]
pub enum NotFoundError {
    /// Object missing from the org schema
    #[error("Object '{object}' not found")]
    Object { object: String },

    /// Field missing from an object's schema
    #[error("Field '{field}' not found on object '{object}'")]
    Field { object: String, field: String },

    /// Named metadata component (trigger, flow, rule, profile) missing
    #[error("{kind} '{name}' not found")]
    Component { kind: String, name: String },
}

impl NotFoundError {
    pub fn object(object: &str) -> Self {
        Self::Object {
            object: object.to_string(),
        }
    }

    pub fn field(object: &str, field: &str) -> Self {
        Self::Field {
            object: object.to_string(),
            field: field.to_string(),
        }
    }

    pub fn component(kind: &str, name: &str) -> Self {
        Self::Component {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Object the missing item belongs to, when known
    pub fn object_name(&self) -> Option<&str> {
        match self {
            Self::Object { object } | Self::Field { object, .. } => Some(object),
            Self::Component { .. } => None,
        }
    }

    /// Field name for field lookups
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field { field, .. } => Some(field),
            _ => None,
        }
    }
}
