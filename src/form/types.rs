use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::error::GenericError;

/// Kind of a field-level validation failure.
///
/// The numeric tags are part of the wire contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FieldErrorCode {
    Missing = 100,
    Extra = 101,
    WrongType = 102,
    LengthNotInRange = 103,
    InvalidPattern = 104,
    InvalidChoice = 105,
}

impl FieldErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "MISSING",
            Self::Extra => "EXTRA",
            Self::WrongType => "WRONG_TYPE",
            Self::LengthNotInRange => "LENGTH_NOT_IN_RANGE",
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::InvalidChoice => "INVALID_CHOICE",
        }
    }
}

impl Serialize for FieldErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrorContext {
    pub field_name: String,
}

pub type FieldError = GenericError<FieldErrorCode, FieldErrorContext>;

pub(crate) fn field_error(code: FieldErrorCode, message: impl Into<String>, field_name: &str) -> FieldError {
    GenericError::with_context(
        code,
        message,
        FieldErrorContext {
            field_name: field_name.to_string(),
        },
    )
}

/// Failure to build a field or submit method from its definition.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("unhandled {kind} type: '{tag}'")]
    UnhandledType { kind: &'static str, tag: String },
    #[error("malformed '{tag}' definition: {source}")]
    MalformedDefinition {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("input should be a valid regular expression: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("choice field must declare at least one choice")]
    EmptyChoices,
    #[error("max_length must be at least 1")]
    InvalidMaxLength,
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("URL scheme '{0}' is not http or https")]
    UnsupportedScheme(String),
    #[error("invalid URL host: '{0}'")]
    InvalidHost(String),
}
