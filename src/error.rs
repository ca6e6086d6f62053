use serde::Serialize;
use thiserror::Error;

use crate::form::FormError;

/// Result-typed domain error: a code, a message and an optional context.
///
/// Returned as a value next to the success type (duplicate names, invalid
/// field input) rather than propagated as a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericError<C, Ctx = ()> {
    pub error_code: C,
    pub error_message: String,
    pub context: Ctx,
}

impl<C> GenericError<C> {
    pub fn new(error_code: C, error_message: impl Into<String>) -> Self {
        Self {
            error_code,
            error_message: error_message.into(),
            context: (),
        }
    }
}

impl<C, Ctx> GenericError<C, Ctx> {
    pub fn with_context(error_code: C, error_message: impl Into<String>, context: Ctx) -> Self {
        Self {
            error_code,
            error_message: error_message.into(),
            context,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("document serialization failed: {0}")]
    Document(#[from] serde_json::Error),
    #[error("object store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("object '{bucket}/{key}' not found")]
    ObjectNotFound { bucket: String, key: String },
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("form {form_id} does not belong to opportunity {opportunity_id}")]
    FormMismatch { form_id: i64, opportunity_id: i64 },
}

pub type StoreResult<T> = Result<T, StoreError>;
