use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::StoreResult;
use crate::store::documents::{get_document, insert_document, Collection};

use super::document::OpportunityForm;
use super::types::{field_error, FieldError, FieldErrorCode};
use super::value::FieldValue;

/// Payload exactly as submitted by an applicant.
pub type RawPayload = Map<String, Value>;

/// Values that passed their field's validation, keyed by field name.
pub type ValidatedPayload = BTreeMap<String, FieldValue>;

fn extra_field_error(field_name: &str) -> FieldError {
    field_error(FieldErrorCode::Extra, "Unexpected field", field_name)
}

fn missing_field_error(field_name: &str) -> FieldError {
    field_error(FieldErrorCode::Missing, "Missing required field", field_name)
}

fn wrong_type_error(field_name: &str) -> FieldError {
    field_error(FieldErrorCode::WrongType, "Field input has unsupported type", field_name)
}

/// Validates `raw` against `form`.
///
/// Every supplied key is checked (undeclared keys are `EXTRA`), then every
/// required field absent from `raw` is reported as `MISSING`. Any error
/// discards the whole payload; the error list is complete, not first-failure.
pub fn process(form: &OpportunityForm, raw: &RawPayload) -> Result<ValidatedPayload, Vec<FieldError>> {
    let mut errors: Vec<FieldError> = Vec::new();
    let mut validated = ValidatedPayload::new();

    for (field_name, value) in raw {
        let Some(field) = form.fields.get(field_name) else {
            errors.push(extra_field_error(field_name));
            continue;
        };
        let Some(value) = FieldValue::from_json(value) else {
            errors.push(wrong_type_error(field_name));
            continue;
        };
        if let Some(error) = field.validate_input(field_name, &value) {
            errors.push(error);
            continue;
        }
        validated.insert(field_name.clone(), value);
    }

    for (field_name, field) in &form.fields {
        if field.is_required() && !raw.contains_key(field_name) {
            errors.push(missing_field_error(field_name));
        }
    }

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}

/// Validated answers of one response; shares the response's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    pub id: i64,
    pub data: ValidatedPayload,
}

impl ResponseData {
    /// Validates and stores the answers for `response_id`.
    ///
    /// Field errors come back in the inner `Err`; nothing is written then.
    pub fn create(
        conn: &Connection,
        response_id: i64,
        form: &OpportunityForm,
        raw: &RawPayload,
    ) -> StoreResult<Result<Self, Vec<FieldError>>> {
        match process(form, raw) {
            Ok(data) => Ok(Ok(Self::insert(conn, response_id, data)?)),
            Err(errors) => {
                debug!(
                    response_id,
                    form_id = form.id,
                    errors = errors.len(),
                    "'ResponseData::create' rejected payload"
                );
                Ok(Err(errors))
            }
        }
    }

    pub(crate) fn insert(conn: &Connection, response_id: i64, data: ValidatedPayload) -> StoreResult<Self> {
        let record = Self {
            id: response_id,
            data,
        };
        insert_document(conn, Collection::ResponseData, response_id, &record)?;
        Ok(record)
    }

    pub fn get(conn: &Connection, response_id: i64) -> StoreResult<Option<Self>> {
        get_document(conn, Collection::ResponseData, response_id)
    }
}
