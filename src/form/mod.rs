//! Dynamic application forms.
//!
//! Every opportunity may publish one [`OpportunityForm`]: a set of named,
//! runtime-typed fields plus a [`SubmitMethod`]. Applicant payloads are checked
//! against that per-instance schema by [`process`], which reports every
//! field-level problem at once instead of stopping at the first one.

pub mod document;
pub mod field;
pub mod registry;
pub mod response;
pub mod submit;
pub mod types;
pub mod value;

pub use document::OpportunityForm;
pub use field::{ChoiceField, FieldDefinition, Pattern, RegexField, StringField};
pub use registry::{create_field, create_submit_method, FieldSpec, SubmitMethodSpec, TypedSpec};
pub use response::{process, RawPayload, ResponseData, ValidatedPayload};
pub use submit::{SubmitMethod, YANDEX_FORMS_HOST};
pub use types::{FieldError, FieldErrorCode, FieldErrorContext, FormError};
pub use value::FieldValue;
