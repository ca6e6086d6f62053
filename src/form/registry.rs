//! Static lookup tables from a definition's `type` tag to its constructor.
//!
//! Tags reaching this module are expected to have passed input validation
//! already (see [`is_field_type`] / [`is_submit_method_type`]); an unknown tag
//! here is reported as [`FormError::UnhandledType`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::field::{ChoiceField, FieldDefinition, RegexField, StringField};
use super::submit::SubmitMethod;
use super::types::FormError;

/// A definition as supplied by a form owner: a `type` tag plus its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedSpec {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl TypedSpec {
    pub fn new(type_tag: &str, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            type_tag: type_tag.to_string(),
            payload,
        }
    }
}

pub type FieldSpec = TypedSpec;
pub type SubmitMethodSpec = TypedSpec;

type FieldFactory = fn(&TypedSpec) -> Result<FieldDefinition, FormError>;
type SubmitMethodFactory = fn(&TypedSpec) -> Result<SubmitMethod, FormError>;

const FIELD_FACTORIES: &[(&str, FieldFactory)] = &[
    ("string", string_field),
    ("regex", regex_field),
    ("choice", choice_field),
];

const SUBMIT_METHOD_FACTORIES: &[(&str, SubmitMethodFactory)] = &[
    ("noop", noop_submit_method),
    ("yandex_forms", yandex_forms_submit_method),
];

pub fn create_field(spec: &FieldSpec) -> Result<FieldDefinition, FormError> {
    let factory = FIELD_FACTORIES
        .iter()
        .find(|(tag, _)| *tag == spec.type_tag)
        .map(|(_, factory)| factory)
        .ok_or_else(|| FormError::UnhandledType {
            kind: "field",
            tag: spec.type_tag.clone(),
        })?;
    factory(spec)
}

pub fn create_submit_method(spec: &SubmitMethodSpec) -> Result<SubmitMethod, FormError> {
    let factory = SUBMIT_METHOD_FACTORIES
        .iter()
        .find(|(tag, _)| *tag == spec.type_tag)
        .map(|(_, factory)| factory)
        .ok_or_else(|| FormError::UnhandledType {
            kind: "submit method",
            tag: spec.type_tag.clone(),
        })?;
    factory(spec)
}

pub fn is_field_type(tag: &str) -> bool {
    FIELD_FACTORIES.iter().any(|(known, _)| *known == tag)
}

pub fn is_submit_method_type(tag: &str) -> bool {
    SUBMIT_METHOD_FACTORIES.iter().any(|(known, _)| *known == tag)
}

fn parse<T: DeserializeOwned>(spec: &TypedSpec) -> Result<T, FormError> {
    serde_json::from_value(Value::Object(spec.payload.clone())).map_err(|source| {
        FormError::MalformedDefinition {
            tag: spec.type_tag.clone(),
            source,
        }
    })
}

#[derive(Deserialize)]
struct StringFieldPayload {
    label: String,
    is_required: bool,
    #[serde(default)]
    max_length: Option<u32>,
}

#[derive(Deserialize)]
struct RegexFieldPayload {
    #[serde(flatten)]
    base: StringFieldPayload,
    regex: String,
}

#[derive(Deserialize)]
struct ChoiceFieldPayload {
    label: String,
    is_required: bool,
    choices: Vec<String>,
}

#[derive(Deserialize)]
struct YandexFormsPayload {
    url: String,
}

fn string_field(spec: &TypedSpec) -> Result<FieldDefinition, FormError> {
    let p: StringFieldPayload = parse(spec)?;
    Ok(FieldDefinition::String(StringField::new(
        p.label,
        p.is_required,
        p.max_length,
    )?))
}

fn regex_field(spec: &TypedSpec) -> Result<FieldDefinition, FormError> {
    let p: RegexFieldPayload = parse(spec)?;
    let base = StringField::new(p.base.label, p.base.is_required, p.base.max_length)?;
    Ok(FieldDefinition::Regex(RegexField::new(base, &p.regex)?))
}

fn choice_field(spec: &TypedSpec) -> Result<FieldDefinition, FormError> {
    let p: ChoiceFieldPayload = parse(spec)?;
    Ok(FieldDefinition::Choice(ChoiceField::new(
        p.label,
        p.is_required,
        p.choices,
    )?))
}

fn noop_submit_method(_spec: &TypedSpec) -> Result<SubmitMethod, FormError> {
    Ok(SubmitMethod::Noop)
}

fn yandex_forms_submit_method(spec: &TypedSpec) -> Result<SubmitMethod, FormError> {
    let p: YandexFormsPayload = parse(spec)?;
    SubmitMethod::yandex_forms(&p.url)
}
