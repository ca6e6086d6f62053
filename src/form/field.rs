use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use super::types::{field_error, FieldError, FieldErrorCode, FormError};
use super::value::FieldValue;

/// One field of an opportunity form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldDefinition {
    String(StringField),
    Regex(RegexField),
    Choice(ChoiceField),
}

impl FieldDefinition {
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Regex(_) => "regex",
            Self::Choice(_) => "choice",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::String(f) => &f.label,
            Self::Regex(f) => &f.base.label,
            Self::Choice(f) => &f.label,
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            Self::String(f) => f.is_required,
            Self::Regex(f) => f.base.is_required,
            Self::Choice(f) => f.is_required,
        }
    }

    pub fn validate_input(&self, field_name: &str, input: &FieldValue) -> Option<FieldError> {
        match self {
            Self::String(f) => f.validate_input(field_name, input),
            Self::Regex(f) => f.validate_input(field_name, input),
            Self::Choice(f) => f.validate_input(field_name, input),
        }
    }

    /// Description used by clients to render the field.
    pub fn to_dict(&self) -> Value {
        match self {
            Self::String(f) => json!({
              "type": self.type_tag(),
              "label": f.label,
              "is_required": f.is_required,
              "max_length": f.max_length,
            }),
            Self::Regex(f) => json!({
              "type": self.type_tag(),
              "label": f.base.label,
              "is_required": f.base.is_required,
              "max_length": f.base.max_length,
              "regex": f.regex.as_str(),
            }),
            Self::Choice(f) => json!({
              "type": self.type_tag(),
              "label": f.label,
              "is_required": f.is_required,
              "choices": f.choices,
            }),
        }
    }
}

fn wrong_type(field_name: &str) -> FieldError {
    field_error(FieldErrorCode::WrongType, "Field input must be a string", field_name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringField {
    pub label: String,
    pub is_required: bool,
    #[serde(default)]
    pub max_length: Option<u32>,
}

impl StringField {
    pub fn new(label: String, is_required: bool, max_length: Option<u32>) -> Result<Self, FormError> {
        if max_length == Some(0) {
            return Err(FormError::InvalidMaxLength);
        }
        Ok(Self {
            label,
            is_required,
            max_length,
        })
    }

    /// Type and length checks shared with [`RegexField`]; yields the text on success.
    fn check<'a>(&self, field_name: &str, input: &'a FieldValue) -> Result<&'a str, FieldError> {
        let text = input.as_str().ok_or_else(|| wrong_type(field_name))?;
        if let Some(max_length) = self.max_length {
            if text.chars().count() > max_length as usize {
                return Err(field_error(
                    FieldErrorCode::LengthNotInRange,
                    format!("Field input can contain at most {max_length} symbols"),
                    field_name,
                ));
            }
        }
        Ok(text)
    }

    pub fn validate_input(&self, field_name: &str, input: &FieldValue) -> Option<FieldError> {
        self.check(field_name, input).err()
    }
}

/// A compiled regular expression that matches from the start of the input.
///
/// Matching is anchored at offset 0 only: anything after a matching prefix is
/// accepted.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    anchored: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, FormError> {
        Regex::new(source)?;
        let anchored = Regex::new(&format!("^(?:{source})"))?;
        Ok(Self {
            source: source.to_string(),
            anchored,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches_prefix(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexField {
    #[serde(flatten)]
    pub base: StringField,
    pub regex: Pattern,
}

impl RegexField {
    pub fn new(base: StringField, regex: &str) -> Result<Self, FormError> {
        Ok(Self {
            base,
            regex: Pattern::new(regex)?,
        })
    }

    pub fn validate_input(&self, field_name: &str, input: &FieldValue) -> Option<FieldError> {
        let text = match self.base.check(field_name, input) {
            Ok(text) => text,
            Err(error) => return Some(error),
        };
        if !self.regex.matches_prefix(text) {
            return Some(field_error(
                FieldErrorCode::InvalidPattern,
                "Field input doesn't match expected pattern",
                field_name,
            ));
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceField {
    pub label: String,
    pub is_required: bool,
    pub choices: Vec<String>,
}

impl ChoiceField {
    pub fn new(label: String, is_required: bool, choices: Vec<String>) -> Result<Self, FormError> {
        if choices.is_empty() {
            return Err(FormError::EmptyChoices);
        }
        let mut unique: Vec<String> = Vec::with_capacity(choices.len());
        for choice in choices {
            if !unique.contains(&choice) {
                unique.push(choice);
            }
        }
        Ok(Self {
            label,
            is_required,
            choices: unique,
        })
    }

    pub fn validate_input(&self, field_name: &str, input: &FieldValue) -> Option<FieldError> {
        let text = match input.as_str() {
            Some(text) => text,
            None => return Some(wrong_type(field_name)),
        };
        if !self.choices.iter().any(|choice| choice == text) {
            return Some(field_error(
                FieldErrorCode::InvalidChoice,
                "Field input must be one of provided choices",
                field_name,
            ));
        }
        None
    }
}
