use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::types::FormError;

pub const YANDEX_FORMS_HOST: &str = "forms.yandex.ru";

/// How a filled form leaves the board.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmitMethod {
    #[default]
    Noop,
    YandexForms { url: Url },
}

impl SubmitMethod {
    pub fn yandex_forms(raw_url: &str) -> Result<Self, FormError> {
        let url = Url::parse(raw_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FormError::UnsupportedScheme(url.scheme().to_string()));
        }
        match url.host_str() {
            Some(YANDEX_FORMS_HOST) => Ok(Self::YandexForms { url }),
            other => Err(FormError::InvalidHost(other.unwrap_or_default().to_string())),
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::YandexForms { .. } => "yandex_forms",
        }
    }

    pub fn to_dict(&self) -> Value {
        match self {
            Self::Noop => json!({ "type": self.type_tag() }),
            Self::YandexForms { url } => json!({ "type": self.type_tag(), "url": url.as_str() }),
        }
    }
}
