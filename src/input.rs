//! Shape checks applied to requests before they reach the models.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::form::registry::{is_field_type, is_submit_method_type};
use crate::form::{FieldSpec, SubmitMethodSpec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("'{field}' should have at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("'{field}' should have at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("'{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

pub const EMAIL_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PERSON_NAME_MAX: usize = 50;
pub const TAG_NAME: (usize, usize) = (1, 50);
pub const PROVIDER_NAME: (usize, usize) = (4, 50);
pub const OPPORTUNITY_NAME: (usize, usize) = (1, 100);
pub const OPPORTUNITY_LINK_MAX: usize = 120;
pub const CARD_TITLE: (usize, usize) = (1, 100);
pub const CARD_SUBTITLE: (usize, usize) = (1, 50);
pub const CV_NAME: (usize, usize) = (1, 50);
pub const PLACE_NAME: (usize, usize) = (1, 50);
pub const PHONE_CODE: std::ops::RangeInclusive<u16> = 1..=999;

pub fn check_length(field: &'static str, value: &str, (min, max): (usize, usize)) -> Result<(), InputError> {
    let len = value.chars().count();
    if len < min {
        return Err(InputError::TooShort { field, min });
    }
    if len > max {
        return Err(InputError::TooLong { field, max });
    }
    Ok(())
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^([\w\-_.]*[^.])(@\w+)(\.\w+(\.\w+)?[^.\W])$").expect("email regex")
    })
}

fn api_key_regex() -> &'static Regex {
    static API_KEY: OnceLock<Regex> = OnceLock::new();
    API_KEY.get_or_init(|| Regex::new(r"^(dev|personal)-[0-9a-f]{64}$").expect("api key regex"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), InputError> {
        check_length("email", &self.email, (0, EMAIL_MAX))?;
        if self.email.starts_with('.') || !email_regex().is_match(&self.email) {
            return Err(InputError::Invalid {
                field: "email",
                message: "Input should be a valid email address".to_string(),
            });
        }
        check_length("password", &self.password, (PASSWORD_MIN, usize::MAX))
    }
}

/// Calendar date as entered by a user.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Date {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

impl Date {
    pub fn validate(&self) -> Result<NaiveDate, InputError> {
        if self.year < 1900 {
            return Err(InputError::Invalid {
                field: "year",
                message: "Year should be at least 1900".to_string(),
            });
        }
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or_else(|| InputError::Invalid {
            field: "date",
            message: "Invalid combination of year, month and day".to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfoUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub birthday: Option<Date>,
    #[serde(default)]
    pub city_id: Option<i64>,
}

impl UserInfoUpdate {
    pub fn validate(&self) -> Result<(), InputError> {
        if let Some(name) = &self.name {
            check_length("name", name, (0, PERSON_NAME_MAX))?;
        }
        if let Some(surname) = &self.surname {
            check_length("surname", surname, (0, PERSON_NAME_MAX))?;
        }
        if let Some(birthday) = &self.birthday {
            birthday.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpportunityCreate {
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
    pub provider_id: i64,
}

impl OpportunityCreate {
    pub fn validate(&self) -> Result<(), InputError> {
        check_length("name", &self.name, OPPORTUNITY_NAME)?;
        if let Some(link) = &self.link {
            let url = Url::parse(link).map_err(|e| InputError::Invalid {
                field: "link",
                message: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(InputError::Invalid {
                    field: "link",
                    message: "URL scheme should be 'http' or 'https'".to_string(),
                });
            }
            if url.as_str().len() > OPPORTUNITY_LINK_MAX {
                return Err(InputError::TooLong {
                    field: "link",
                    max: OPPORTUNITY_LINK_MAX,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardCreate {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
}

impl CardCreate {
    pub fn validate(&self) -> Result<(), InputError> {
        check_length("title", &self.title, CARD_TITLE)?;
        if let Some(subtitle) = &self.subtitle {
            check_length("subtitle", subtitle, CARD_SUBTITLE)?;
        }
        Ok(())
    }
}

/// Name of a new tag.
#[derive(Debug, Clone, Deserialize)]
pub struct TagCreate {
    pub name: String,
}

impl TagCreate {
    pub fn validate(&self) -> Result<(), InputError> {
        check_length("name", &self.name, TAG_NAME)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCreate {
    pub name: String,
}

impl ProviderCreate {
    pub fn validate(&self) -> Result<(), InputError> {
        check_length("name", &self.name, PROVIDER_NAME)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CvRename {
    pub name: String,
}

impl CvRename {
    pub fn validate(&self) -> Result<(), InputError> {
        check_length("name", &self.name, CV_NAME)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryCreate {
    pub name: String,
    pub phone_code: u16,
}

impl CountryCreate {
    pub fn validate(&self) -> Result<(), InputError> {
        check_length("name", &self.name, PLACE_NAME)?;
        if !PHONE_CODE.contains(&self.phone_code) {
            return Err(InputError::Invalid {
                field: "phone_code",
                message: format!("Phone code should be between {} and {}", PHONE_CODE.start(), PHONE_CODE.end()),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityCreate {
    pub name: String,
}

impl CityCreate {
    pub fn validate(&self) -> Result<(), InputError> {
        check_length("name", &self.name, PLACE_NAME)
    }
}

pub fn validate_api_key(raw: &str) -> Result<(), InputError> {
    if api_key_regex().is_match(raw) {
        Ok(())
    } else {
        Err(InputError::Invalid {
            field: "api_key",
            message: "Malformed API key".to_string(),
        })
    }
}

/// Pre-check for form definitions: at least one field, known type tags.
pub fn validate_form_fields(fields: &BTreeMap<String, FieldSpec>) -> Result<(), InputError> {
    if fields.is_empty() {
        return Err(InputError::TooShort { field: "fields", min: 1 });
    }
    for (name, spec) in fields {
        if !is_field_type(&spec.type_tag) {
            return Err(InputError::Invalid {
                field: "fields",
                message: format!("Unknown type '{}' of field '{name}'", spec.type_tag),
            });
        }
    }
    Ok(())
}

pub fn validate_submit_method(spec: &SubmitMethodSpec) -> Result<(), InputError> {
    if is_submit_method_type(&spec.type_tag) {
        Ok(())
    } else {
        Err(InputError::Invalid {
            field: "submit_method",
            message: format!("Unknown submit method '{}'", spec.type_tag),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::TypedSpec;
    use serde_json::json;

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_ordinary_credentials() {
        assert_eq!(credentials("ann.lee@mail.ru", "password123").validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_emails_and_short_passwords() {
        assert!(credentials(".ann@mail.ru", "password123").validate().is_err());
        assert!(credentials("ann.@mail.ru", "password123").validate().is_err());
        assert!(credentials("ann@mail", "password123").validate().is_err());
        assert_eq!(
            credentials("ann@mail.ru", "short").validate(),
            Err(InputError::TooShort {
                field: "password",
                min: PASSWORD_MIN
            })
        );
        let long = format!("{}@mail.ru", "a".repeat(50));
        assert!(matches!(
            credentials(&long, "password123").validate(),
            Err(InputError::TooLong { field: "email", .. })
        ));
    }

    #[test]
    fn dates_must_exist() {
        let ok = Date { day: 29, month: 2, year: 2024 };
        assert_eq!(ok.validate(), Ok(NaiveDate::from_ymd_opt(2024, 2, 29).expect("date")));
        assert!(Date { day: 29, month: 2, year: 2023 }.validate().is_err());
        assert!(Date { day: 1, month: 1, year: 1899 }.validate().is_err());
    }

    #[test]
    fn opportunity_link_is_bounded() {
        let mut request = OpportunityCreate {
            name: "Backend internship".to_string(),
            link: Some("https://example.com/jobs/1".to_string()),
            provider_id: 1,
        };
        assert_eq!(request.validate(), Ok(()));
        request.link = Some(format!("https://example.com/{}", "a".repeat(120)));
        assert!(matches!(request.validate(), Err(InputError::TooLong { field: "link", .. })));
        request.link = Some("mailto:hr@example.com".to_string());
        assert!(request.validate().is_err());
    }

    #[test]
    fn card_subtitle_length_is_checked() {
        let card = CardCreate {
            title: "Intern".to_string(),
            subtitle: Some("x".repeat(51)),
        };
        assert!(matches!(card.validate(), Err(InputError::TooLong { field: "subtitle", max: 50 })));
    }

    #[test]
    fn api_key_pattern() {
        assert_eq!(validate_api_key(&format!("dev-{}", "a".repeat(64))), Ok(()));
        assert!(validate_api_key(&format!("admin-{}", "a".repeat(64))).is_err());
        assert!(validate_api_key("personal-abc").is_err());
    }

    #[test]
    fn form_fields_need_known_tags() {
        assert!(validate_form_fields(&BTreeMap::new()).is_err());
        let fields = BTreeMap::from([(
            "when".to_string(),
            TypedSpec::new("date", json!({ "label": "When", "is_required": true })),
        )]);
        assert!(matches!(
            validate_form_fields(&fields),
            Err(InputError::Invalid { field: "fields", .. })
        ));
        assert!(validate_submit_method(&TypedSpec::new("noop", json!({}))).is_ok());
        assert!(validate_submit_method(&TypedSpec::new("mail", json!({}))).is_err());
    }

    #[test]
    fn user_info_update_checks_present_values_only() {
        let update = UserInfoUpdate {
            surname: Some("x".repeat(51)),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert_eq!(UserInfoUpdate::default().validate(), Ok(()));
    }

    #[test]
    fn entity_names_respect_their_bounds() {
        assert_eq!(TagCreate { name: "rust".to_string() }.validate(), Ok(()));
        assert_eq!(
            TagCreate { name: String::new() }.validate(),
            Err(InputError::TooShort { field: "name", min: 1 })
        );
        assert_eq!(
            ProviderCreate { name: "IBM".to_string() }.validate(),
            Err(InputError::TooShort { field: "name", min: 4 })
        );
        assert_eq!(ProviderCreate { name: "Acme".to_string() }.validate(), Ok(()));
        assert!(matches!(
            CvRename { name: "x".repeat(51) }.validate(),
            Err(InputError::TooLong { field: "name", max: 50 })
        ));
        assert_eq!(CityCreate { name: "Kazan".to_string() }.validate(), Ok(()));
        assert!(CityCreate { name: String::new() }.validate().is_err());
    }

    #[test]
    fn country_phone_code_is_bounded() {
        let mut country = CountryCreate {
            name: "Russia".to_string(),
            phone_code: 7,
        };
        assert_eq!(country.validate(), Ok(()));
        country.phone_code = 0;
        assert!(matches!(country.validate(), Err(InputError::Invalid { field: "phone_code", .. })));
        country.phone_code = 1000;
        assert!(country.validate().is_err());
        country.phone_code = 7;
        country.name = "x".repeat(51);
        assert!(matches!(country.validate(), Err(InputError::TooLong { field: "name", .. })));
    }
}
