//! Relational side of the board: accounts, opportunities and their satellites.
//!
//! Every operation takes a caller-owned connection; pass a `Transaction` to
//! group several calls into one commit.

pub mod address;
pub mod api_key;
pub mod card;
pub mod cv;
pub mod opportunity;
pub mod provider;
pub mod response;
pub mod tag;
pub mod user;

use rusqlite::types::{FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};

pub use address::{City, Country, CreateCountryErrorCode};
pub use api_key::{ApiKey, DeveloperApiKey, PersonalApiKey};
pub use card::OpportunityCard;
pub use cv::{Cv, CvFormat};
pub use opportunity::{Opportunity, OpportunityFilter, PAGE_SIZE};
pub use provider::OpportunityProvider;
pub use response::OpportunityResponse;
pub use tag::{CreateGeoTagErrorCode, CreateTagErrorCode, OpportunityGeoTag, OpportunityTag};
pub use user::{AvatarFormat, CreateUserErrorCode, User, UserInfo};

/// Format of an uploaded file; the extension doubles as the stored value.
pub trait FileFormat: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn extension(self) -> &'static str;

    fn mime_type(self) -> &'static str;

    fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.extension() == extension)
    }
}

pub(crate) fn format_to_sql<F: FileFormat>(format: F) -> ToSqlOutput<'static> {
    ToSqlOutput::from(format.extension())
}

pub(crate) fn format_from_sql<F: FileFormat>(value: ValueRef<'_>) -> FromSqlResult<F> {
    let extension = value.as_str()?;
    F::from_extension(extension).ok_or_else(|| FromSqlError::Other(format!("unknown file format '{extension}'").into()))
}
