use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::form::{process, FieldError, OpportunityForm, RawPayload, ResponseData};

use super::opportunity::Opportunity;
use super::user::User;

/// A user's application to an opportunity. Answers live in [`ResponseData`]
/// under the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunityResponse {
    pub id: i64,
    pub user_id: i64,
    pub opportunity_id: i64,
}

impl OpportunityResponse {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            opportunity_id: row.get(2)?,
        })
    }

    /// Validates `raw` against `form`; only a clean payload creates the
    /// response row and its data document. `form` must be the opportunity's own.
    pub fn create(
        conn: &Connection,
        user: &User,
        opportunity: &Opportunity,
        form: &OpportunityForm,
        raw: &RawPayload,
    ) -> StoreResult<Result<Self, Vec<FieldError>>> {
        if form.id != opportunity.id {
            return Err(StoreError::FormMismatch {
                form_id: form.id,
                opportunity_id: opportunity.id,
            });
        }
        let data = match process(form, raw) {
            Ok(data) => data,
            Err(errors) => {
                debug!(
                    user_id = user.id,
                    opportunity_id = opportunity.id,
                    errors = errors.len(),
                    "'OpportunityResponse::create' rejected payload"
                );
                return Ok(Err(errors));
            }
        };
        conn.execute(
            "INSERT INTO opportunity_response (user_id, opportunity_id) VALUES (?1, ?2)",
            params![user.id, opportunity.id],
        )?;
        let response = Self {
            id: conn.last_insert_rowid(),
            user_id: user.id,
            opportunity_id: opportunity.id,
        };
        ResponseData::insert(conn, response.id, data)?;
        Ok(Ok(response))
    }

    pub fn get(conn: &Connection, id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, user_id, opportunity_id FROM opportunity_response WHERE id = ?1",
                params![id],
                Self::from_row,
            )
            .optional()?)
    }

    pub fn list_for_user(conn: &Connection, user_id: i64) -> StoreResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, opportunity_id FROM opportunity_response WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], Self::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<Self>>>()?)
    }

    pub fn list_for_opportunity(conn: &Connection, opportunity_id: i64) -> StoreResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, opportunity_id FROM opportunity_response WHERE opportunity_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![opportunity_id], Self::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<Self>>>()?)
    }

    pub fn data(&self, conn: &Connection) -> StoreResult<Option<ResponseData>> {
        ResponseData::get(conn, self.id)
    }
}
