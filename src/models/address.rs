use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::error::{GenericError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CreateCountryErrorCode {
    NonUniqueName = 0,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub phone_code: String,
}

impl Country {
    pub fn create(
        conn: &Connection,
        name: &str,
        phone_code: &str,
    ) -> StoreResult<Result<Self, GenericError<CreateCountryErrorCode>>> {
        let taken: Option<i64> = conn
            .query_row("SELECT id FROM country WHERE name = ?1", params![name], |row| row.get(0))
            .optional()?;
        if taken.is_some() {
            debug!(name, "'Country::create' exited with 'NON_UNIQUE_NAME' error");
            return Ok(Err(GenericError::new(
                CreateCountryErrorCode::NonUniqueName,
                "Country with given name already exists",
            )));
        }
        conn.execute(
            "INSERT INTO country (name, phone_code) VALUES (?1, ?2)",
            params![name, phone_code],
        )?;
        Ok(Ok(Self {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            phone_code: phone_code.to_string(),
        }))
    }

    pub fn get(conn: &Connection, id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, name, phone_code FROM country WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Self {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        phone_code: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct City {
    pub id: i64,
    pub country_id: i64,
    pub name: String,
}

impl City {
    pub fn create(conn: &Connection, country: &Country, name: &str) -> StoreResult<Self> {
        conn.execute(
            "INSERT INTO city (country_id, name) VALUES (?1, ?2)",
            params![country.id, name],
        )?;
        Ok(Self {
            id: conn.last_insert_rowid(),
            country_id: country.id,
            name: name.to_string(),
        })
    }

    pub fn get(conn: &Connection, id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, country_id, name FROM city WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Self {
                        id: row.get(0)?,
                        country_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    /// `"<country>, <city>"`
    pub fn full_name(&self, conn: &Connection) -> StoreResult<String> {
        let country: String = conn.query_row(
            "SELECT name FROM country WHERE id = ?1",
            params![self.country_id],
            |row| row.get(0),
        )?;
        Ok(format!("{country}, {}", self.name))
    }
}
