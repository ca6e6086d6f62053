use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::error::{GenericError, StoreResult};

use super::address::City;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CreateTagErrorCode {
    NonUniqueName = 0,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunityTag {
    pub id: i64,
    pub name: String,
}

impl OpportunityTag {
    pub fn create(conn: &Connection, name: &str) -> StoreResult<Result<Self, GenericError<CreateTagErrorCode>>> {
        let taken: Option<i64> = conn
            .query_row("SELECT id FROM opportunity_tag WHERE name = ?1", params![name], |row| row.get(0))
            .optional()?;
        if taken.is_some() {
            debug!(name, "'OpportunityTag::create' exited with 'NON_UNIQUE_NAME' error");
            return Ok(Err(GenericError::new(
                CreateTagErrorCode::NonUniqueName,
                "Tag with given name already exists",
            )));
        }
        conn.execute("INSERT INTO opportunity_tag (name) VALUES (?1)", params![name])?;
        Ok(Ok(Self {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        }))
    }

    pub fn get(conn: &Connection, id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row("SELECT id, name FROM opportunity_tag WHERE id = ?1", params![id], |row| {
                Ok(Self {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?)
    }

    pub fn list(conn: &Connection) -> StoreResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT id, name FROM opportunity_tag ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Self {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<Self>>>()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CreateGeoTagErrorCode {
    NonUniqueCity = 0,
}

/// Location tag; at most one per city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunityGeoTag {
    pub id: i64,
    pub city_id: i64,
}

impl OpportunityGeoTag {
    pub fn create(conn: &Connection, city: &City) -> StoreResult<Result<Self, GenericError<CreateGeoTagErrorCode>>> {
        let taken: Option<i64> = conn
            .query_row(
                "SELECT id FROM opportunity_geo_tag WHERE city_id = ?1",
                params![city.id],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            debug!(city_id = city.id, "'OpportunityGeoTag::create' exited with 'NON_UNIQUE_CITY' error");
            return Ok(Err(GenericError::new(
                CreateGeoTagErrorCode::NonUniqueCity,
                "Geo tag for given city already exists",
            )));
        }
        conn.execute("INSERT INTO opportunity_geo_tag (city_id) VALUES (?1)", params![city.id])?;
        Ok(Ok(Self {
            id: conn.last_insert_rowid(),
            city_id: city.id,
        }))
    }

    pub fn get(conn: &Connection, id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, city_id FROM opportunity_geo_tag WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Self {
                        id: row.get(0)?,
                        city_id: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Country;
    use crate::store::open_in_memory;

    #[test]
    fn tag_names_are_unique() {
        let conn = open_in_memory().expect("db");
        let tag = OpportunityTag::create(&conn, "rust").expect("db").expect("created");
        let err = OpportunityTag::create(&conn, "rust").expect("db").expect_err("duplicate");
        assert_eq!(err.error_code, CreateTagErrorCode::NonUniqueName);
        assert_eq!(err.error_message, "Tag with given name already exists");
        assert_eq!(OpportunityTag::get(&conn, tag.id).expect("db"), Some(tag));
    }

    #[test]
    fn lists_tags_by_name() {
        let conn = open_in_memory().expect("db");
        OpportunityTag::create(&conn, "rust").expect("db").expect("created");
        OpportunityTag::create(&conn, "go").expect("db").expect("created");
        let names = OpportunityTag::list(&conn)
            .expect("list")
            .into_iter()
            .map(|t| t.name)
            .collect::<Vec<String>>();
        assert_eq!(names, vec!["go".to_string(), "rust".to_string()]);
    }

    #[test]
    fn one_geo_tag_per_city() {
        let conn = open_in_memory().expect("db");
        let country = Country::create(&conn, "Russia", "7").expect("db").expect("created");
        let city = City::create(&conn, &country, "Kazan").expect("city");
        let geo = OpportunityGeoTag::create(&conn, &city).expect("db").expect("created");
        assert_eq!(geo.city_id, city.id);
        let err = OpportunityGeoTag::create(&conn, &city).expect("db").expect_err("duplicate");
        assert_eq!(err.error_code, CreateGeoTagErrorCode::NonUniqueCity);
    }
}
