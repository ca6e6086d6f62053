use std::io::Read;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreResult;
use crate::store::objects::{object_key, ObjectStore, PROVIDER_LOGO_BUCKET};

/// Company or organisation publishing opportunities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunityProvider {
    pub id: i64,
    pub name: String,
}

impl OpportunityProvider {
    pub fn create(conn: &Connection, name: &str) -> StoreResult<Self> {
        conn.execute("INSERT INTO opportunity_provider (name) VALUES (?1)", params![name])?;
        Ok(Self {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    pub fn get(conn: &Connection, id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, name FROM opportunity_provider WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Self {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn logo_url(&self) -> String {
        format!("/api/opportunity-provider/logo/{}", self.id)
    }

    pub fn update_logo(&self, objects: &dyn ObjectStore, data: &mut dyn Read) -> StoreResult<u64> {
        objects.put(PROVIDER_LOGO_BUCKET, &object_key(self.id, "png"), data)
    }

    pub fn get_logo(&self, objects: &dyn ObjectStore) -> StoreResult<Vec<u8>> {
        objects.get_or_default(PROVIDER_LOGO_BUCKET, &object_key(self.id, "png"), "default.png")
    }
}
