use std::io::Read;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::objects::{object_key, ObjectStore, USER_CV_BUCKET};

use super::{format_from_sql, format_to_sql, FileFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvFormat {
    Pdf,
}

impl FileFormat for CvFormat {
    const ALL: &'static [Self] = &[Self::Pdf];

    fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
        }
    }
}

impl ToSql for CvFormat {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(format_to_sql(*self))
    }
}

impl FromSql for CvFormat {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        format_from_sql(value)
    }
}

/// Uploaded CV; the file itself sits in the object store under `"{id}.{ext}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cv {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub format: CvFormat,
    pub public: bool,
}

impl Cv {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            format: row.get(3)?,
            public: row.get(4)?,
        })
    }

    fn object_key(&self) -> String {
        object_key(self.id, self.format.extension())
    }

    /// Inserts the row, then uploads the file under the new id. Run inside a
    /// transaction so a failed upload leaves no row behind.
    pub fn add(
        conn: &Connection,
        objects: &dyn ObjectStore,
        user_id: i64,
        name: &str,
        format: CvFormat,
        data: &mut dyn Read,
    ) -> StoreResult<Self> {
        conn.execute(
            "INSERT INTO cv (user_id, name, format) VALUES (?1, ?2, ?3)",
            params![user_id, name, format],
        )?;
        let cv = Self {
            id: conn.last_insert_rowid(),
            user_id,
            name: name.to_string(),
            format,
            public: false,
        };
        let bytes = objects.put(USER_CV_BUCKET, &cv.object_key(), data)?;
        debug!(cv_id = cv.id, user_id, bytes, "cv uploaded");
        Ok(cv)
    }

    pub fn get(conn: &Connection, id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, user_id, name, format, public FROM cv WHERE id = ?1",
                params![id],
                Self::from_row,
            )
            .optional()?)
    }

    pub fn list_for_user(conn: &Connection, user_id: i64) -> StoreResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT id, user_id, name, format, public FROM cv WHERE user_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![user_id], Self::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<Self>>>()?)
    }

    pub fn rename(&mut self, conn: &Connection, name: &str) -> StoreResult<()> {
        conn.execute("UPDATE cv SET name = ?1 WHERE id = ?2", params![name, self.id])?;
        self.name = name.to_string();
        Ok(())
    }

    /// Drops the file and the row. A file already gone is not an error.
    pub fn delete(self, conn: &Connection, objects: &dyn ObjectStore) -> StoreResult<()> {
        match objects.remove(USER_CV_BUCKET, &self.object_key()) {
            Ok(()) | Err(StoreError::ObjectNotFound { .. }) => {}
            Err(err) => return Err(err),
        }
        conn.execute("DELETE FROM cv WHERE id = ?1", params![self.id])?;
        Ok(())
    }

    pub fn get_file(&self, objects: &dyn ObjectStore) -> StoreResult<Vec<u8>> {
        objects.get(USER_CV_BUCKET, &self.object_key())
    }
}
