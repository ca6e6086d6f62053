//! JSON documents keyed by integer id, stored next to the relational tables.

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    OpportunityForm,
    ResponseData,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Self::OpportunityForm => "opportunity_form",
            Self::ResponseData => "response_data",
        }
    }
}

/// Insert or fully replace the document stored under `id`.
pub fn put_document<T: Serialize>(conn: &Connection, collection: Collection, id: i64, document: &T) -> StoreResult<()> {
    let payload = serde_json::to_string(document)?;
    conn.execute(
        &format!(
            "INSERT INTO {} (id, document) VALUES (?1, ?2) \
            ON CONFLICT(id) DO UPDATE SET document = excluded.document",
            collection.table()
        ),
        params![id, payload],
    )?;
    Ok(())
}

/// Insert a document; fails when `id` is already taken.
pub fn insert_document<T: Serialize>(conn: &Connection, collection: Collection, id: i64, document: &T) -> StoreResult<()> {
    let payload = serde_json::to_string(document)?;
    conn.execute(
        &format!("INSERT INTO {} (id, document) VALUES (?1, ?2)", collection.table()),
        params![id, payload],
    )?;
    Ok(())
}

pub fn get_document<T: DeserializeOwned>(conn: &Connection, collection: Collection, id: i64) -> StoreResult<Option<T>> {
    let raw: Option<String> = conn
        .query_row(
            &format!("SELECT document FROM {} WHERE id = ?1", collection.table()),
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn delete_document(conn: &Connection, collection: Collection, id: i64) -> StoreResult<bool> {
    let removed = conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1", collection.table()),
        params![id],
    )?;
    Ok(removed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::open_in_memory;
    use serde_json::{json, Value};

    #[test]
    fn put_replaces_whole_document() {
        let conn = open_in_memory().expect("db");
        put_document(&conn, Collection::OpportunityForm, 7, &json!({ "a": 1, "b": 2 })).expect("put");
        put_document(&conn, Collection::OpportunityForm, 7, &json!({ "c": 3 })).expect("replace");
        let stored: Value = get_document(&conn, Collection::OpportunityForm, 7)
            .expect("get")
            .expect("present");
        assert_eq!(stored, json!({ "c": 3 }));
    }

    #[test]
    fn insert_refuses_duplicate_id() {
        let conn = open_in_memory().expect("db");
        insert_document(&conn, Collection::ResponseData, 1, &json!({})).expect("insert");
        let err = insert_document(&conn, Collection::ResponseData, 1, &json!({})).expect_err("duplicate");
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn collections_are_independent() {
        let conn = open_in_memory().expect("db");
        put_document(&conn, Collection::OpportunityForm, 1, &json!("form")).expect("put");
        let missing: Option<Value> = get_document(&conn, Collection::ResponseData, 1).expect("get");
        assert!(missing.is_none());
        assert!(delete_document(&conn, Collection::OpportunityForm, 1).expect("delete"));
        assert!(!delete_document(&conn, Collection::OpportunityForm, 1).expect("delete again"));
    }
}
