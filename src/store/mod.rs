pub mod documents;
pub mod objects;

use std::fs;
use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::StoreResult;

pub use objects::{FsObjectStore, ObjectStore};

pub fn open(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    prepare(&conn)?;
    debug!(path = %path.display(), "database opened");
    Ok(conn)
}

pub fn open_in_memory() -> StoreResult<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    init_schema(conn)
}

pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS country (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            phone_code TEXT NOT NULL
          );
          CREATE TABLE IF NOT EXISTS city (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            country_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY(country_id) REFERENCES country(id)
          );
          CREATE TABLE IF NOT EXISTS user_account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL
          );
          CREATE TABLE IF NOT EXISTS user_info (
            user_id INTEGER PRIMARY KEY,
            name TEXT,
            surname TEXT,
            birthday TEXT,
            avatar_format TEXT,
            city_id INTEGER,
            FOREIGN KEY(user_id) REFERENCES user_account(id) ON DELETE CASCADE,
            FOREIGN KEY(city_id) REFERENCES city(id)
          );
          CREATE TABLE IF NOT EXISTS personal_api_key (
            user_id INTEGER NOT NULL,
            ip TEXT NOT NULL,
            key TEXT NOT NULL UNIQUE,
            expiry_date TEXT NOT NULL,
            PRIMARY KEY(user_id, ip),
            FOREIGN KEY(user_id) REFERENCES user_account(id) ON DELETE CASCADE
          );
          CREATE TABLE IF NOT EXISTS developer_api_key (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key TEXT NOT NULL UNIQUE
          );
          CREATE TABLE IF NOT EXISTS cv (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            format TEXT NOT NULL,
            public INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES user_info(user_id) ON DELETE CASCADE
          );
          CREATE INDEX IF NOT EXISTS idx_cv_user ON cv(user_id);
          CREATE TABLE IF NOT EXISTS opportunity_provider (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
          );
          CREATE TABLE IF NOT EXISTS opportunity (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            link TEXT,
            provider_id INTEGER NOT NULL,
            FOREIGN KEY(provider_id) REFERENCES opportunity_provider(id) ON DELETE CASCADE
          );
          CREATE INDEX IF NOT EXISTS idx_opportunity_provider ON opportunity(provider_id);
          CREATE TABLE IF NOT EXISTS opportunity_tag (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
          );
          CREATE TABLE IF NOT EXISTS opportunity_geo_tag (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            city_id INTEGER NOT NULL UNIQUE,
            FOREIGN KEY(city_id) REFERENCES city(id)
          );
          CREATE TABLE IF NOT EXISTS opportunity_to_tag (
            opportunity_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY(opportunity_id, tag_id),
            FOREIGN KEY(opportunity_id) REFERENCES opportunity(id) ON DELETE CASCADE,
            FOREIGN KEY(tag_id) REFERENCES opportunity_tag(id) ON DELETE CASCADE
          );
          CREATE TABLE IF NOT EXISTS opportunity_to_geo_tag (
            opportunity_id INTEGER NOT NULL,
            geo_tag_id INTEGER NOT NULL,
            PRIMARY KEY(opportunity_id, geo_tag_id),
            FOREIGN KEY(opportunity_id) REFERENCES opportunity(id) ON DELETE CASCADE,
            FOREIGN KEY(geo_tag_id) REFERENCES opportunity_geo_tag(id) ON DELETE CASCADE
          );
          CREATE TABLE IF NOT EXISTS opportunity_card (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            opportunity_id INTEGER NOT NULL UNIQUE,
            title TEXT NOT NULL,
            subtitle TEXT,
            FOREIGN KEY(opportunity_id) REFERENCES opportunity(id) ON DELETE CASCADE
          );
          CREATE TABLE IF NOT EXISTS opportunity_response (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            opportunity_id INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user_account(id) ON DELETE CASCADE,
            FOREIGN KEY(opportunity_id) REFERENCES opportunity(id) ON DELETE CASCADE
          );
          CREATE INDEX IF NOT EXISTS idx_response_user ON opportunity_response(user_id);
          CREATE INDEX IF NOT EXISTS idx_response_opportunity ON opportunity_response(opportunity_id);
          CREATE TABLE IF NOT EXISTS opportunity_form (
            id INTEGER PRIMARY KEY,
            document TEXT NOT NULL
          );
          CREATE TABLE IF NOT EXISTS response_data (
            id INTEGER PRIMARY KEY,
            document TEXT NOT NULL
          );",
    )?;
    Ok(())
}
