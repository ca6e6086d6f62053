use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::util::hash::sha256_hex;

const KEY_LEN: usize = 64;

fn key_exists(conn: &Connection, table: &str, key: &str) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE key = ?1"),
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Draws digests of `seed` plus a fresh nonce until one is unused in `table`.
fn unique_key(conn: &Connection, table: &str, seed: &str) -> StoreResult<String> {
    loop {
        let digest = sha256_hex(format!("{seed}/{}/{}", Utc::now(), Uuid::new_v4()).as_bytes());
        let key = digest[..KEY_LEN].to_string();
        if !key_exists(conn, table, &key)? {
            return Ok(key);
        }
    }
}

/// Session key bound to one user and client address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalApiKey {
    pub user_id: i64,
    pub ip: Ipv4Addr,
    pub key: String,
    pub expiry_date: DateTime<Utc>,
}

impl PersonalApiKey {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let ip: String = row.get(1)?;
        let ip = ip
            .parse::<Ipv4Addr>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
        Ok(Self {
            user_id: row.get(0)?,
            ip,
            key: row.get(2)?,
            expiry_date: row.get(3)?,
        })
    }

    /// Issues a key for `(user_id, ip)`, expiring any key already issued for that pair.
    pub fn generate(conn: &Connection, user_id: i64, ip: Ipv4Addr, expiry_date: DateTime<Utc>) -> StoreResult<Self> {
        let replaced = conn.execute(
            "DELETE FROM personal_api_key WHERE user_id = ?1 AND ip = ?2",
            params![user_id, ip.to_string()],
        )?;
        if replaced > 0 {
            debug!(user_id, %ip, "previous personal key expired");
        }
        let key = unique_key(conn, "personal_api_key", &format!("{user_id}/{ip}"))?;
        conn.execute(
            "INSERT INTO personal_api_key (user_id, ip, key, expiry_date) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, ip.to_string(), key, expiry_date],
        )?;
        Ok(Self {
            user_id,
            ip,
            key,
            expiry_date,
        })
    }

    /// Looks a key up; an expired key is deleted and reported as absent.
    pub fn get(conn: &Connection, key: &str) -> StoreResult<Option<Self>> {
        let found = conn
            .query_row(
                "SELECT user_id, ip, key, expiry_date FROM personal_api_key WHERE key = ?1",
                params![key],
                Self::from_row,
            )
            .optional()?;
        match found {
            Some(api_key) if api_key.expiry_date <= Utc::now() => {
                api_key.expire(conn)?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    pub fn expire(&self, conn: &Connection) -> StoreResult<()> {
        conn.execute("DELETE FROM personal_api_key WHERE key = ?1", params![self.key])?;
        Ok(())
    }
}

impl fmt::Display for PersonalApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "personal-{}", self.key)
    }
}

/// Long-lived key for integrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeveloperApiKey {
    pub id: i64,
    pub key: String,
}

impl DeveloperApiKey {
    pub fn generate(conn: &Connection) -> StoreResult<Self> {
        let key = unique_key(conn, "developer_api_key", "developer")?;
        conn.execute("INSERT INTO developer_api_key (key) VALUES (?1)", params![key])?;
        Ok(Self {
            id: conn.last_insert_rowid(),
            key,
        })
    }

    pub fn get(conn: &Connection, key: &str) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, key FROM developer_api_key WHERE key = ?1",
                params![key],
                |row| {
                    Ok(Self {
                        id: row.get(0)?,
                        key: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }
}

impl fmt::Display for DeveloperApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev-{}", self.key)
    }
}

/// Either kind of key, resolved from its `"<kind>-<hex>"` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKey {
    Personal(PersonalApiKey),
    Developer(DeveloperApiKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyKind {
    Personal,
    Developer,
}

impl ApiKey {
    pub fn parse(raw: &str) -> Option<(ApiKeyKind, &str)> {
        let (kind, key) = raw.split_once('-')?;
        let kind = match kind {
            "personal" => ApiKeyKind::Personal,
            "dev" => ApiKeyKind::Developer,
            _ => return None,
        };
        Some((kind, key))
    }

    pub fn get(conn: &Connection, raw: &str) -> StoreResult<Option<Self>> {
        let Some((kind, key)) = Self::parse(raw) else {
            debug!("'ApiKey::get' received a key of unknown kind");
            return Ok(None);
        };
        Ok(match kind {
            ApiKeyKind::Personal => PersonalApiKey::get(conn, key)?.map(Self::Personal),
            ApiKeyKind::Developer => DeveloperApiKey::get(conn, key)?.map(Self::Developer),
        })
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Self::Personal(key) => Some(key.user_id),
            Self::Developer(_) => None,
        }
    }
}
