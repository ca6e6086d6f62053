use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{GenericError, StoreError, StoreResult};
use crate::input::{Credentials, InputError, UserInfoUpdate};
use crate::store::objects::{object_key, ObjectStore, USER_AVATAR_BUCKET};
use crate::util::hash::sha256_hex;

use super::{format_from_sql, format_to_sql, FileFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CreateUserErrorCode {
    NonUniqueEmail = 0,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
}

impl User {
    pub fn hash_password(password: &str) -> String {
        sha256_hex(password.as_bytes())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
        })
    }

    fn find_by_email(conn: &Connection, email: &str) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, email, password_hash FROM user_account WHERE email = ?1",
                params![email],
                Self::from_row,
            )
            .optional()?)
    }

    /// Registers a user together with an empty profile.
    pub fn create(
        conn: &Connection,
        credentials: &Credentials,
    ) -> StoreResult<Result<Self, GenericError<CreateUserErrorCode>>> {
        if Self::find_by_email(conn, &credentials.email)?.is_some() {
            debug!(email = %credentials.email, "'User::create' exited with 'NON_UNIQUE_EMAIL' error");
            return Ok(Err(GenericError::new(
                CreateUserErrorCode::NonUniqueEmail,
                "User with given email already exists",
            )));
        }
        let password_hash = Self::hash_password(&credentials.password);
        conn.execute(
            "INSERT INTO user_account (email, password_hash) VALUES (?1, ?2)",
            params![credentials.email, password_hash],
        )?;
        let id = conn.last_insert_rowid();
        conn.execute("INSERT INTO user_info (user_id) VALUES (?1)", params![id])?;
        Ok(Ok(Self {
            id,
            email: credentials.email.clone(),
            password_hash,
        }))
    }

    pub fn get(conn: &Connection, id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, email, password_hash FROM user_account WHERE id = ?1",
                params![id],
                Self::from_row,
            )
            .optional()?)
    }

    /// Returns the user when the credentials match. Callers follow a
    /// successful login with [`PersonalApiKey::generate`](super::PersonalApiKey::generate).
    pub fn login(conn: &Connection, credentials: &Credentials) -> StoreResult<Option<Self>> {
        let Some(user) = Self::find_by_email(conn, &credentials.email)? else {
            debug!(email = %credentials.email, "'User::login' exited because user with given email doesn't exist");
            return Ok(None);
        };
        if user.password_hash != Self::hash_password(&credentials.password) {
            debug!(email = %credentials.email, "'User::login' exited because of a password mismatch");
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub fn info(&self, conn: &Connection) -> StoreResult<UserInfo> {
        UserInfo::get(conn, self.id)?.ok_or(StoreError::NotFound {
            entity: "user info",
            id: self.id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarFormat {
    Png,
}

impl FileFormat for AvatarFormat {
    const ALL: &'static [Self] = &[Self::Png];

    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
        }
    }
}

impl ToSql for AvatarFormat {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(format_to_sql(*self))
    }
}

impl FromSql for AvatarFormat {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        format_from_sql(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub user_id: i64,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub avatar_format: Option<AvatarFormat>,
    pub city_id: Option<i64>,
}

impl UserInfo {
    pub fn get(conn: &Connection, user_id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT user_id, name, surname, birthday, avatar_format, city_id \
                FROM user_info WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(Self {
                        user_id: row.get(0)?,
                        name: row.get(1)?,
                        surname: row.get(2)?,
                        birthday: row.get(3)?,
                        avatar_format: row.get(4)?,
                        city_id: row.get(5)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn fullname(&self) -> String {
        format!(
            "{} {}",
            self.name.as_deref().unwrap_or_default(),
            self.surname.as_deref().unwrap_or_default()
        )
    }

    pub fn avatar_url(&self) -> String {
        format!("/api/user/avatar?user_id={}", self.user_id)
    }

    /// Applies the fields present in `update`; absent ones are left untouched.
    ///
    /// A rejected update changes neither the row nor `self`.
    pub fn update(&mut self, conn: &Connection, update: &UserInfoUpdate) -> StoreResult<Result<(), InputError>> {
        let birthday = match update.validate().and_then(|()| update.birthday.map(|date| date.validate()).transpose()) {
            Ok(birthday) => birthday,
            Err(err) => {
                debug!(user_id = self.user_id, error = %err, "'UserInfo::update' rejected input");
                return Ok(Err(err));
            }
        };
        let mut updated = self.clone();
        if let Some(name) = &update.name {
            updated.name = Some(name.clone());
        }
        if let Some(surname) = &update.surname {
            updated.surname = Some(surname.clone());
        }
        if birthday.is_some() {
            updated.birthday = birthday;
        }
        if let Some(city_id) = update.city_id {
            updated.city_id = Some(city_id);
        }
        conn.execute(
            "UPDATE user_info SET name = ?1, surname = ?2, birthday = ?3, city_id = ?4 WHERE user_id = ?5",
            params![updated.name, updated.surname, updated.birthday, updated.city_id, updated.user_id],
        )?;
        *self = updated;
        Ok(Ok(()))
    }

    pub fn update_avatar(
        &mut self,
        conn: &Connection,
        objects: &dyn ObjectStore,
        format: AvatarFormat,
        data: &mut dyn Read,
    ) -> StoreResult<()> {
        objects.put(USER_AVATAR_BUCKET, &object_key(self.user_id, format.extension()), data)?;
        conn.execute(
            "UPDATE user_info SET avatar_format = ?1 WHERE user_id = ?2",
            params![format, self.user_id],
        )?;
        self.avatar_format = Some(format);
        Ok(())
    }

    pub fn get_avatar(&self, objects: &dyn ObjectStore) -> StoreResult<Vec<u8>> {
        let key = match self.avatar_format {
            Some(format) => object_key(self.user_id, format.extension()),
            None => "default.png".to_string(),
        };
        objects.get(USER_AVATAR_BUCKET, &key)
    }

    pub fn get_cvs(&self, conn: &Connection) -> StoreResult<BTreeMap<String, String>> {
        Ok(super::Cv::list_for_user(conn, self.user_id)?
            .into_iter()
            .map(|cv| (cv.id.to_string(), cv.name))
            .collect())
    }

    pub fn get_dict(&self) -> Value {
        json!({
          "name": self.name,
          "surname": self.surname,
          "birthday": self.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
          "city_id": self.city_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Date;
    use crate::store::{open_in_memory, FsObjectStore};

    fn credentials(email: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: "password123".to_string(),
        }
    }

    #[test]
    fn create_rejects_duplicate_email() {
        let conn = open_in_memory().expect("db");
        let user = User::create(&conn, &credentials("ann@mail.ru"))
            .expect("db")
            .expect("created");
        assert_eq!(user.password_hash, User::hash_password("password123"));
        let err = User::create(&conn, &credentials("ann@mail.ru"))
            .expect("db")
            .expect_err("duplicate");
        assert_eq!(err.error_code, CreateUserErrorCode::NonUniqueEmail);
    }

    #[test]
    fn create_adds_empty_profile() {
        let conn = open_in_memory().expect("db");
        let user = User::create(&conn, &credentials("ann@mail.ru"))
            .expect("db")
            .expect("created");
        let info = user.info(&conn).expect("info");
        assert_eq!(info.name, None);
        assert_eq!(info.avatar_url(), format!("/api/user/avatar?user_id={}", user.id));
    }

    #[test]
    fn login_checks_password() {
        let conn = open_in_memory().expect("db");
        User::create(&conn, &credentials("ann@mail.ru"))
            .expect("db")
            .expect("created");
        assert!(User::login(&conn, &credentials("ann@mail.ru")).expect("db").is_some());
        let wrong = Credentials {
            email: "ann@mail.ru".to_string(),
            password: "password124".to_string(),
        };
        assert!(User::login(&conn, &wrong).expect("db").is_none());
        assert!(User::login(&conn, &credentials("bob@mail.ru")).expect("db").is_none());
    }

    #[test]
    fn update_touches_only_supplied_fields() {
        let conn = open_in_memory().expect("db");
        let user = User::create(&conn, &credentials("ann@mail.ru"))
            .expect("db")
            .expect("created");
        let mut info = user.info(&conn).expect("info");
        info.update(
            &conn,
            &UserInfoUpdate {
                name: Some("Ann".to_string()),
                birthday: Some(Date { day: 3, month: 4, year: 2001 }),
                ..Default::default()
            },
        )
        .expect("db")
        .expect("valid");
        info.update(
            &conn,
            &UserInfoUpdate {
                surname: Some("Lee".to_string()),
                ..Default::default()
            },
        )
        .expect("db")
        .expect("valid");

        let stored = user.info(&conn).expect("info");
        assert_eq!(stored.fullname(), "Ann Lee");
        assert_eq!(stored.get_dict()["birthday"], "2001-04-03");
    }

    #[test]
    fn invalid_birthday_rejects_whole_update() {
        let conn = open_in_memory().expect("db");
        let user = User::create(&conn, &credentials("ann@mail.ru"))
            .expect("db")
            .expect("created");
        let mut info = user.info(&conn).expect("info");
        let err = info
            .update(
                &conn,
                &UserInfoUpdate {
                    name: Some("Ann".to_string()),
                    birthday: Some(Date { day: 31, month: 2, year: 2020 }),
                    ..Default::default()
                },
            )
            .expect("db")
            .expect_err("invalid date");
        assert!(matches!(err, InputError::Invalid { field: "date", .. }));
        assert_eq!(info.name, None);
        let stored = user.info(&conn).expect("info");
        assert_eq!(stored.name, None);
        assert_eq!(stored.birthday, None);
    }

    #[test]
    fn too_long_surname_rejects_whole_update() {
        let conn = open_in_memory().expect("db");
        let user = User::create(&conn, &credentials("ann@mail.ru"))
            .expect("db")
            .expect("created");
        let mut info = user.info(&conn).expect("info");
        let err = info
            .update(
                &conn,
                &UserInfoUpdate {
                    name: Some("Ann".to_string()),
                    surname: Some("x".repeat(51)),
                    ..Default::default()
                },
            )
            .expect("db")
            .expect_err("too long");
        assert!(matches!(err, InputError::TooLong { field: "surname", .. }));
        assert_eq!(user.info(&conn).expect("info").name, None);
    }

    #[test]
    fn avatar_falls_back_to_default() {
        let conn = open_in_memory().expect("db");
        let dir = tempfile::tempdir().expect("tmp");
        let objects = FsObjectStore::new(dir.path());
        objects
            .put(USER_AVATAR_BUCKET, "default.png", &mut &b"default"[..])
            .expect("default");
        let user = User::create(&conn, &credentials("ann@mail.ru"))
            .expect("db")
            .expect("created");
        let mut info = user.info(&conn).expect("info");
        assert_eq!(info.get_avatar(&objects).expect("avatar"), b"default");

        info.update_avatar(&conn, &objects, AvatarFormat::Png, &mut &b"mine"[..])
            .expect("upload");
        let stored = user.info(&conn).expect("info");
        assert_eq!(stored.avatar_format, Some(AvatarFormat::Png));
        assert_eq!(stored.get_avatar(&objects).expect("avatar"), b"mine");
    }
}
