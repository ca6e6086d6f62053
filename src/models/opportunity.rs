use std::io::Read;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::form::OpportunityForm;
use crate::input::OpportunityCreate;
use crate::store::documents::{delete_document, Collection};
use crate::store::objects::{object_key, ObjectStore, OPPORTUNITY_DESCRIPTION_BUCKET};

use super::provider::OpportunityProvider;

pub const PAGE_SIZE: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opportunity {
    pub id: i64,
    pub name: String,
    pub link: Option<String>,
    pub provider_id: i64,
}

/// Narrowing applied by [`Opportunity::filter`]. Empty id lists do not filter.
#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
    pub provider_ids: Vec<i64>,
    /// An opportunity must carry every one of these tags.
    pub tag_ids: Vec<i64>,
    /// An opportunity must carry at least one of these geotags.
    pub geo_tag_ids: Vec<i64>,
    /// Only opportunities this user has responded to.
    pub responded_by: Option<i64>,
    /// Only opportunities that have a card.
    pub published_only: bool,
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl OpportunityFilter {
    fn where_clause(&self) -> (String, Vec<SqlValue>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        let providers = dedup(&self.provider_ids);
        if !providers.is_empty() {
            conditions.push(format!("o.provider_id IN ({})", placeholders(providers.len())));
            values.extend(providers.into_iter().map(SqlValue::Integer));
        }

        let tags = dedup(&self.tag_ids);
        if !tags.is_empty() {
            conditions.push(format!(
                "o.id IN (SELECT opportunity_id FROM opportunity_to_tag WHERE tag_id IN ({}) \
                GROUP BY opportunity_id HAVING COUNT(tag_id) = ?)",
                placeholders(tags.len())
            ));
            let required = tags.len() as i64;
            values.extend(tags.into_iter().map(SqlValue::Integer));
            values.push(SqlValue::Integer(required));
        }

        let geo_tags = dedup(&self.geo_tag_ids);
        if !geo_tags.is_empty() {
            conditions.push(format!(
                "o.id IN (SELECT opportunity_id FROM opportunity_to_geo_tag WHERE geo_tag_id IN ({}))",
                placeholders(geo_tags.len())
            ));
            values.extend(geo_tags.into_iter().map(SqlValue::Integer));
        }

        if let Some(user_id) = self.responded_by {
            conditions.push("o.id IN (SELECT opportunity_id FROM opportunity_response WHERE user_id = ?)".to_string());
            values.push(SqlValue::Integer(user_id));
        }

        if self.published_only {
            conditions.push("EXISTS (SELECT 1 FROM opportunity_card c WHERE c.opportunity_id = o.id)".to_string());
        }

        if conditions.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), values)
        }
    }
}

impl Opportunity {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            link: row.get(2)?,
            provider_id: row.get(3)?,
        })
    }

    pub fn create(conn: &Connection, fields: &OpportunityCreate) -> StoreResult<Self> {
        conn.execute(
            "INSERT INTO opportunity (name, link, provider_id) VALUES (?1, ?2, ?3)",
            params![fields.name, fields.link, fields.provider_id],
        )?;
        Ok(Self {
            id: conn.last_insert_rowid(),
            name: fields.name.clone(),
            link: fields.link.clone(),
            provider_id: fields.provider_id,
        })
    }

    pub fn get(conn: &Connection, id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, name, link, provider_id FROM opportunity WHERE id = ?1",
                params![id],
                Self::from_row,
            )
            .optional()?)
    }

    /// Removes the opportunity with its form, card, links and responses.
    pub fn delete(self, conn: &Connection) -> StoreResult<()> {
        let mut stmt = conn.prepare("SELECT id FROM opportunity_response WHERE opportunity_id = ?1")?;
        let response_ids = stmt
            .query_map(params![self.id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        for response_id in response_ids {
            delete_document(conn, Collection::ResponseData, response_id)?;
        }
        OpportunityForm::delete(conn, self.id)?;
        conn.execute("DELETE FROM opportunity WHERE id = ?1", params![self.id])?;
        debug!(opportunity_id = self.id, "opportunity deleted");
        Ok(())
    }

    pub fn provider(&self, conn: &Connection) -> StoreResult<OpportunityProvider> {
        OpportunityProvider::get(conn, self.provider_id)?.ok_or(StoreError::NotFound {
            entity: "opportunity provider",
            id: self.provider_id,
        })
    }

    pub fn get_form(&self, conn: &Connection) -> StoreResult<Option<OpportunityForm>> {
        OpportunityForm::get(conn, self.id)
    }

    pub fn add_tags(&self, conn: &Connection, tag_ids: &[i64]) -> StoreResult<()> {
        for tag_id in tag_ids {
            conn.execute(
                "INSERT OR IGNORE INTO opportunity_to_tag (opportunity_id, tag_id) VALUES (?1, ?2)",
                params![self.id, tag_id],
            )?;
        }
        Ok(())
    }

    pub fn add_geo_tags(&self, conn: &Connection, geo_tag_ids: &[i64]) -> StoreResult<()> {
        for geo_tag_id in geo_tag_ids {
            conn.execute(
                "INSERT OR IGNORE INTO opportunity_to_geo_tag (opportunity_id, geo_tag_id) VALUES (?1, ?2)",
                params![self.id, geo_tag_id],
            )?;
        }
        Ok(())
    }

    /// `(id, name)` pairs of the attached tags.
    pub fn tags(&self, conn: &Connection) -> StoreResult<Vec<(i64, String)>> {
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name FROM opportunity_tag t \
            JOIN opportunity_to_tag ot ON ot.tag_id = t.id \
            WHERE ot.opportunity_id = ?1 ORDER BY t.id",
        )?;
        let rows = stmt.query_map(params![self.id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<(i64, String)>>>()?)
    }

    /// `(id, city name)` pairs of the attached geotags.
    pub fn geo_tags(&self, conn: &Connection) -> StoreResult<Vec<(i64, String)>> {
        let mut stmt = conn.prepare(
            "SELECT g.id, c.name FROM opportunity_geo_tag g \
            JOIN city c ON c.id = g.city_id \
            JOIN opportunity_to_geo_tag og ON og.geo_tag_id = g.id \
            WHERE og.opportunity_id = ?1 ORDER BY g.id",
        )?;
        let rows = stmt.query_map(params![self.id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<(i64, String)>>>()?)
    }

    pub fn update_description(&self, objects: &dyn ObjectStore, data: &mut dyn Read) -> StoreResult<u64> {
        objects.put(OPPORTUNITY_DESCRIPTION_BUCKET, &object_key(self.id, "md"), data)
    }

    pub fn get_description(&self, objects: &dyn ObjectStore) -> StoreResult<Vec<u8>> {
        objects.get_or_default(OPPORTUNITY_DESCRIPTION_BUCKET, &object_key(self.id, "md"), "default.md")
    }

    pub fn get_dict(&self, conn: &Connection) -> StoreResult<Value> {
        let provider = self.provider(conn)?;
        Ok(json!({
          "name": self.name,
          "link": self.link,
          "provider_id": provider.id,
          "provider_logo_url": provider.logo_url(),
          "provider_name": provider.name,
          "tags": self.tags(conn)?,
          "geo_tags": self.geo_tags(conn)?,
        }))
    }

    /// One page (1-based, [`PAGE_SIZE`] rows) of matching opportunities, ordered by id.
    pub fn filter(conn: &Connection, filter: &OpportunityFilter, page: u32) -> StoreResult<Vec<Self>> {
        let (where_clause, mut values) = filter.where_clause();
        let offset = i64::from(page.max(1) - 1) * i64::from(PAGE_SIZE);
        values.push(SqlValue::Integer(i64::from(PAGE_SIZE)));
        values.push(SqlValue::Integer(offset));
        let mut stmt = conn.prepare(&format!(
            "SELECT o.id, o.name, o.link, o.provider_id FROM opportunity o{where_clause} \
            ORDER BY o.id LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), Self::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<Self>>>()?)
    }

    pub fn count(conn: &Connection, filter: &OpportunityFilter) -> StoreResult<u64> {
        let (where_clause, values) = filter.where_clause();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM opportunity o{where_clause}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn page_count(conn: &Connection, filter: &OpportunityFilter) -> StoreResult<u64> {
        Ok(Self::count(conn, filter)?.div_ceil(u64::from(PAGE_SIZE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::TypedSpec;
    use crate::input::{CardCreate, Credentials};
    use crate::models::{City, Country, OpportunityCard, OpportunityGeoTag, OpportunityResponse, OpportunityTag, User};
    use crate::store::{open_in_memory, FsObjectStore};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn opportunity(conn: &Connection, provider: &OpportunityProvider, name: &str) -> Opportunity {
        Opportunity::create(
            conn,
            &OpportunityCreate {
                name: name.to_string(),
                link: None,
                provider_id: provider.id,
            },
        )
        .expect("opportunity")
    }

    fn names(rows: Vec<Opportunity>) -> Vec<String> {
        rows.into_iter().map(|o| o.name).collect()
    }

    #[test]
    fn tags_filter_requires_all_of_them() {
        let conn = open_in_memory().expect("db");
        let acme = OpportunityProvider::create(&conn, "Acme").expect("provider");
        let rust = OpportunityTag::create(&conn, "rust").expect("db").expect("tag");
        let remote = OpportunityTag::create(&conn, "remote").expect("db").expect("tag");

        let both = opportunity(&conn, &acme, "both");
        both.add_tags(&conn, &[rust.id, remote.id]).expect("tags");
        let only_rust = opportunity(&conn, &acme, "only-rust");
        only_rust.add_tags(&conn, &[rust.id]).expect("tags");
        opportunity(&conn, &acme, "none");

        let filter = OpportunityFilter {
            tag_ids: vec![rust.id, remote.id, rust.id],
            ..Default::default()
        };
        assert_eq!(names(Opportunity::filter(&conn, &filter, 1).expect("filter")), vec!["both"]);

        let filter = OpportunityFilter {
            tag_ids: vec![rust.id],
            ..Default::default()
        };
        assert_eq!(
            names(Opportunity::filter(&conn, &filter, 1).expect("filter")),
            vec!["both", "only-rust"]
        );
    }

    #[test]
    fn geo_tags_filter_accepts_any_of_them() {
        let conn = open_in_memory().expect("db");
        let acme = OpportunityProvider::create(&conn, "Acme").expect("provider");
        let country = Country::create(&conn, "Russia", "7").expect("db").expect("country");
        let kazan = City::create(&conn, &country, "Kazan").expect("city");
        let perm = City::create(&conn, &country, "Perm").expect("city");
        let kazan_tag = OpportunityGeoTag::create(&conn, &kazan).expect("db").expect("geo");
        let perm_tag = OpportunityGeoTag::create(&conn, &perm).expect("db").expect("geo");

        opportunity(&conn, &acme, "kazan").add_geo_tags(&conn, &[kazan_tag.id]).expect("geo");
        opportunity(&conn, &acme, "perm").add_geo_tags(&conn, &[perm_tag.id]).expect("geo");
        opportunity(&conn, &acme, "both")
            .add_geo_tags(&conn, &[kazan_tag.id, perm_tag.id])
            .expect("geo");
        opportunity(&conn, &acme, "nowhere");

        let filter = OpportunityFilter {
            geo_tag_ids: vec![kazan_tag.id, perm_tag.id],
            ..Default::default()
        };
        assert_eq!(
            names(Opportunity::filter(&conn, &filter, 1).expect("filter")),
            vec!["kazan", "perm", "both"]
        );
    }

    #[test]
    fn filters_by_provider_and_publication() {
        let conn = open_in_memory().expect("db");
        let acme = OpportunityProvider::create(&conn, "Acme").expect("provider");
        let globex = OpportunityProvider::create(&conn, "Globex").expect("provider");
        let published = opportunity(&conn, &acme, "acme-published");
        opportunity(&conn, &acme, "acme-draft");
        opportunity(&conn, &globex, "globex");
        OpportunityCard::create(
            &conn,
            &published,
            &CardCreate {
                title: "Intern".to_string(),
                subtitle: None,
            },
        )
        .expect("card");

        let by_provider = OpportunityFilter {
            provider_ids: vec![acme.id],
            ..Default::default()
        };
        assert_eq!(
            names(Opportunity::filter(&conn, &by_provider, 1).expect("filter")),
            vec!["acme-published", "acme-draft"]
        );
        let public = OpportunityFilter {
            published_only: true,
            ..Default::default()
        };
        assert_eq!(
            names(Opportunity::filter(&conn, &public, 1).expect("filter")),
            vec!["acme-published"]
        );
    }

    #[test]
    fn filters_by_responder() {
        let conn = open_in_memory().expect("db");
        let acme = OpportunityProvider::create(&conn, "Acme").expect("provider");
        let applied = opportunity(&conn, &acme, "applied");
        opportunity(&conn, &acme, "ignored");
        let user = User::create(
            &conn,
            &Credentials {
                email: "ann@mail.ru".to_string(),
                password: "password123".to_string(),
            },
        )
        .expect("db")
        .expect("user");
        let form = OpportunityForm::create(&conn, applied.id, &BTreeMap::new(), None).expect("form");
        OpportunityResponse::create(&conn, &user, &applied, &form, &serde_json::Map::new())
            .expect("db")
            .expect("response");

        let filter = OpportunityFilter {
            responded_by: Some(user.id),
            ..Default::default()
        };
        assert_eq!(names(Opportunity::filter(&conn, &filter, 1).expect("filter")), vec!["applied"]);
    }

    #[test]
    fn pages_hold_twelve_rows() {
        let conn = open_in_memory().expect("db");
        let acme = OpportunityProvider::create(&conn, "Acme").expect("provider");
        for i in 0..25 {
            opportunity(&conn, &acme, &format!("o{i:02}"));
        }
        let filter = OpportunityFilter::default();
        assert_eq!(Opportunity::count(&conn, &filter).expect("count"), 25);
        assert_eq!(Opportunity::page_count(&conn, &filter).expect("pages"), 3);
        assert_eq!(Opportunity::filter(&conn, &filter, 1).expect("page").len(), 12);
        assert_eq!(Opportunity::filter(&conn, &filter, 2).expect("page")[0].name, "o12");
        assert_eq!(Opportunity::filter(&conn, &filter, 3).expect("page").len(), 1);
        assert!(Opportunity::filter(&conn, &filter, 4).expect("page").is_empty());
        // page 0 is read as the first page
        assert_eq!(Opportunity::filter(&conn, &filter, 0).expect("page")[0].name, "o00");
    }

    #[test]
    fn empty_result_has_no_pages() {
        let conn = open_in_memory().expect("db");
        assert_eq!(Opportunity::page_count(&conn, &OpportunityFilter::default()).expect("pages"), 0);
    }

    #[test]
    fn dict_lists_provider_and_tags() {
        let conn = open_in_memory().expect("db");
        let acme = OpportunityProvider::create(&conn, "Acme").expect("provider");
        let rust = OpportunityTag::create(&conn, "rust").expect("db").expect("tag");
        let item = opportunity(&conn, &acme, "Backend intern");
        item.add_tags(&conn, &[rust.id, rust.id]).expect("tags");
        assert_eq!(
            item.get_dict(&conn).expect("dict"),
            json!({
              "name": "Backend intern",
              "link": null,
              "provider_id": acme.id,
              "provider_logo_url": acme.logo_url(),
              "provider_name": "Acme",
              "tags": [[rust.id, "rust"]],
              "geo_tags": [],
            })
        );
    }

    #[test]
    fn delete_cascades_to_form_and_responses() {
        let conn = open_in_memory().expect("db");
        let acme = OpportunityProvider::create(&conn, "Acme").expect("provider");
        let item = opportunity(&conn, &acme, "doomed");
        let fields = BTreeMap::from([(
            "why".to_string(),
            TypedSpec::new("string", json!({ "label": "Why", "is_required": true })),
        )]);
        let form = OpportunityForm::create(&conn, item.id, &fields, None).expect("form");
        let user = User::create(
            &conn,
            &Credentials {
                email: "ann@mail.ru".to_string(),
                password: "password123".to_string(),
            },
        )
        .expect("db")
        .expect("user");
        let payload = json!({ "why": "because" }).as_object().cloned().expect("object");
        let response = OpportunityResponse::create(&conn, &user, &item, &form, &payload)
            .expect("db")
            .expect("response");

        let id = item.id;
        item.delete(&conn).expect("delete");
        assert!(Opportunity::get(&conn, id).expect("db").is_none());
        assert!(OpportunityForm::get(&conn, id).expect("db").is_none());
        assert!(OpportunityResponse::get(&conn, response.id).expect("db").is_none());
        assert!(crate::form::ResponseData::get(&conn, response.id).expect("db").is_none());
    }

    #[test]
    fn description_falls_back_to_default() {
        let conn = open_in_memory().expect("db");
        let dir = tempfile::tempdir().expect("tmp");
        let objects = FsObjectStore::new(dir.path());
        objects
            .put(OPPORTUNITY_DESCRIPTION_BUCKET, "default.md", &mut &b"soon"[..])
            .expect("default");
        let acme = OpportunityProvider::create(&conn, "Acme").expect("provider");
        let item = opportunity(&conn, &acme, "Backend intern");
        assert_eq!(item.get_description(&objects).expect("read"), b"soon");
        item.update_description(&objects, &mut &b"# Backend"[..]).expect("write");
        assert_eq!(item.get_description(&objects).expect("read"), b"# Backend");
    }
}
