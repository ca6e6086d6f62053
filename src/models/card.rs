use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value};

use crate::error::{StoreError, StoreResult};
use crate::input::CardCreate;

use super::opportunity::Opportunity;

/// Catalogue card; an opportunity with a card counts as published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunityCard {
    pub id: i64,
    pub opportunity_id: i64,
    pub title: String,
    pub subtitle: Option<String>,
}

impl OpportunityCard {
    pub fn create(conn: &Connection, opportunity: &Opportunity, fields: &CardCreate) -> StoreResult<Self> {
        conn.execute(
            "INSERT INTO opportunity_card (opportunity_id, title, subtitle) VALUES (?1, ?2, ?3)",
            params![opportunity.id, fields.title, fields.subtitle],
        )?;
        Ok(Self {
            id: conn.last_insert_rowid(),
            opportunity_id: opportunity.id,
            title: fields.title.clone(),
            subtitle: fields.subtitle.clone(),
        })
    }

    pub fn get_for(conn: &Connection, opportunity_id: i64) -> StoreResult<Option<Self>> {
        Ok(conn
            .query_row(
                "SELECT id, opportunity_id, title, subtitle FROM opportunity_card WHERE opportunity_id = ?1",
                params![opportunity_id],
                |row| {
                    Ok(Self {
                        id: row.get(0)?,
                        opportunity_id: row.get(1)?,
                        title: row.get(2)?,
                        subtitle: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn get_dict(&self, conn: &Connection) -> StoreResult<Value> {
        let opportunity = Opportunity::get(conn, self.opportunity_id)?.ok_or(StoreError::NotFound {
            entity: "opportunity",
            id: self.opportunity_id,
        })?;
        let provider = opportunity.provider(conn)?;
        Ok(json!({
          "opportunity_id": opportunity.id,
          "provider_logo_url": provider.logo_url(),
          "provider_name": provider.name,
          "card_title": self.title,
          "card_subtitle": self.subtitle,
          "tags": opportunity.tags(conn)?,
          "geo_tags": opportunity.geo_tags(conn)?,
        }))
    }
}
