use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::StoreResult;
use crate::store::documents::{delete_document, get_document, put_document, Collection};

use super::field::FieldDefinition;
use super::registry::{create_field, create_submit_method, FieldSpec, SubmitMethodSpec};
use super::submit::SubmitMethod;
use super::types::FormError;

/// Application form of one opportunity; shares the opportunity's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityForm {
    pub id: i64,
    #[serde(default)]
    pub submit_method: SubmitMethod,
    pub fields: BTreeMap<String, FieldDefinition>,
}

pub fn create_fields(fields: &BTreeMap<String, FieldSpec>) -> Result<BTreeMap<String, FieldDefinition>, FormError> {
    fields
        .iter()
        .map(|(name, spec)| create_field(spec).map(|field| (name.clone(), field)))
        .collect()
}

impl OpportunityForm {
    /// Builds a form without storing it. Nothing is returned unless every
    /// definition is valid.
    pub fn build(
        opportunity_id: i64,
        fields: &BTreeMap<String, FieldSpec>,
        submit_method: Option<&SubmitMethodSpec>,
    ) -> Result<Self, FormError> {
        let fields = create_fields(fields)?;
        let submit_method = match submit_method {
            Some(spec) => create_submit_method(spec)?,
            None => SubmitMethod::Noop,
        };
        Ok(Self {
            id: opportunity_id,
            submit_method,
            fields,
        })
    }

    pub fn create(
        conn: &Connection,
        opportunity_id: i64,
        fields: &BTreeMap<String, FieldSpec>,
        submit_method: Option<&SubmitMethodSpec>,
    ) -> StoreResult<Self> {
        let form = Self::build(opportunity_id, fields, submit_method)?;
        form.save(conn)?;
        debug!(opportunity_id, fields = form.fields.len(), "form created");
        Ok(form)
    }

    pub fn get(conn: &Connection, opportunity_id: i64) -> StoreResult<Option<Self>> {
        get_document(conn, Collection::OpportunityForm, opportunity_id)
    }

    pub fn delete(conn: &Connection, opportunity_id: i64) -> StoreResult<bool> {
        delete_document(conn, Collection::OpportunityForm, opportunity_id)
    }

    pub fn update_submit_method(&mut self, conn: &Connection, submit_method: &SubmitMethodSpec) -> StoreResult<()> {
        self.submit_method = create_submit_method(submit_method)?;
        self.save(conn)
    }

    pub fn update_fields(&mut self, conn: &Connection, fields: &BTreeMap<String, FieldSpec>) -> StoreResult<()> {
        self.fields = create_fields(fields)?;
        self.save(conn)
    }

    fn save(&self, conn: &Connection) -> StoreResult<()> {
        put_document(conn, Collection::OpportunityForm, self.id, self)
    }

    pub fn get_dict(&self) -> Value {
        let fields = self
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.to_dict()))
            .collect::<Map<String, Value>>();
        json!({
          "submit_method": self.submit_method.to_dict(),
          "fields": fields,
        })
    }
}
