use super::Persistence;
use crate::core::{DbError, FieldMap, Result, Value};
use crate::schema::{ModelSchema, RELATIONSHIP_IDENTIFIER_SUFFIX, RelationshipProjection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A domain record addressed by its storage key and, once replay has
/// touched it, by its external activity identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub table_name: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub activity_identifier: Option<Uuid>,
    #[serde(default)]
    pub fields: FieldMap,
}

impl Entity {
    pub fn new(table_name: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            table_name: table_name.into(),
            id: None,
            activity_identifier: None,
            fields,
        }
    }

    pub fn with_activity_identifier(mut self, activity_identifier: Uuid) -> Self {
        self.activity_identifier = Some(activity_identifier);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Applies a partial update validated against `model`.
    ///
    /// The primary key is never taken from `fields`.
    pub fn modify(&mut self, model: &ModelSchema, fields: FieldMap) -> Result<()> {
        for (name, value) in fields {
            if name == model.primary_key() {
                continue;
            }
            let column = model
                .get_column(&name)
                .ok_or_else(|| DbError::ColumnNotFound(name.clone(), model.table_name().to_string()))?;
            column.validate(&value)?;
            self.fields.insert(name, value);
        }
        Ok(())
    }

    /// Row as recorded in the activity log: fields plus the storage key.
    pub fn row(&self, primary_key: &str) -> FieldMap {
        let mut row = self.fields.clone();
        if let Some(id) = self.id {
            row.insert(primary_key, id);
        }
        row
    }

    /// External identifier of the entity behind `relationship`, if any.
    pub fn relationship_activity_identifier<P>(
        &self,
        store: &P,
        relationship: &str,
    ) -> Result<Option<Uuid>>
    where
        P: Persistence + ?Sized,
    {
        let model = store
            .schema(&self.table_name)
            .ok_or_else(|| DbError::TableNotFound(self.table_name.clone()))?;
        let projection = model.projection_for_relationship(relationship).ok_or_else(|| {
            DbError::ColumnNotFound(
                format!("{}{}", relationship, RELATIONSHIP_IDENTIFIER_SUFFIX),
                self.table_name.clone(),
            )
        })?;
        self.project(store, &model, projection)
    }

    /// Every `<relationship>ActivityIdentifier` accessor of this entity's schema.
    pub fn relationship_activity_identifiers<P>(
        &self,
        store: &P,
    ) -> Result<BTreeMap<String, Option<Uuid>>>
    where
        P: Persistence + ?Sized,
    {
        let model = store
            .schema(&self.table_name)
            .ok_or_else(|| DbError::TableNotFound(self.table_name.clone()))?;
        let mut identifiers = BTreeMap::new();
        for projection in model.projections() {
            let identifier = self.project(store, &model, projection)?;
            identifiers.insert(projection.accessor.clone(), identifier);
        }
        Ok(identifiers)
    }

    fn project<P>(
        &self,
        store: &P,
        model: &ModelSchema,
        projection: &RelationshipProjection,
    ) -> Result<Option<Uuid>>
    where
        P: Persistence + ?Sized,
    {
        let Some(relationship) = model.get_relationship(&projection.relationship) else {
            return Ok(None);
        };
        let Some(key) = self.get(&relationship.foreign_key).and_then(Value::as_i64) else {
            return Ok(None);
        };
        let related = store.get_entity(&relationship.target_table, key)?;
        Ok(related.and_then(|entity| entity.activity_identifier))
    }
}
