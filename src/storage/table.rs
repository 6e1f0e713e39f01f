use super::Entity;
use crate::core::{DbError, Result};
use crate::schema::{ACTIVITY_IDENTIFIER_FIELD, ModelSchema};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Rows of one entity table, keyed by storage id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTable {
    table_name: String,
    rows: BTreeMap<i64, Entity>,
    next_row_id: i64,
    unique_identifiers: bool,
    #[serde(skip)]
    identifier_index: HashMap<Uuid, i64>,
}

impl EntityTable {
    pub fn new(table_name: impl Into<String>, unique_identifiers: bool) -> Self {
        Self {
            table_name: table_name.into(),
            rows: BTreeMap::new(),
            next_row_id: 1,
            unique_identifiers,
            identifier_index: HashMap::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Validates, assigns the next key and stores a copy of `entity`.
    pub fn insert(&mut self, model: &ModelSchema, entity: &mut Entity) -> Result<i64> {
        model.validate_fields(&entity.fields)?;
        self.check_uniqueness(entity.activity_identifier, None)?;

        let id = self.next_row_id;
        self.next_row_id += 1;
        entity.id = Some(id);

        if let Some(identifier) = entity.activity_identifier {
            self.identifier_index.insert(identifier, id);
        }
        self.rows.insert(id, entity.clone());
        Ok(id)
    }

    pub fn update(&mut self, model: &ModelSchema, entity: &Entity) -> Result<()> {
        let id = entity
            .id
            .ok_or_else(|| DbError::ExecutionError(format!("Cannot update unsaved entity in '{}'", self.table_name)))?;
        model.validate_fields(&entity.fields)?;
        self.check_uniqueness(entity.activity_identifier, Some(id))?;

        let previous = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| DbError::EntityNotFound(self.table_name.clone(), id))?;
        if let Some(old_identifier) = previous.activity_identifier
            && self.identifier_index.get(&old_identifier) == Some(&id)
        {
            self.identifier_index.remove(&old_identifier);
        }
        *previous = entity.clone();
        if let Some(identifier) = entity.activity_identifier {
            self.identifier_index.insert(identifier, id);
        }
        Ok(())
    }

    pub fn get(&self, id: i64) -> Option<&Entity> {
        self.rows.get(&id)
    }

    pub fn find_by_activity_identifier(&self, identifier: Uuid) -> Option<&Entity> {
        match self.identifier_index.get(&identifier) {
            Some(id) => self.rows.get(id),
            // Without the constraint several rows may share it; first wins.
            None if !self.unique_identifiers => self
                .rows
                .values()
                .find(|entity| entity.activity_identifier == Some(identifier)),
            None => None,
        }
    }

    pub fn scan(&self) -> impl Iterator<Item = &Entity> {
        self.rows.values()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn unique_identifiers(&self) -> bool {
        self.unique_identifiers
    }

    /// Switches the `activityIdentifier` constraint and rebuilds the index.
    ///
    /// Enabling it fails when two rows already share an identifier.
    pub fn set_unique_identifiers(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            let mut seen = HashMap::new();
            for entity in self.rows.values() {
                let (Some(identifier), Some(id)) = (entity.activity_identifier, entity.id) else {
                    continue;
                };
                if let Some(other) = seen.insert(identifier, id) {
                    return Err(DbError::ConstraintViolation(format!(
                        "Unique constraint violation: Column '{}' holds {} on rows {} and {} of '{}'",
                        ACTIVITY_IDENTIFIER_FIELD, identifier, other, id, self.table_name
                    )));
                }
            }
        }
        self.unique_identifiers = enabled;
        self.rebuild_index();
        Ok(())
    }

    /// Rebuilds the identifier index after deserialization.
    pub fn rebuild_index(&mut self) {
        self.identifier_index = self
            .rows
            .iter()
            .filter_map(|(id, entity)| entity.activity_identifier.map(|identifier| (identifier, *id)))
            .collect();
    }

    fn check_uniqueness(&self, identifier: Option<Uuid>, ignore_id: Option<i64>) -> Result<()> {
        if !self.unique_identifiers {
            return Ok(());
        }
        let Some(identifier) = identifier else {
            return Ok(());
        };
        match self.identifier_index.get(&identifier) {
            Some(id) if Some(*id) != ignore_id => Err(DbError::ConstraintViolation(format!(
                "Unique constraint violation: Column '{}' already contains value {}",
                ACTIVITY_IDENTIFIER_FIELD, identifier
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, FieldMap};
    use crate::fields;
    use crate::schema::Column;

    fn schema() -> ModelSchema {
        ModelSchema::new("user", vec![Column::new("name", DataType::Text)])
    }

    #[test]
    fn test_insert_assigns_sequential_keys() {
        let mut table = EntityTable::new("user", true);
        let mut first = Entity::new("user", fields! { "name" => "a" });
        let mut second = Entity::new("user", fields! { "name" => "b" });

        assert_eq!(table.insert(&schema(), &mut first).unwrap(), 1);
        assert_eq!(table.insert(&schema(), &mut second).unwrap(), 2);
        assert_eq!(second.id, Some(2));
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_unique_activity_identifier() {
        let identifier = Uuid::new_v4();
        let mut table = EntityTable::new("user", true);
        let mut first = Entity::new("user", FieldMap::new()).with_activity_identifier(identifier);
        table.insert(&schema(), &mut first).unwrap();

        let mut duplicate = Entity::new("user", FieldMap::new()).with_activity_identifier(identifier);
        let err = table.insert(&schema(), &mut duplicate).unwrap_err();
        assert!(err.is_unique_violation_on(ACTIVITY_IDENTIFIER_FIELD));

        // updating the owner itself is fine
        table.update(&schema(), &first).unwrap();
        assert_eq!(table.find_by_activity_identifier(identifier).unwrap().id, Some(1));
    }

    #[test]
    fn test_rebuild_index_after_round_trip() {
        let identifier = Uuid::new_v4();
        let mut table = EntityTable::new("user", true);
        let mut entity = Entity::new("user", FieldMap::new()).with_activity_identifier(identifier);
        table.insert(&schema(), &mut entity).unwrap();

        let bytes = rmp_serde::to_vec(&table).unwrap();
        let mut restored: EntityTable = rmp_serde::from_slice(&bytes).unwrap();
        assert!(restored.find_by_activity_identifier(identifier).is_none());

        restored.rebuild_index();
        assert_eq!(restored.find_by_activity_identifier(identifier).unwrap().id, Some(1));
    }
}
