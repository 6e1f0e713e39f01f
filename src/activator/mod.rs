//! Replays activity records into entity state.
//!
//! [`Activator::activate`] folds batches of activities into the entities they
//! describe; [`Activator::save`] persists entities and links each one to the
//! latest activity recorded for it, so later replays can find it by its
//! external identifier.

mod activate;
mod merge;
mod save;

pub use merge::merged_datum_from_activities;

use crate::activity::ActivitySchema;
use crate::config::ActivatorConfig;
use crate::core::{DbError, Result};
use crate::schema::ModelSchema;
use crate::storage::{InMemoryStore, Persistence};
use std::sync::Arc;

pub struct Activator<P: Persistence> {
    store: P,
    activity_schema: ActivitySchema,
    config: ActivatorConfig,
}

impl<P: Persistence> Activator<P> {
    pub fn new(store: P, activity_schema: ActivitySchema) -> Self {
        Self {
            store,
            activity_schema,
            config: ActivatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ActivatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn config(&self) -> &ActivatorConfig {
        &self.config
    }

    pub fn activity_schema(&self) -> &ActivitySchema {
        &self.activity_schema
    }

    pub fn set_activity_schema(&mut self, activity_schema: ActivitySchema) {
        self.activity_schema = activity_schema;
    }

    /// Every registered entity schema, followed by the activity schema.
    pub fn models(&self) -> Vec<Arc<ModelSchema>> {
        let mut models = self.store.schemas();
        models.push(Arc::new(self.activity_schema.model_schema()));
        models
    }

    pub fn into_store(self) -> P {
        self.store
    }
}

impl Activator<InMemoryStore> {
    /// Rows of every model in [`Activator::models`], keyed by table name.
    /// The activity log is listed under the activity schema's table.
    pub fn export_json(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let mut output = serde_json::Map::new();
        for model in self.models() {
            let table = model.table_name();
            let rows = if table == self.activity_schema.table_name {
                serde_json::to_value(self.store.activities()?)
            } else {
                serde_json::to_value(self.store.entities(table)?)
            }
            .map_err(|e| DbError::ExecutionError(format!("Failed to encode {} rows: {}", table, e)))?;
            output.insert(table.to_string(), rows);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use crate::storage::InMemoryStore;

    #[test]
    fn test_models_lists_activity_schema_last() {
        let registry = SchemaRegistry::new()
            .with_schema(ModelSchema::new("user", vec![]))
            .unwrap();
        let mut activator = Activator::new(InMemoryStore::new(registry), ActivitySchema::default());

        let names: Vec<String> = activator
            .models()
            .iter()
            .map(|m| m.table_name().to_string())
            .collect();
        assert_eq!(names, vec!["user", "activity"]);

        activator.set_activity_schema(ActivitySchema::new("audit_log"));
        assert_eq!(activator.activity_schema().table_name, "audit_log");
        assert_eq!(activator.models().last().unwrap().table_name(), "audit_log");
    }

    #[test]
    fn test_export_lists_activity_log_under_its_table() {
        let registry = SchemaRegistry::new()
            .with_schema(ModelSchema::new("user", vec![]))
            .unwrap();
        let activator = Activator::new(InMemoryStore::new(registry), ActivitySchema::new("audit_log"));
        let mut user = crate::storage::Entity::new("user", crate::core::FieldMap::new());
        activator.save(std::slice::from_mut(&mut user)).unwrap();

        let export = activator.export_json().unwrap();
        let tables: Vec<&str> = export.keys().map(String::as_str).collect();
        assert_eq!(tables, vec!["audit_log", "user"]);
        assert_eq!(export["user"].as_array().unwrap().len(), 1);
        assert_eq!(export["audit_log"][0]["verb"], "insert");
    }
}
