use super::ModelSchema;
use crate::core::{DbError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maps table names to entity schemas.
///
/// Immutable once handed to a store; clones share the schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<ModelSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: ModelSchema) -> Result<()> {
        let name = schema.table_name().to_string();
        if self.schemas.contains_key(&name) {
            return Err(DbError::TableExists(name));
        }
        self.schemas.insert(name, Arc::new(schema));
        Ok(())
    }

    pub fn with_schema(mut self, schema: ModelSchema) -> Result<Self> {
        self.register(schema)?;
        Ok(self)
    }

    pub fn model_from_table_name(&self, table_name: &str) -> Option<Arc<ModelSchema>> {
        self.schemas.get(table_name).cloned()
    }

    pub fn table_exists(&self, table_name: &str) -> bool {
        self.schemas.contains_key(table_name)
    }

    pub fn models(&self) -> Vec<Arc<ModelSchema>> {
        self.schemas.values().cloned().collect()
    }

    pub fn list_tables(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }
}
