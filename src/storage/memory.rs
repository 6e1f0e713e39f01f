use super::persistence::StoreSnapshot;
use super::{ActivityLog, Entity, EntityTable, Persistence};
use crate::activity::{Activity, ActivityQuery, ActivityTransaction, Verb};
use crate::config::StoreConfig;
use crate::core::{DbError, Result};
use crate::schema::{ModelSchema, SchemaRegistry};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Thread-safe in-process persistence layer.
///
/// Every entity insert records an `insert` activity carrying the new row,
/// the way an audit trigger would. Updates are not recorded.
#[derive(Debug)]
pub struct InMemoryStore {
    registry: SchemaRegistry,
    tables: RwLock<HashMap<String, EntityTable>>,
    log: RwLock<ActivityLog>,
    actor: RwLock<Option<String>>,
    next_transaction_id: AtomicI64,
    config: StoreConfig,
}

impl InMemoryStore {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self::with_config(registry, StoreConfig::default())
    }

    pub fn with_config(registry: SchemaRegistry, config: StoreConfig) -> Self {
        let tables = registry
            .models()
            .iter()
            .map(|model| {
                let name = model.table_name().to_string();
                let table = EntityTable::new(name.clone(), config.unique_activity_identifiers);
                (name, table)
            })
            .collect();

        Self {
            registry,
            tables: RwLock::new(tables),
            log: RwLock::new(ActivityLog::new()),
            actor: RwLock::new(config.actor.clone()),
            next_transaction_id: AtomicI64::new(1),
            config,
        }
    }

    /// Rebuilds a store from a snapshot taken with [`InMemoryStore::snapshot`].
    ///
    /// `config` wins over the settings the snapshot was taken with; turning
    /// the identifier constraint on fails if restored rows violate it.
    pub fn restore(snapshot: StoreSnapshot, config: StoreConfig) -> Result<Self> {
        let mut registry = SchemaRegistry::new();
        for schema in snapshot.schemas {
            registry.register(schema)?;
        }

        let store = Self::with_config(registry, config);
        {
            let mut tables = store.tables.write()?;
            for (name, mut table) in snapshot.tables {
                if !store.registry.table_exists(&name) {
                    return Err(DbError::TableNotFound(name));
                }
                table.set_unique_identifiers(store.config.unique_activity_identifiers)?;
                tables.insert(name, table);
            }
        }
        *store.log.write()? = snapshot.activities;
        store
            .next_transaction_id
            .store(snapshot.next_transaction_id, Ordering::SeqCst);
        Ok(store)
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        let tables = self.tables.read()?.clone();
        let activities = self.log.read()?.clone();
        Ok(StoreSnapshot::new(
            self.registry.models().iter().map(|m| m.as_ref().clone()).collect(),
            tables,
            activities,
            self.next_transaction_id.load(Ordering::SeqCst),
        ))
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Actor attached to activities recorded from now on.
    pub fn set_actor(&self, actor: Option<String>) -> Result<()> {
        *self.actor.write()? = actor;
        Ok(())
    }

    pub fn entities(&self, table_name: &str) -> Result<Vec<Entity>> {
        let tables = self.tables.read()?;
        let table = tables
            .get(table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
        Ok(table.scan().cloned().collect())
    }

    pub fn row_count(&self, table_name: &str) -> Result<usize> {
        let tables = self.tables.read()?;
        let table = tables
            .get(table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
        Ok(table.row_count())
    }

    pub fn activity(&self, id: i64) -> Result<Option<Activity>> {
        Ok(self.log.read()?.get(id).cloned())
    }

    pub fn activities(&self) -> Result<Vec<Activity>> {
        Ok(self.log.read()?.records().to_vec())
    }

    fn model(&self, table_name: &str) -> Result<Arc<ModelSchema>> {
        self.registry
            .model_from_table_name(table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))
    }

    fn current_transaction(&self) -> Result<Option<ActivityTransaction>> {
        let actor = self.actor.read()?.clone();
        Ok(actor.map(|actor| ActivityTransaction {
            id: Some(self.next_transaction_id.fetch_add(1, Ordering::SeqCst)),
            actor: Some(actor),
        }))
    }
}

impl Persistence for InMemoryStore {
    fn schema(&self, table_name: &str) -> Option<Arc<ModelSchema>> {
        self.registry.model_from_table_name(table_name)
    }

    fn schemas(&self) -> Vec<Arc<ModelSchema>> {
        self.registry.models()
    }

    fn insert_entity(&self, entity: &mut Entity) -> Result<()> {
        let model = self.model(&entity.table_name)?;
        {
            let mut tables = self.tables.write()?;
            let table = tables
                .get_mut(model.table_name())
                .ok_or_else(|| DbError::TableNotFound(model.table_name().to_string()))?;
            table.insert(&model, entity)?;
        }

        let mut record = Activity {
            id: None,
            entity_identifier: None,
            table_name: model.table_name().to_string(),
            verb: Verb::Insert,
            date_created: Utc::now(),
            patch: entity.fields.clone(),
            old_data: None,
            changed_data: Some(entity.row(model.primary_key())),
            transaction: self.current_transaction()?,
        };
        self.log.write()?.save(&mut record)?;
        tracing::trace!(
            table_name = model.table_name(),
            entity_id = ?entity.id,
            activity_id = ?record.id,
            "recorded insert activity"
        );
        Ok(())
    }

    fn update_entity(&self, entity: &Entity) -> Result<()> {
        let model = self.model(&entity.table_name)?;
        let mut tables = self.tables.write()?;
        let table = tables
            .get_mut(model.table_name())
            .ok_or_else(|| DbError::TableNotFound(model.table_name().to_string()))?;
        table.update(&model, entity)
    }

    fn get_entity(&self, table_name: &str, id: i64) -> Result<Option<Entity>> {
        let tables = self.tables.read()?;
        let table = tables
            .get(table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
        Ok(table.get(id).cloned())
    }

    fn find_by_activity_identifier(&self, table_name: &str, identifier: Uuid) -> Result<Option<Entity>> {
        let tables = self.tables.read()?;
        let table = tables
            .get(table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
        Ok(table.find_by_activity_identifier(identifier).cloned())
    }

    fn save_activity(&self, activity: &mut Activity) -> Result<()> {
        self.log.write()?.save(activity)
    }

    fn find_activities(&self, query: &ActivityQuery) -> Result<Vec<Activity>> {
        Ok(self.log.read()?.find(query))
    }
}
