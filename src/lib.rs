// ============================================================================
// Activator Library
// ============================================================================
//
// Rebuilds entity state from an append-only log of change records
// ("activities"), including records that arrive out of order or are
// inserted retroactively.
//
// ============================================================================

pub mod activator;
pub mod activity;
pub mod config;
pub mod core;
pub mod prelude;
pub mod schema;
pub mod storage;

pub use activator::{Activator, merged_datum_from_activities};
pub use activity::{Activity, ActivityQuery, ActivitySchema, ActivityTransaction, Verb};
pub use config::{ActivatorConfig, StoreConfig};
pub use crate::core::{ActivityError, DataType, DbError, FieldMap, Result, Value};
pub use schema::{Column, ModelSchema, Relationship, SchemaRegistry, relationships_in};
pub use storage::{Entity, InMemoryStore, Persistence, SnapshotManager, StoreSnapshot};

/// Activator over the bundled in-memory store.
pub type MemoryActivator = Activator<InMemoryStore>;

/// Opens an in-memory store for `registry` with the default activity schema.
///
/// # Examples
///
/// ```
/// use activator::{Activity, Column, DataType, ModelSchema, SchemaRegistry, fields};
/// use chrono::Utc;
/// use uuid::Uuid;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = SchemaRegistry::new()
///     .with_schema(ModelSchema::new("user", vec![Column::new("name", DataType::Text)]))?;
/// let activator = activator::open_in_memory(registry);
///
/// let identifier = Uuid::new_v4();
/// let mut activities = vec![
///     Activity::insert(identifier, "user", Utc::now()).with_patch(fields! { "name" => "Ada" }),
/// ];
/// activator.activate(&mut activities)?;
///
/// assert_eq!(activator.store().row_count("user")?, 1);
/// # Ok(())
/// # }
/// ```
pub fn open_in_memory(registry: SchemaRegistry) -> MemoryActivator {
    Activator::new(InMemoryStore::new(registry), ActivitySchema::default())
}
