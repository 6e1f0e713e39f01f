//! Recommended API entrypoints grouped by abstraction level.
//!
//! `replay` covers feeding activity batches through the engine.
//! `advanced` exposes the storage seam for custom persistence layers.

pub mod replay {
    //! Stable surface for replaying activity logs.
    pub use crate::{
        Activator, ActivatorConfig, Activity, ActivityError, ActivitySchema, Column, DataType,
        Entity, FieldMap, InMemoryStore, ModelSchema, Relationship, SchemaRegistry, Value, Verb,
        fields, open_in_memory,
    };
}

pub mod advanced {
    //! Escape hatch for custom persistence layers and log inspection.
    pub use crate::activity::{ActivityOrder, ActivityQuery};
    pub use crate::storage::{ActivityLog, EntityTable, Persistence, SnapshotManager, StoreSnapshot};
    pub use crate::{merged_datum_from_activities, relationships_in};
}
