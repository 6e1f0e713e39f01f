use super::Entity;
use crate::activity::{Activity, ActivityQuery};
use crate::core::Result;
use crate::schema::ModelSchema;
use std::sync::Arc;
use uuid::Uuid;

/// Persistence layer consumed by the replay engine.
///
/// Implementations must give read-your-writes consistency within a call:
/// a record saved through `save_activity` is visible to the next
/// `find_activities`.
pub trait Persistence: Send + Sync {
    /// Schema registered for `table_name`.
    fn schema(&self, table_name: &str) -> Option<Arc<ModelSchema>>;

    /// All registered entity schemas.
    fn schemas(&self) -> Vec<Arc<ModelSchema>>;

    /// Inserts a new entity and assigns its key.
    ///
    /// Records an `insert` activity for it as a side effect.
    fn insert_entity(&self, entity: &mut Entity) -> Result<()>;

    /// Overwrites the stored row of an existing entity.
    fn update_entity(&self, entity: &Entity) -> Result<()>;

    fn get_entity(&self, table_name: &str, id: i64) -> Result<Option<Entity>>;

    fn find_by_activity_identifier(&self, table_name: &str, identifier: Uuid) -> Result<Option<Entity>>;

    /// Appends the activity (assigning its id) or replaces the stored one.
    fn save_activity(&self, activity: &mut Activity) -> Result<()>;

    fn find_activities(&self, query: &ActivityQuery) -> Result<Vec<Activity>>;

    fn save_entity(&self, entity: &mut Entity) -> Result<()> {
        match entity.id {
            Some(_) => self.update_entity(entity),
            None => self.insert_entity(entity),
        }
    }
}
