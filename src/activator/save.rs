use super::Activator;
use crate::activity::ActivityQuery;
use crate::core::{DbError, Result};
use crate::storage::{Entity, Persistence};

impl<P: Persistence> Activator<P> {
    /// Persists `entities`, then stamps the latest activity recorded for
    /// each one with its `activityIdentifier`.
    ///
    /// Entities without an identifier are saved but not linked. An entity
    /// with no recorded activity is logged and skipped.
    pub fn save(&self, entities: &mut [Entity]) -> Result<()> {
        for entity in entities.iter_mut() {
            self.store.save_entity(entity)?;
        }

        let mut linked = Vec::new();
        for entity in entities.iter() {
            let (Some(identifier), Some(id)) = (entity.activity_identifier, entity.id) else {
                continue;
            };
            let model = self
                .store
                .schema(&entity.table_name)
                .ok_or_else(|| DbError::TableNotFound(entity.table_name.clone()))?;

            let query = ActivityQuery::new()
                .table_name(model.table_name())
                .entity_key(model.primary_key(), id)
                .newest_first()
                .limit(1);
            let Some(mut last_activity) = self.store.find_activities(&query)?.into_iter().next() else {
                log::debug!(
                    "last activity not found for {} {}...",
                    entity.table_name,
                    id
                );
                continue;
            };

            last_activity.entity_identifier = Some(identifier);
            linked.push(last_activity);
        }

        for activity in linked.iter_mut() {
            self.store.save_activity(activity)?;
        }
        Ok(())
    }
}
