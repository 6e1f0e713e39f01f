use super::Activator;
use super::merge::merged_datum_from_activities;
use crate::activity::{Activity, ActivityQuery, ActivityTransaction, Verb};
use crate::core::{ActivityError, DbError, FieldMap, Result, Value};
use crate::schema::{ACTIVITY_IDENTIFIER_FIELD, ModelSchema, relationships_in};
use crate::storage::{Entity, Persistence};
use tracing::{Level, event, info_span};
use uuid::Uuid;

enum Creation {
    Created(i64),
    /// Lost a creation race; the entity already exists under this key.
    Existing(i64),
}

impl<P: Persistence> Activator<P> {
    /// Converges the entities behind `activities` to the state implied by
    /// their full chronological history.
    ///
    /// Activities sharing an `entityIdentifier` must be contiguous: groups
    /// are formed from runs, not from a full partition. Inside a group,
    /// activities are ordered by `dateCreated` and equal timestamps keep
    /// their input order.
    ///
    /// Groups commit one at a time. An error stops at the failing group and
    /// leaves the groups before it committed.
    ///
    /// When a group creates its entity, its earliest activity is rewritten in
    /// memory to mirror the recorded insert activity (`id`, `changed_data`,
    /// `transaction`) and the others get `old_data` pointing at the new key.
    pub fn activate(&self, activities: &mut [Activity]) -> Result<()> {
        let mut pending = contiguous_groups(activities);
        pending.reverse();

        // Dependents of a created entity run before the next input group.
        while let Some(group) = pending.pop() {
            if let Some(dependents) = self.activate_group(activities, group)? {
                pending.push(dependents);
            }
        }
        Ok(())
    }

    fn activate_group(
        &self,
        activities: &mut [Activity],
        mut group: Vec<usize>,
    ) -> Result<Option<Vec<usize>>> {
        group.sort_by_key(|&index| activities[index].date_created);
        let first_index = group[0];
        let first = &activities[first_index];

        let entity_identifier = first
            .entity_identifier
            .ok_or_else(|| ActivityError::with_error("entityIdentifier", "entity identifier is missing"))?;
        let model = self.store.schema(&first.table_name).ok_or_else(|| {
            ActivityError::with_error("tableName", format!("model from {} not found", first.table_name))
        })?;
        let primary_key = model.primary_key();

        let span = info_span!(
            "activator.activate_group",
            entity_identifier = %entity_identifier,
            table_name = model.table_name(),
            size = group.len()
        );
        let _enter = span.enter();

        let mut entity_id = first.prior_key(primary_key);
        if entity_id.is_none() {
            entity_id = self
                .store
                .find_by_activity_identifier(model.table_name(), entity_identifier)?
                .and_then(|entity| entity.id);
        }

        let entity_id = match entity_id {
            Some(id) => id,
            None => match self.create_entity(activities, first_index, &model, entity_identifier)? {
                Creation::Created(id) => {
                    let dependents = group[1..].to_vec();
                    for &index in &dependents {
                        activities[index].old_data = Some(FieldMap::new().with(primary_key, id));
                    }
                    return Ok((!dependents.is_empty()).then_some(dependents));
                }
                Creation::Existing(id) => id,
            },
        };

        self.merge_into_entity(activities, &group, &model, entity_identifier, entity_id)?;
        Ok(None)
    }

    fn create_entity(
        &self,
        activities: &mut [Activity],
        first_index: usize,
        model: &ModelSchema,
        entity_identifier: Uuid,
    ) -> Result<Creation> {
        let mut fields = relationships_in(&activities[first_index].patch, model);
        fields.remove(model.primary_key());
        self.resolve_relationship_identifiers(model, &mut fields)?;
        discard_invalid_fields(model, &mut fields);

        let mut entity = Entity::new(model.table_name(), fields).with_activity_identifier(entity_identifier);
        if let Err(err) = self.save(std::slice::from_mut(&mut entity)) {
            if self.config.creation_conflict_retry && err.is_unique_violation_on(ACTIVITY_IDENTIFIER_FIELD) {
                let existing = self
                    .store
                    .find_by_activity_identifier(model.table_name(), entity_identifier)?
                    .and_then(|entity| entity.id);
                if let Some(id) = existing {
                    event!(Level::WARN, entity_id = id, "entity was created concurrently, merging into it");
                    return Ok(Creation::Existing(id));
                }
            }
            return Err(err);
        }
        let entity_id = entity.id.ok_or_else(|| {
            DbError::ExecutionError(format!("Saved {} entity has no key", model.table_name()))
        })?;

        let query = ActivityQuery::new()
            .table_name(model.table_name())
            .entity_identifier(entity_identifier)
            .verb(Verb::Insert)
            .entity_key(model.primary_key(), entity_id);
        let mut insert_activity = self.store.find_activities(&query)?.into_iter().next().ok_or_else(|| {
            ActivityError::with_error(
                "entityIdentifier",
                format!("insert activity for {} {} not found", model.table_name(), entity_identifier),
            )
        })?;

        // The log keeps the logical time of the original event.
        let first = &mut activities[first_index];
        insert_activity.date_created = first.date_created;
        self.store.save_activity(&mut insert_activity)?;

        first.id = insert_activity.id;
        first.changed_data = insert_activity.changed_data.clone();
        if let Some(transaction) = &insert_activity.transaction {
            first.transaction = Some(ActivityTransaction::with_actor(transaction.actor.clone()));
        }

        event!(Level::DEBUG, entity_id, activity_id = ?insert_activity.id, "created entity");
        Ok(Creation::Created(entity_id))
    }

    fn merge_into_entity(
        &self,
        activities: &mut [Activity],
        group: &[usize],
        model: &ModelSchema,
        entity_identifier: Uuid,
        entity_id: i64,
    ) -> Result<()> {
        let primary_key = model.primary_key();
        let min_date = activities[group[0]].date_created;

        let query = ActivityQuery::new()
            .table_name(model.table_name())
            .entity_key(primary_key, entity_id)
            .since(min_date)
            .excluding(group.iter().filter_map(|&index| activities[index].id));
        let already_activities = self.store.find_activities(&query)?;

        for &index in group {
            let activity = &mut activities[index];
            // A field that can never be applied must not reach the log, or
            // every later merge of this entity would pick it up again.
            discard_invalid_fields(model, &mut activity.patch);
            let old_data = activity.old_data.get_or_insert_with(FieldMap::new);
            if !old_data.contains_key(primary_key) {
                old_data.insert(primary_key, entity_id);
            }
            self.store.save_activity(activity)?;
        }

        let mut all_activities: Vec<&Activity> = already_activities
            .iter()
            .chain(group.iter().map(|&index| &activities[index]))
            .collect();
        all_activities.sort_by_key(|activity| activity.date_created);

        let seed = all_activities[0].datum();
        let mut datum = merged_datum_from_activities(all_activities.iter().copied(), model, Some(&seed));
        datum.remove(primary_key);
        self.resolve_relationship_identifiers(model, &mut datum)?;
        discard_invalid_fields(model, &mut datum);

        let mut entity = self
            .store
            .get_entity(model.table_name(), entity_id)?
            .ok_or_else(|| DbError::EntityNotFound(model.table_name().to_string(), entity_id))?;
        entity.activity_identifier = Some(entity_identifier);
        entity.modify(model, datum)?;
        self.save(std::slice::from_mut(&mut entity))?;

        event!(
            Level::DEBUG,
            entity_id,
            merged = all_activities.len(),
            concurrent = already_activities.len(),
            "merged activities into entity"
        );
        Ok(())
    }

    /// Replaces `<relationship>ActivityIdentifier` fields with the related
    /// entity's key in the relationship's foreign key column.
    fn resolve_relationship_identifiers(&self, model: &ModelSchema, fields: &mut FieldMap) -> Result<()> {
        for projection in model.projections() {
            let Some(value) = fields.remove(&projection.accessor) else {
                continue;
            };
            let Some(relationship) = model.get_relationship(&projection.relationship) else {
                continue;
            };
            if !self.config.resolve_relationship_identifiers {
                continue;
            }
            if value.is_null() {
                fields.insert(relationship.foreign_key.clone(), Value::Null);
                continue;
            }
            let Some(identifier) = value.as_uuid() else {
                log::warn!(
                    "ignoring malformed {} '{}' on {}",
                    projection.accessor,
                    value,
                    model.table_name()
                );
                continue;
            };

            let related = self
                .store
                .find_by_activity_identifier(&relationship.target_table, identifier)?
                .and_then(|entity| entity.id);
            match related {
                Some(key) => {
                    fields.insert(relationship.foreign_key.clone(), key);
                }
                None => log::warn!(
                    "{} {} not found, leaving {}.{} unchanged",
                    relationship.target_table,
                    identifier,
                    model.table_name(),
                    relationship.foreign_key
                ),
            }
        }
        Ok(())
    }
}

fn discard_invalid_fields(model: &ModelSchema, fields: &mut FieldMap) {
    for field in model.discard_invalid(fields) {
        log::warn!("dropping invalid value for {}.{}", model.table_name(), field);
    }
}

/// Splits `activities` into runs sharing the same `entityIdentifier`.
fn contiguous_groups(activities: &[Activity]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, activity) in activities.iter().enumerate() {
        match groups.last_mut() {
            Some(group) if activities[group[0]].entity_identifier == activity.entity_identifier => {
                group.push(index)
            }
            _ => groups.push(vec![index]),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_contiguous_groups_split_on_runs_only() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let now = Utc::now();
        let activities = vec![
            Activity::insert(a, "user", now),
            Activity::update(a, "user", now),
            Activity::insert(b, "user", now),
            Activity::update(a, "user", now),
        ];

        assert_eq!(contiguous_groups(&activities), vec![vec![0, 1], vec![2], vec![3]]);
        assert!(contiguous_groups(&[]).is_empty());
    }
}
