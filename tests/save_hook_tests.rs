use activator::{
    Activator, Activity, ActivityQuery, ActivitySchema, Column, DataType, Entity, InMemoryStore, ModelSchema,
    Persistence, SchemaRegistry, Value, fields,
};
use std::sync::Arc;
use uuid::Uuid;

fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with_schema(ModelSchema::new("user", vec![Column::new("name", DataType::Text)]))
        .unwrap()
}

#[test]
fn test_save_links_latest_activity_to_entity() {
    let activator = activator::open_in_memory(registry());
    let identifier = Uuid::new_v4();
    let mut users = [Entity::new("user", fields! { "name" => "Ada" }).with_activity_identifier(identifier)];

    activator.save(&mut users).unwrap();

    let id = users[0].id.unwrap();
    let records = activator
        .store()
        .find_activities(&ActivityQuery::new().table_name("user").entity_key("id", id))
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].entity_identifier, Some(identifier));
}

#[test]
fn test_save_without_identifier_leaves_log_unlinked() {
    let activator = activator::open_in_memory(registry());
    let mut users = [
        Entity::new("user", fields! { "name" => "Ada" }),
        Entity::new("user", fields! { "name" => "Grace" }).with_activity_identifier(Uuid::new_v4()),
    ];

    activator.save(&mut users).unwrap();

    let records = activator.store().activities().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].entity_identifier, None);
    assert_eq!(records[1].entity_identifier, users[1].activity_identifier);
}

#[test]
fn test_save_stamps_only_the_newest_record() {
    let activator = activator::open_in_memory(registry());
    let identifier = Uuid::new_v4();
    let mut user = Entity::new("user", fields! { "name" => "Ada" });
    activator.save(std::slice::from_mut(&mut user)).unwrap();
    let id = user.id.unwrap();

    let mut later = Activity::update(identifier, "user", chrono::Utc::now())
        .with_old_data(fields! { "id" => id })
        .with_patch(fields! { "name" => "Ada L." });
    later.entity_identifier = None;
    activator.store().save_activity(&mut later).unwrap();

    user.activity_identifier = Some(identifier);
    activator.save(std::slice::from_mut(&mut user)).unwrap();

    let records = activator.store().activities().unwrap();
    assert_eq!(records[0].entity_identifier, None);
    assert_eq!(records[1].entity_identifier, Some(identifier));
}

#[test]
fn test_updates_persist_fields() {
    let activator = activator::open_in_memory(registry());
    let mut user = Entity::new("user", fields! { "name" => "Ada" });
    activator.save(std::slice::from_mut(&mut user)).unwrap();

    user.fields.insert("name", "Grace");
    activator.save(std::slice::from_mut(&mut user)).unwrap();

    let stored = activator.store().get_entity("user", user.id.unwrap()).unwrap().unwrap();
    assert_eq!(stored.get("name"), Some(&Value::Text("Grace".into())));
}

/// Store whose activity log never answers queries.
struct SilentLogStore {
    inner: InMemoryStore,
}

impl Persistence for SilentLogStore {
    fn schema(&self, table_name: &str) -> Option<Arc<ModelSchema>> {
        self.inner.schema(table_name)
    }

    fn schemas(&self) -> Vec<Arc<ModelSchema>> {
        self.inner.schemas()
    }

    fn insert_entity(&self, entity: &mut Entity) -> activator::Result<()> {
        self.inner.insert_entity(entity)
    }

    fn update_entity(&self, entity: &Entity) -> activator::Result<()> {
        self.inner.update_entity(entity)
    }

    fn get_entity(&self, table_name: &str, id: i64) -> activator::Result<Option<Entity>> {
        self.inner.get_entity(table_name, id)
    }

    fn find_by_activity_identifier(
        &self,
        table_name: &str,
        identifier: Uuid,
    ) -> activator::Result<Option<Entity>> {
        self.inner.find_by_activity_identifier(table_name, identifier)
    }

    fn save_activity(&self, activity: &mut Activity) -> activator::Result<()> {
        self.inner.save_activity(activity)
    }

    fn find_activities(&self, _query: &ActivityQuery) -> activator::Result<Vec<Activity>> {
        Ok(Vec::new())
    }
}

#[test]
fn test_save_skips_entities_without_recorded_activity() {
    let store = SilentLogStore {
        inner: InMemoryStore::new(registry()),
    };
    let activator = Activator::new(store, ActivitySchema::default());
    let mut users = [Entity::new("user", fields! { "name" => "Ada" }).with_activity_identifier(Uuid::new_v4())];

    activator.save(&mut users).unwrap();

    assert!(users[0].id.is_some());
    let records = activator.store().inner.activities().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].entity_identifier, None);
}
