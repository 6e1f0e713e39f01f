use activator::{
    ActivatorConfig, Activity, Column, DataType, DbError, ModelSchema, Relationship, SchemaRegistry, Value, fields,
    relationships_in,
};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap()
}

fn offer_schema() -> ModelSchema {
    ModelSchema::new(
        "offer",
        vec![
            Column::new("name", DataType::Text),
            Column::new("offererId", DataType::Integer),
        ],
    )
    .with_relationship(Relationship::many_to_one("offerer", "offerer", "offererId"))
    .with_relationship(Relationship::one_to_many("stocks", "stock", "offerId"))
}

fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with_schema(ModelSchema::new("offerer", vec![Column::new("name", DataType::Text)]))
        .unwrap()
        .with_schema(offer_schema())
        .unwrap()
}

#[test]
fn test_relationships_in_keeps_only_schema_fields() {
    let patch = fields! {
        "id" => 1i64,
        "name" => "Tour",
        "offererActivityIdentifier" => Uuid::new_v4(),
        "stocksActivityIdentifier" => Uuid::new_v4(),
        "offerer" => "nested",
        "activityIdentifier" => Uuid::new_v4(),
        "z" => 0i64,
    };

    let filtered = relationships_in(&patch, &offer_schema());
    let keys: Vec<&str> = filtered.keys().collect();
    assert_eq!(keys, vec!["id", "name", "offererActivityIdentifier"]);
}

#[test]
fn test_relationship_identifier_resolves_to_foreign_key() {
    let activator = activator::open_in_memory(registry());
    let offerer = Uuid::new_v4();
    let offer = Uuid::new_v4();
    let mut activities = vec![
        Activity::insert(offerer, "offerer", at(0)).with_patch(fields! { "name" => "Venue" }),
        Activity::insert(offer, "offer", at(1)).with_patch(fields! {
            "name" => "Tour",
            "offererActivityIdentifier" => offerer.to_string(),
        }),
    ];

    activator.activate(&mut activities).unwrap();

    let store = activator.store();
    let offerer_row = store.entities("offerer").unwrap().remove(0);
    let offer_row = store.entities("offer").unwrap().remove(0);
    assert_eq!(offer_row.get("offererId").and_then(Value::as_i64), offerer_row.id);
    assert!(offer_row.get("offererActivityIdentifier").is_none());

    assert_eq!(offer_row.relationship_activity_identifier(store, "offerer").unwrap(), Some(offerer));
    let identifiers = offer_row.relationship_activity_identifiers(store).unwrap();
    assert_eq!(identifiers.len(), 1);
    assert_eq!(identifiers["offererActivityIdentifier"], Some(offerer));
}

#[test]
fn test_null_relationship_identifier_clears_foreign_key() {
    let activator = activator::open_in_memory(registry());
    let offerer = Uuid::new_v4();
    let offer = Uuid::new_v4();
    let mut activities = vec![
        Activity::insert(offerer, "offerer", at(0)),
        Activity::insert(offer, "offer", at(1)).with_patch(fields! { "offererActivityIdentifier" => offerer }),
        Activity::update(offer, "offer", at(2)).with_patch(fields! { "offererActivityIdentifier" => Value::Null }),
    ];

    activator.activate(&mut activities).unwrap();

    let offer_row = activator.store().entities("offer").unwrap().remove(0);
    assert_eq!(offer_row.get("offererId"), Some(&Value::Null));
    assert_eq!(
        offer_row.relationship_activity_identifier(activator.store(), "offerer").unwrap(),
        None
    );
}

#[test]
fn test_unknown_related_identifier_leaves_foreign_key_unset() {
    let activator = activator::open_in_memory(registry());
    let mut activities = vec![Activity::insert(Uuid::new_v4(), "offer", at(0)).with_patch(fields! {
        "name" => "Tour",
        "offererActivityIdentifier" => Uuid::new_v4(),
    })];

    activator.activate(&mut activities).unwrap();

    let offer_row = activator.store().entities("offer").unwrap().remove(0);
    assert!(offer_row.get("offererId").is_none());
    assert_eq!(offer_row.get("name"), Some(&Value::Text("Tour".into())));
}

#[test]
fn test_resolution_can_be_disabled() {
    let activator = activator::open_in_memory(registry())
        .with_config(ActivatorConfig::new().resolve_relationship_identifiers(false));
    let offerer = Uuid::new_v4();
    let mut activities = vec![
        Activity::insert(offerer, "offerer", at(0)),
        Activity::insert(Uuid::new_v4(), "offer", at(1))
            .with_patch(fields! { "offererActivityIdentifier" => offerer }),
    ];

    activator.activate(&mut activities).unwrap();

    let offer_row = activator.store().entities("offer").unwrap().remove(0);
    assert!(offer_row.get("offererId").is_none());
}

#[test]
fn test_unknown_accessor_is_rejected() {
    let activator = activator::open_in_memory(registry());
    let mut activities = vec![Activity::insert(Uuid::new_v4(), "offer", at(0))];
    activator.activate(&mut activities).unwrap();

    let offer_row = activator.store().entities("offer").unwrap().remove(0);
    let err = offer_row
        .relationship_activity_identifier(activator.store(), "stocks")
        .unwrap_err();
    assert!(matches!(err, DbError::ColumnNotFound(ref accessor, _) if accessor == "stocksActivityIdentifier"));
}
