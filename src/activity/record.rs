use crate::core::FieldMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Grouping context a change was recorded under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTransaction {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl ActivityTransaction {
    pub fn with_actor(actor: Option<String>) -> Self {
        Self { id: None, actor }
    }
}

/// One logged change to one entity.
///
/// `id` and `changed_data` are assigned once the record is persisted; the
/// replay engine may also rewrite `old_data` and `transaction` in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub entity_identifier: Option<Uuid>,
    pub table_name: String,
    pub verb: Verb,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub patch: FieldMap,
    #[serde(default, rename = "old_data")]
    pub old_data: Option<FieldMap>,
    #[serde(default, rename = "changed_data")]
    pub changed_data: Option<FieldMap>,
    #[serde(default)]
    pub transaction: Option<ActivityTransaction>,
}

impl Activity {
    pub fn new(
        entity_identifier: Uuid,
        table_name: impl Into<String>,
        verb: Verb,
        date_created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            entity_identifier: Some(entity_identifier),
            table_name: table_name.into(),
            verb,
            date_created,
            patch: FieldMap::new(),
            old_data: None,
            changed_data: None,
            transaction: None,
        }
    }

    pub fn insert(entity_identifier: Uuid, table_name: impl Into<String>, date_created: DateTime<Utc>) -> Self {
        Self::new(entity_identifier, table_name, Verb::Insert, date_created)
    }

    pub fn update(entity_identifier: Uuid, table_name: impl Into<String>, date_created: DateTime<Utc>) -> Self {
        Self::new(entity_identifier, table_name, Verb::Update, date_created)
    }

    pub fn with_patch(mut self, patch: FieldMap) -> Self {
        self.patch = patch;
        self
    }

    pub fn with_old_data(mut self, old_data: FieldMap) -> Self {
        self.old_data = Some(old_data);
        self
    }

    /// Full snapshot known for this record: prior state overlaid by the
    /// fields it changed. Empty when neither is known.
    pub fn datum(&self) -> FieldMap {
        let mut datum = self.old_data.clone().unwrap_or_default();
        if let Some(changed) = &self.changed_data {
            datum.merge(changed);
        }
        datum
    }

    /// Storage key of the target entity, read from `datum()`.
    pub fn entity_key(&self, primary_key: &str) -> Option<i64> {
        self.old_data
            .as_ref()
            .and_then(|old| old.get(primary_key))
            .or_else(|| self.changed_data.as_ref().and_then(|c| c.get(primary_key)))
            .and_then(|value| value.as_i64())
    }

    /// Key carried by `old_data` only; what identity resolution trusts first.
    pub fn prior_key(&self, primary_key: &str) -> Option<i64> {
        self.old_data
            .as_ref()
            .and_then(|old| old.get(primary_key))
            .and_then(|value| value.as_i64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::fields;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn test_datum_overlays_changed_on_old() {
        let mut activity = Activity::update(Uuid::new_v4(), "user", at(1))
            .with_old_data(fields! { "id" => 4i64, "name" => "old", "age" => 3i64 });
        activity.changed_data = Some(fields! { "name" => "new" });

        let datum = activity.datum();
        assert_eq!(datum.get("name"), Some(&Value::Text("new".into())));
        assert_eq!(datum.get("age"), Some(&Value::Integer(3)));
        assert_eq!(activity.entity_key("id"), Some(4));
    }

    #[test]
    fn test_entity_key_falls_back_to_changed_data() {
        let mut activity = Activity::insert(Uuid::new_v4(), "user", at(1));
        assert_eq!(activity.entity_key("id"), None);

        activity.changed_data = Some(fields! { "id" => 9i64 });
        assert_eq!(activity.entity_key("id"), Some(9));
        assert_eq!(activity.prior_key("id"), None);
    }

    #[test]
    fn test_json_field_names() {
        let identifier = Uuid::new_v4();
        let activity = Activity::insert(identifier, "user", at(0))
            .with_patch(fields! { "name" => "Ada" })
            .with_old_data(fields! { "id" => 1i64 });
        let json = serde_json::to_value(&activity).unwrap();

        assert_eq!(json["entityIdentifier"], serde_json::json!(identifier.to_string()));
        assert_eq!(json["tableName"], "user");
        assert_eq!(json["verb"], "insert");
        assert_eq!(json["old_data"]["id"], 1);
        assert!(json.get("dateCreated").is_some());
    }
}
