use serde::{Deserialize, Serialize};

/// Replay engine behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatorConfig {
    /// When creating an entity hits a uniqueness conflict on
    /// `activityIdentifier`, look the entity up again and merge into it
    /// instead of failing the group.
    #[serde(default = "default_true")]
    pub creation_conflict_retry: bool,

    /// Resolve `<relationship>ActivityIdentifier` fields in patches to the
    /// related entity's key. When off, such fields are dropped.
    #[serde(default = "default_true")]
    pub resolve_relationship_identifiers: bool,
}

fn default_true() -> bool {
    true
}

impl ActivatorConfig {
    pub fn new() -> Self {
        Self {
            creation_conflict_retry: true,
            resolve_relationship_identifiers: true,
        }
    }

    pub fn creation_conflict_retry(mut self, enabled: bool) -> Self {
        self.creation_conflict_retry = enabled;
        self
    }

    pub fn resolve_relationship_identifiers(mut self, enabled: bool) -> Self {
        self.resolve_relationship_identifiers = enabled;
        self
    }
}

impl Default for ActivatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory store behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Actor stamped on the transaction of auto-recorded activities.
    #[serde(default)]
    pub actor: Option<String>,

    /// Enforce one entity per `activityIdentifier` in each table.
    #[serde(default = "default_true")]
    pub unique_activity_identifiers: bool,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self {
            actor: None,
            unique_activity_identifiers: true,
        }
    }

    pub fn actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    pub fn unique_activity_identifiers(mut self, enabled: bool) -> Self {
        self.unique_activity_identifiers = enabled;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ActivatorConfig::default();
        assert!(config.creation_conflict_retry);
        assert!(config.resolve_relationship_identifiers);

        let store = StoreConfig::default();
        assert!(store.actor.is_none());
        assert!(store.unique_activity_identifiers);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ActivatorConfig =
            serde_json::from_str(r#"{"creation_conflict_retry": false}"#).unwrap();
        assert!(!config.creation_conflict_retry);
        assert!(config.resolve_relationship_identifiers);

        let store: StoreConfig = serde_json::from_str(r#"{"actor": "importer"}"#).unwrap();
        assert_eq!(store.actor.as_deref(), Some("importer"));
        assert!(store.unique_activity_identifiers);
    }
}
