use crate::core::DataType;
use crate::schema::{Column, ModelSchema, Relationship, TRANSACTION_RELATIONSHIP};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ACTIVITY_TABLE: &str = "activity";

/// Describes the table activities are logged in.
///
/// Handed to the [`Activator`](crate::Activator) explicitly rather than
/// registered globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySchema {
    pub table_name: String,
    #[serde(default = "default_transaction_table")]
    pub transaction_table: String,
}

fn default_transaction_table() -> String {
    TRANSACTION_RELATIONSHIP.to_string()
}

impl ActivitySchema {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            transaction_table: default_transaction_table(),
        }
    }

    /// The activity table expressed as a regular entity schema.
    pub fn model_schema(&self) -> ModelSchema {
        ModelSchema::new(
            self.table_name.clone(),
            vec![
                Column::new("entityIdentifier", DataType::Text),
                Column::new("tableName", DataType::Text).not_null(),
                Column::new("verb", DataType::Text).not_null(),
                Column::new("dateCreated", DataType::Text).not_null(),
                Column::new("patch", DataType::Text),
                Column::new("old_data", DataType::Text),
                Column::new("changed_data", DataType::Text),
                Column::new("transactionId", DataType::Integer),
            ],
        )
        .with_relationship(Relationship::many_to_one(
            TRANSACTION_RELATIONSHIP,
            self.transaction_table.clone(),
            "transactionId",
        ))
    }
}

impl Default for ActivitySchema {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_TABLE)
    }
}
