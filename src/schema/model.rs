use crate::core::{DataType, DbError, FieldMap, Result, Value};
use serde::{Deserialize, Serialize};

/// Column holding an entity's external identifier.
pub const ACTIVITY_IDENTIFIER_FIELD: &str = "activityIdentifier";

/// Relationship handled by the activity log itself; never projected.
pub const TRANSACTION_RELATIONSHIP: &str = "transaction";

/// Suffix of the derived `<relationship>ActivityIdentifier` accessors.
pub const RELATIONSHIP_IDENTIFIER_SUFFIX: &str = "ActivityIdentifier";

pub const DEFAULT_PRIMARY_KEY: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            if !self.nullable {
                return Err(DbError::ConstraintViolation(format!(
                    "Column '{}' cannot be NULL",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(DbError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

/// A link from one schema to another.
///
/// Scalar relationships store the related key in `foreign_key` on this
/// schema. Collection relationships keep the foreign key on the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub target_table: String,
    pub foreign_key: String,
    #[serde(default)]
    pub collection: bool,
}

impl Relationship {
    pub fn many_to_one(
        name: impl Into<String>,
        target_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_table: target_table.into(),
            foreign_key: foreign_key.into(),
            collection: false,
        }
    }

    pub fn one_to_many(
        name: impl Into<String>,
        target_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            collection: true,
            ..Self::many_to_one(name, target_table, foreign_key)
        }
    }
}

/// A derived `<relationship>ActivityIdentifier` accessor of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipProjection {
    pub relationship: String,
    pub accessor: String,
}

/// Serialized shape of a [`ModelSchema`]; projections are derived on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub table_name: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

/// Schema of one entity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SchemaDefinition", into = "SchemaDefinition")]
pub struct ModelSchema {
    table_name: String,
    primary_key: String,
    columns: Vec<Column>,
    relationships: Vec<Relationship>,
    projections: Vec<RelationshipProjection>,
}

impl ModelSchema {
    pub fn new(table_name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self::from(SchemaDefinition {
            table_name: table_name.into(),
            primary_key: default_primary_key(),
            columns,
            relationships: Vec::new(),
        })
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self.projections = project_relationships(&self.relationships);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn get_relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|rel| rel.name == name)
    }

    /// Relationship-identifier accessors available on entities of this schema.
    pub fn projections(&self) -> &[RelationshipProjection] {
        &self.projections
    }

    pub fn projection_for_accessor(&self, accessor: &str) -> Option<&RelationshipProjection> {
        self.projections.iter().find(|p| p.accessor == accessor)
    }

    pub fn projection_for_relationship(&self, relationship: &str) -> Option<&RelationshipProjection> {
        self.projections.iter().find(|p| p.relationship == relationship)
    }

    /// True for the primary key, columns, and projection accessors.
    pub fn accepts_field(&self, field: &str) -> bool {
        field == self.primary_key
            || self.get_column(field).is_some()
            || self.projection_for_accessor(field).is_some()
    }

    /// Removes column values that fail [`Column::validate`] and returns the
    /// names of the fields it removed. Non-column fields are left alone.
    pub fn discard_invalid(&self, fields: &mut FieldMap) -> Vec<String> {
        let mut rejected = Vec::new();
        fields.retain(|name, value| match self.get_column(name) {
            Some(column) if column.validate(value).is_err() => {
                rejected.push(name.to_string());
                false
            }
            _ => true,
        });
        rejected
    }

    /// Checks a row against the schema. The primary key is not a column here.
    pub fn validate_fields(&self, fields: &FieldMap) -> Result<()> {
        for (name, value) in fields {
            let column = self
                .get_column(name)
                .ok_or_else(|| DbError::ColumnNotFound(name.clone(), self.table_name.clone()))?;
            column.validate(value)?;
        }
        Ok(())
    }
}

impl From<SchemaDefinition> for ModelSchema {
    fn from(definition: SchemaDefinition) -> Self {
        let projections = project_relationships(&definition.relationships);
        Self {
            table_name: definition.table_name,
            primary_key: definition.primary_key,
            columns: definition.columns,
            relationships: definition.relationships,
            projections,
        }
    }
}

impl From<ModelSchema> for SchemaDefinition {
    fn from(schema: ModelSchema) -> Self {
        Self {
            table_name: schema.table_name,
            primary_key: schema.primary_key,
            columns: schema.columns,
            relationships: schema.relationships,
        }
    }
}

fn project_relationships(relationships: &[Relationship]) -> Vec<RelationshipProjection> {
    relationships
        .iter()
        .filter(|rel| rel.name != TRANSACTION_RELATIONSHIP && !rel.collection)
        .map(|rel| RelationshipProjection {
            relationship: rel.name.clone(),
            accessor: format!("{}{}", rel.name, RELATIONSHIP_IDENTIFIER_SUFFIX),
        })
        .collect()
}

/// Keeps only the fields `model` knows about; everything else is dropped.
///
/// Patches may come from remote or client-authored records, so this is the
/// gate between untyped payloads and typed entities.
pub fn relationships_in(fields: &FieldMap, model: &ModelSchema) -> FieldMap {
    fields
        .iter()
        .filter(|(name, _)| model.accepts_field(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
