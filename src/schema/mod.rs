pub mod model;
pub mod registry;

pub use model::{
    ACTIVITY_IDENTIFIER_FIELD, Column, DEFAULT_PRIMARY_KEY, ModelSchema,
    RELATIONSHIP_IDENTIFIER_SUFFIX, Relationship, RelationshipProjection, SchemaDefinition,
    TRANSACTION_RELATIONSHIP, relationships_in,
};
pub use registry::SchemaRegistry;
