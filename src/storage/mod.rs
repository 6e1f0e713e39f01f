pub mod engine;
pub mod entity;
pub mod journal;
pub mod memory;
pub mod persistence;
pub mod table;

pub use engine::Persistence;
pub use entity::Entity;
pub use journal::ActivityLog;
pub use memory::InMemoryStore;
pub use persistence::{SnapshotManager, SnapshotMetadata, StoreSnapshot};
pub use table::EntityTable;
