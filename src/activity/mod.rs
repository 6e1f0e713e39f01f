pub mod query;
pub mod record;
pub mod schema;

pub use query::{ActivityOrder, ActivityQuery};
pub use record::{Activity, ActivityTransaction, Verb};
pub use schema::{ActivitySchema, DEFAULT_ACTIVITY_TABLE};
