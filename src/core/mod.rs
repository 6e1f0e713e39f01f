pub mod error;
pub mod fields;
pub mod value;

pub use error::{ActivityError, DbError, Result};
pub use fields::FieldMap;
pub use value::{DataType, Value};
