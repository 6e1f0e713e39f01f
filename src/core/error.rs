use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Entity {1} not found in table '{0}'")]
    EntityNotFound(String, i64),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/0 error: {0}")]
    IoError(String),

    #[error(transparent)]
    Activity(#[from] ActivityError),
}

impl DbError {
    /// True when the error is a uniqueness conflict on the given column.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        match self {
            Self::ConstraintViolation(message) => {
                message.contains("Unique constraint") && message.contains(&format!("'{}'", column))
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// Structured replay error, keyed by the offending activity field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityError {
    errors: BTreeMap<String, Vec<String>>,
}

impl ActivityError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut error = Self::new();
        error.add_error(field, message);
        error
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn messages_for(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ActivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Activity error:")?;
        for (field, messages) in &self.errors {
            write!(f, " {}: {};", field, messages.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ActivityError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_error_collects_messages_per_field() {
        let mut error = ActivityError::new();
        error.add_error("tableName", "model from offer not found");
        error.add_error("tableName", "second");

        assert_eq!(error.messages_for("tableName").len(), 2);
        assert!(error.messages_for("verb").is_empty());
        assert!(error.to_string().contains("model from offer not found"));
    }

    #[test]
    fn test_unique_violation_detection() {
        let err = DbError::ConstraintViolation(
            "Unique constraint violation: Column 'activityIdentifier' already contains value x"
                .to_string(),
        );
        assert!(err.is_unique_violation_on("activityIdentifier"));
        assert!(!err.is_unique_violation_on("id"));
        assert!(!DbError::TableNotFound("user".into()).is_unique_violation_on("id"));
    }
}
