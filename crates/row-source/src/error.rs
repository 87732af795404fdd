use thiserror::Error;

use crate::Table;

/// Errors that can occur when querying or writing through a row source.
#[derive(Debug, Error)]
pub enum RowSourceError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The query was rejected while it was being built.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The statement binds more parameters than the store accepts.
    #[error("Statement binds {count} parameters, the store accepts at most {limit}")]
    TooManyParameters { count: usize, limit: usize },

    /// A row did not contain the requested column.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A column held a value of a different type than requested.
    #[error("Type mismatch for column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A column held a value of the right type that could not be interpreted.
    #[error("Invalid value in column {column}: {message}")]
    InvalidValue { column: String, message: String },

    /// The database returned a column type this crate does not decode.
    #[error("Unsupported type {type_name} for column {column}")]
    UnsupportedColumnType { column: String, type_name: String },

    /// A write violated a key, reference or check constraint.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A guarded write found its row changed since it was read.
    #[error("Write conflict on {table} row {id}: {reason}")]
    WriteConflict {
        table: Table,
        id: i64,
        reason: String,
    },
}

impl RowSourceError {
    /// Builds an [`RowSourceError::InvalidValue`] for `column`.
    pub fn invalid_value(column: impl Into<String>, message: impl ToString) -> Self {
        RowSourceError::InvalidValue {
            column: column.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for row source operations.
pub type Result<T> = std::result::Result<T, RowSourceError>;
