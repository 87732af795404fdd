//! Domain error types.

use row_source::RowSourceError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the row source.
    #[error("Row source error: {0}")]
    RowSource(#[from] RowSourceError),

    /// A business rule rejected the operation.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A customer with the same name is already registered.
    #[error("Customer already exists: {0}")]
    DuplicateCustomer(String),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        DomainError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
