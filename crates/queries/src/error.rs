use row_source::RowSourceError;
use thiserror::Error;

use crate::{Relation, Strategy};

/// A loader was asked to do something structurally unsound. Raised before
/// any query is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("Root limit must be at least 1")]
    InvalidRootLimit,

    #[error("Parameter limit must be at least 1")]
    InvalidParameterLimit,

    /// Joining two collections in one query multiplies their rows together.
    #[error("Cannot fetch-join more than one collection in a single query: {relations:?}")]
    MultipleCollectionFetch { relations: Vec<Relation> },

    /// The plan does not load a relation the order view needs.
    #[error("Fetch plan is missing the {0} relation")]
    MissingRelation(Relation),

    /// A limit or offset would count duplicated join rows instead of orders.
    #[error("{strategy} cannot be combined with a limit or offset")]
    PaginationUnsupported { strategy: Strategy },
}

/// Errors that can occur while loading orders.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The request was rejected before touching the store.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The store failed or returned rows that could not be decoded.
    #[error("Row source error: {0}")]
    RowSource(#[from] RowSourceError),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;
