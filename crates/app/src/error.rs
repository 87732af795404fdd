use domain::DomainError;
use queries::LoadError;
use row_source::RowSourceError;
use thiserror::Error;

/// Errors that stop the demo.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Row source error: {0}")]
    RowSource(#[from] RowSourceError),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Startup failed: {0}")]
    Startup(String),
}
