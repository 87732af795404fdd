use row_source::POSTGRES_MAX_PARAMETERS;

use crate::ConfigurationError;

/// Tuning knobs for the order loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Number of order keys per child `IN` list.
    pub batch_size: usize,

    /// Upper bound on roots returned by one root query.
    pub root_limit: usize,

    /// Bind-parameter ceiling of the store. Child chunks never exceed it.
    pub max_parameters: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            root_limit: 1000,
            max_parameters: POSTGRES_MAX_PARAMETERS,
        }
    }
}

impl LoaderConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_root_limit(mut self, root_limit: usize) -> Self {
        self.root_limit = root_limit;
        self
    }

    pub fn with_max_parameters(mut self, max_parameters: usize) -> Self {
        self.max_parameters = max_parameters;
        self
    }

    /// Checks that every knob is usable.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.batch_size == 0 {
            return Err(ConfigurationError::InvalidBatchSize);
        }
        if self.root_limit == 0 {
            return Err(ConfigurationError::InvalidRootLimit);
        }
        if self.max_parameters == 0 {
            return Err(ConfigurationError::InvalidParameterLimit);
        }
        Ok(())
    }

    /// Returns the number of keys per child query for `batch_size`.
    pub fn chunk_size(&self, batch_size: usize) -> Result<usize, ConfigurationError> {
        if batch_size == 0 {
            return Err(ConfigurationError::InvalidBatchSize);
        }
        Ok(batch_size.min(self.max_parameters.max(1)))
    }
}
