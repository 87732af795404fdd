use row_source::RowSource;

use crate::{ConfigurationError, LoaderConfig, OrderSearch, OrderView, Result, Strategy};

/// Loads order aggregates from a row source.
///
/// The loader borrows the source for its own lifetime and never opens or
/// closes transactions; callers own the session. Each strategy lives in its
/// own module:
/// - roots with to-one relations: [`OrderLoader::load_roots`]
/// - batched children: [`OrderLoader::attach_children_batched`]
/// - single wide join: [`OrderLoader::load_with_fetch_join`]
/// - flat projection grouped in memory: [`OrderLoader::load_flat_and_group`]
pub struct OrderLoader<'s, S: ?Sized> {
    pub(crate) source: &'s S,
    pub(crate) config: LoaderConfig,
}

impl<'s, S: RowSource + ?Sized> OrderLoader<'s, S> {
    /// Creates a loader with the default configuration.
    pub fn new(source: &'s S) -> Self {
        Self {
            source,
            config: LoaderConfig::default(),
        }
    }

    /// Creates a loader with a validated configuration.
    pub fn with_config(source: &'s S, config: LoaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { source, config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads orders with the given strategy.
    ///
    /// `offset` is only accepted by strategies that paginate on distinct roots.
    #[tracing::instrument(skip(self, search, strategy), fields(strategy = %strategy))]
    pub async fn load(
        &self,
        strategy: Strategy,
        search: &OrderSearch,
        offset: Option<usize>,
    ) -> Result<Vec<OrderView>> {
        if offset.is_some() && !strategy.supports_pagination() {
            return Err(ConfigurationError::PaginationUnsupported { strategy }.into());
        }

        match strategy {
            Strategy::RootsOnly => self.load_roots(search, offset).await,
            Strategy::RootsThenBatched => {
                let roots = self.load_roots(search, offset).await?;
                self.attach_children_batched(roots, self.config.batch_size)
                    .await
            }
            Strategy::FetchJoin => self.load_with_fetch_join(search).await,
            Strategy::FlatGrouped => self.load_flat_and_group(search).await,
        }
    }
}

/// Records one executed query for `strategy`.
pub(crate) fn record_query(strategy: &'static str, rows: usize) {
    tracing::debug!(strategy, rows, "loader query finished");
    metrics::counter!("order_loader_queries_total", "strategy" => strategy).increment(1);
    metrics::counter!("order_loader_rows_total", "strategy" => strategy).increment(rows as u64);
}
