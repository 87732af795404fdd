//! Demo entry point.

use app::{AppError, Config, compare_strategies, seed};
use domain::OrderService;
use queries::OrderSearch;
use row_source::{InMemoryRowSource, PostgresRowSource, RowSource, UnitOfWork};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const SEED_ORDERS: usize = 250;

async fn run<S: RowSource + UnitOfWork + Clone>(source: S, config: &Config) -> Result<(), AppError> {
    let service = OrderService::new(source.clone());
    seed(&service, SEED_ORDERS).await?;

    let reports = compare_strategies(&source, config.loader_config(), &OrderSearch::all()).await?;
    for report in &reports {
        metrics::gauge!("order_loader_compared_queries", "strategy" => report.strategy.clone())
            .set(report.queries as f64);
        tracing::info!(
            strategy = %report.strategy,
            orders = report.orders,
            line_items = report.line_items,
            queries = report.queries,
            expected_queries = report.expected_queries,
            total = %report.total,
            consistent = report.consistent,
            capped = report.capped,
            "strategy compared"
        );
        if !report.consistent {
            tracing::warn!(strategy = %report.strategy, "strategy result differs from fetch join");
        }
    }

    let json = serde_json::to_string_pretty(&reports)
        .map_err(|e| AppError::Startup(format!("cannot render report: {e}")))?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::Startup(format!("failed to install Prometheus recorder: {e}")))?;

    // 3. Pick the store and run the comparison
    match &config.database_url {
        Some(url) => {
            tracing::info!("using PostgreSQL store");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .map_err(row_source::RowSourceError::from)?;
            let source = PostgresRowSource::new(pool);
            source.run_migrations().await?;
            run(source, &config).await?;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory store");
            run(InMemoryRowSource::new(), &config).await?;
        }
    }

    // 4. Dump collected metrics
    println!("{}", metrics_handle.render());
    Ok(())
}
