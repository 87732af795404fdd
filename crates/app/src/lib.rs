//! Demo application for the order loaders.
//!
//! Seeds a small shop through the write path, then loads the same orders
//! with every strategy and reports how many queries each one took.

pub mod config;
pub mod error;

use domain::{Address, DeliveryStatus, Money, OrderLine, OrderService};
use queries::{LoaderConfig, OrderLoader, OrderSearch, OrderView, Strategy};
use row_source::{CountingRowSource, RowSource, UnitOfWork};
use serde::Serialize;

pub use config::Config;
pub use error::AppError;

/// Label of the one-query-per-order baseline in reports.
pub const PER_ROOT_BASELINE: &str = "per_root";

/// Seeds customers, products and `orders` orders.
///
/// Every fifth order is cancelled and every fourth is in transit. Does
/// nothing when the store already has customers. Returns the number of
/// orders placed.
#[tracing::instrument(skip(service))]
pub async fn seed<S: RowSource + UnitOfWork>(
    service: &OrderService<S>,
    orders: usize,
) -> Result<usize, AppError> {
    if !service.find_customers().await?.is_empty() {
        tracing::info!("store already seeded, skipping");
        return Ok(0);
    }

    let customers = [
        ("Kim", Address::new("Seoul", "Main", "04524")),
        ("Lee", Address::new("Busan", "Harbor", "48058")),
        ("Park", Address::new("Incheon", "Port", "22382")),
    ];
    let mut customer_ids = Vec::with_capacity(customers.len());
    for (name, address) in customers {
        customer_ids.push(service.register_customer(name, address).await?.id());
    }

    let catalog = [
        ("JPA Book", 20_000),
        ("Spring Book", 10_000),
        ("Rust Book", 40_000),
        ("SQL Book", 15_000),
    ];
    let mut product_ids = Vec::with_capacity(catalog.len());
    for (name, price) in catalog {
        let product = service.add_product(name, Money::new(price), 10_000).await?;
        product_ids.push(product.id());
    }

    for i in 0..orders {
        let customer = customer_ids[i % customer_ids.len()];
        let lines: Vec<OrderLine> = (0..=i % product_ids.len())
            .map(|offset| {
                let product = product_ids[(i + offset) % product_ids.len()];
                OrderLine::new(product, (offset as u32) + 1)
            })
            .collect();
        let order = service.place_order(customer, &lines).await?;

        if i % 5 == 4 {
            service.cancel_order(order.id()).await?;
        } else if i % 4 == 3 {
            service
                .advance_delivery(order.id(), DeliveryStatus::InTransit)
                .await?;
        }
    }

    tracing::info!(orders, "seeded shop");
    Ok(orders)
}

/// Outcome of loading the orders with one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyReport {
    pub strategy: String,
    pub orders: usize,
    pub line_items: usize,
    pub queries: usize,
    pub expected_queries: usize,

    /// Sum of every loaded order's total.
    pub total: Money,

    /// Whether the result equals the fetch-join result. Line items are
    /// ignored for strategies that do not load them. Root-limited
    /// strategies are compared with the first `root_limit` orders only.
    pub consistent: bool,

    /// Whether the root limit cut this strategy short of every match.
    pub capped: bool,
}

impl StrategyReport {
    fn new(strategy: &str, orders: &[OrderView], queries: usize, expected_queries: usize) -> Self {
        Self {
            strategy: strategy.to_string(),
            orders: orders.len(),
            line_items: orders.iter().map(|order| order.line_items.len()).sum(),
            queries,
            expected_queries,
            total: orders.iter().map(OrderView::total_price).sum(),
            consistent: false,
            capped: false,
        }
    }
}

fn without_line_items(orders: &[OrderView]) -> Vec<OrderView> {
    orders
        .iter()
        .cloned()
        .map(|mut order| {
            order.line_items.clear();
            order
        })
        .collect()
}

/// Loads the orders matching `search` with every strategy and with the
/// per-order baseline, counting the queries each one issues.
///
/// `search` must not carry a limit; the wide strategies reject it. The
/// root-driven strategies stop at `config.root_limit` orders while the wide
/// ones load every match, so those are checked against the matching prefix
/// of the fetch-join result and flagged as capped.
pub async fn compare_strategies<S: RowSource>(
    source: &S,
    config: LoaderConfig,
    search: &OrderSearch,
) -> Result<Vec<StrategyReport>, AppError> {
    let counting = CountingRowSource::new(source);
    let loader = OrderLoader::with_config(&counting, config)?;

    let mut results = Vec::with_capacity(Strategy::ALL.len() + 1);
    for strategy in Strategy::ALL {
        counting.reset();
        let orders = loader.load(strategy, search, None).await?;
        let expected = strategy.expected_round_trips(orders.len(), config.batch_size);
        results.push((
            strategy.loads_line_items(),
            strategy.supports_pagination(),
            StrategyReport::new(strategy.as_str(), &orders, counting.stats().queries, expected),
            orders,
        ));
    }

    counting.reset();
    let roots = loader.load_roots(search, None).await?;
    let orders = loader.attach_children_per_root(roots).await?;
    results.push((
        true,
        true,
        StrategyReport::new(
            PER_ROOT_BASELINE,
            &orders,
            counting.stats().queries,
            1 + orders.len(),
        ),
        orders,
    ));

    let reference = results
        .iter()
        .find(|(_, _, report, _)| report.strategy == Strategy::FetchJoin.as_str())
        .map(|(_, _, _, orders)| orders.clone())
        .unwrap_or_default();
    let reference_roots = without_line_items(&reference);
    let root_limit = config.root_limit.min(reference.len());

    Ok(results
        .into_iter()
        .map(|(with_line_items, root_limited, mut report, orders)| {
            let expected = if with_line_items {
                &reference
            } else {
                &reference_roots
            };
            let expected = if root_limited {
                &expected[..root_limit]
            } else {
                &expected[..]
            };
            report.consistent = orders == expected;
            report.capped = root_limited && root_limit < reference.len();
            report
        })
        .collect())
}
