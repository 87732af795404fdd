use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::{
    CustomerRecord, JoinKind, LineItemRecord, OrderRecord, ProductRecord, Query, Result, Row,
    RowSourceError, ShipmentRecord, Table, Value,
    records::null_row,
    store::{POSTGRES_MAX_PARAMETERS, RowSource, UnitOfWork, Write, check_parameter_limit},
};

/// One executed statement, as recorded by [`InMemoryRowSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLogEntry {
    pub sql: String,
    pub parameters: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    customers: Vec<CustomerRecord>,
    products: Vec<ProductRecord>,
    shipments: Vec<ShipmentRecord>,
    orders: Vec<OrderRecord>,
    line_items: Vec<LineItemRecord>,
}

impl Tables {
    fn rows(&self, table: Table) -> Vec<Row> {
        match table {
            Table::Customers => self.customers.iter().map(CustomerRecord::to_row).collect(),
            Table::Products => self.products.iter().map(ProductRecord::to_row).collect(),
            Table::Shipments => self.shipments.iter().map(ShipmentRecord::to_row).collect(),
            Table::Orders => self.orders.iter().map(OrderRecord::to_row).collect(),
            Table::LineItems => self.line_items.iter().map(LineItemRecord::to_row).collect(),
        }
    }

    fn max_id(&self, table: Table) -> i64 {
        let ids: Vec<i64> = match table {
            Table::Customers => self.customers.iter().map(|r| r.id.get()).collect(),
            Table::Products => self.products.iter().map(|r| r.id.get()).collect(),
            Table::Shipments => self.shipments.iter().map(|r| r.id.get()).collect(),
            Table::Orders => self.orders.iter().map(|r| r.id.get()).collect(),
            Table::LineItems => self.line_items.iter().map(|r| r.id.get()).collect(),
        };
        ids.into_iter().max().unwrap_or(0)
    }

    fn apply(&mut self, write: Write) -> Result<()> {
        match write {
            Write::InsertCustomer(record) => {
                if self.customers.iter().any(|c| c.id == record.id) {
                    return Err(duplicate(Table::Customers, record.id.get()));
                }
                self.customers.push(record);
            }
            Write::InsertProduct(record) => {
                if self.products.iter().any(|p| p.id == record.id) {
                    return Err(duplicate(Table::Products, record.id.get()));
                }
                check_product(&record)?;
                self.products.push(record);
            }
            Write::UpdateProduct(record) => {
                check_product(&record)?;
                let product = self
                    .products
                    .iter_mut()
                    .find(|p| p.id == record.id)
                    .ok_or_else(|| missing(Table::Products, record.id.get()))?;
                *product = record;
            }
            Write::AdjustProductStock { product_id, delta } => {
                let product = self
                    .products
                    .iter_mut()
                    .find(|p| p.id == product_id)
                    .ok_or_else(|| missing(Table::Products, product_id.get()))?;
                let stock_quantity = product.stock_quantity + delta;
                if stock_quantity < 0 {
                    return Err(RowSourceError::WriteConflict {
                        table: Table::Products,
                        id: product_id.get(),
                        reason: format!(
                            "stock {} cannot be adjusted by {delta}",
                            product.stock_quantity
                        ),
                    });
                }
                product.stock_quantity = stock_quantity;
            }
            Write::InsertShipment(record) => {
                if self.shipments.iter().any(|s| s.id == record.id) {
                    return Err(duplicate(Table::Shipments, record.id.get()));
                }
                self.shipments.push(record);
            }
            Write::UpdateShipmentStatus {
                shipment_id,
                from,
                to,
            } => {
                let shipment = self
                    .shipments
                    .iter_mut()
                    .find(|s| s.id == shipment_id)
                    .ok_or_else(|| missing(Table::Shipments, shipment_id.get()))?;
                if shipment.status != from {
                    return Err(stale_status(
                        Table::Shipments,
                        shipment_id.get(),
                        &shipment.status,
                        &from,
                    ));
                }
                shipment.status = to;
            }
            Write::InsertOrder(record) => {
                if self.orders.iter().any(|o| o.id == record.id) {
                    return Err(duplicate(Table::Orders, record.id.get()));
                }
                if !self.customers.iter().any(|c| c.id == record.customer_id) {
                    return Err(missing(Table::Customers, record.customer_id.get()));
                }
                if !self.shipments.iter().any(|s| s.id == record.shipment_id) {
                    return Err(missing(Table::Shipments, record.shipment_id.get()));
                }
                if self
                    .orders
                    .iter()
                    .any(|o| o.shipment_id == record.shipment_id)
                {
                    return Err(RowSourceError::ConstraintViolation(format!(
                        "shipment {} already belongs to an order",
                        record.shipment_id
                    )));
                }
                self.orders.push(record);
            }
            Write::UpdateOrderStatus { order_id, from, to } => {
                let order = self
                    .orders
                    .iter_mut()
                    .find(|o| o.id == order_id)
                    .ok_or_else(|| missing(Table::Orders, order_id.get()))?;
                if order.status != from {
                    return Err(stale_status(
                        Table::Orders,
                        order_id.get(),
                        &order.status,
                        &from,
                    ));
                }
                order.status = to;
            }
            Write::InsertLineItem(record) => {
                if self.line_items.iter().any(|li| li.id == record.id) {
                    return Err(duplicate(Table::LineItems, record.id.get()));
                }
                if !self.orders.iter().any(|o| o.id == record.order_id) {
                    return Err(missing(Table::Orders, record.order_id.get()));
                }
                if !self.products.iter().any(|p| p.id == record.product_id) {
                    return Err(missing(Table::Products, record.product_id.get()));
                }
                if record.quantity <= 0 || record.unit_price < 0 {
                    return Err(RowSourceError::ConstraintViolation(format!(
                        "line item {} has quantity {} and unit price {}",
                        record.id, record.quantity, record.unit_price
                    )));
                }
                self.line_items.push(record);
            }
        }
        Ok(())
    }
}

fn duplicate(table: Table, id: i64) -> RowSourceError {
    RowSourceError::ConstraintViolation(format!("duplicate key {id} in {table}"))
}

fn missing(table: Table, id: i64) -> RowSourceError {
    RowSourceError::ConstraintViolation(format!("{table} row {id} does not exist"))
}

fn stale_status(table: Table, id: i64, found: &str, expected: &str) -> RowSourceError {
    RowSourceError::WriteConflict {
        table,
        id,
        reason: format!("status is {found}, expected {expected}"),
    }
}

fn check_product(record: &ProductRecord) -> Result<()> {
    if record.stock_quantity < 0 || record.price < 0 {
        return Err(RowSourceError::ConstraintViolation(format!(
            "product {} has price {} and stock {}",
            record.id, record.price, record.stock_quantity
        )));
    }
    Ok(())
}

/// Evaluates a query against the tables with nested-loop joins.
///
/// Joined rows keep the driving table's insertion order, then the joined
/// table's insertion order, which is what an unordered scan would return.
fn execute(tables: &Tables, query: &Query) -> Vec<Row> {
    let select = query.select();
    let mut rows = tables.rows(select.from);

    for join in &select.joins {
        let (own, parent) = join.table.join_key();
        let candidates = tables.rows(join.table);
        let mut joined = Vec::with_capacity(rows.len());

        for row in rows {
            let key = row.get(parent.alias()).cloned().unwrap_or(Value::Null);
            let mut matched = false;
            for candidate in &candidates {
                if candidate
                    .get(own.alias())
                    .is_some_and(|value| value.sql_eq(&key))
                {
                    let mut combined = row.clone();
                    combined.extend(candidate.clone());
                    joined.push(combined);
                    matched = true;
                }
            }
            if !matched && join.kind == JoinKind::Left {
                let mut padded = row;
                padded.extend(null_row(join.table));
                joined.push(padded);
            }
        }
        rows = joined;
    }

    rows.retain(|row| select.filters.iter().all(|filter| filter.matches(row)));

    if !select.order_by.is_empty() {
        rows.sort_by(|a, b| {
            for column in &select.order_by {
                let left = a.get(column.alias()).unwrap_or(&Value::Null);
                let right = b.get(column.alias()).unwrap_or(&Value::Null);
                match left.sort_cmp(right) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        });
    }

    let names: Vec<&str> = query.columns().iter().map(|column| column.alias()).collect();
    rows.into_iter()
        .skip(select.offset.unwrap_or(0))
        .take(select.limit.unwrap_or(usize::MAX))
        .map(|row| row.project(&names))
        .collect()
}

/// In-memory row source for tests, demos and benchmarks.
///
/// Evaluates the same [`Query`] values the PostgreSQL store renders, logs
/// every executed statement and enforces the same parameter limit.
#[derive(Clone)]
pub struct InMemoryRowSource {
    tables: Arc<RwLock<Tables>>,
    sequences: Arc<Mutex<HashMap<Table, i64>>>,
    log: Arc<RwLock<Vec<QueryLogEntry>>>,
    parameter_limit: usize,
}

impl Default for InMemoryRowSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRowSource {
    /// Creates an empty store with PostgreSQL's parameter limit.
    pub fn new() -> Self {
        Self {
            tables: Arc::default(),
            sequences: Arc::default(),
            log: Arc::default(),
            parameter_limit: POSTGRES_MAX_PARAMETERS,
        }
    }

    /// Lowers the number of parameters a single statement may bind.
    pub fn with_parameter_limit(mut self, limit: usize) -> Self {
        self.parameter_limit = limit;
        self
    }

    /// Returns the parameter limit.
    pub fn parameter_limit(&self) -> usize {
        self.parameter_limit
    }

    /// Returns every statement executed since the last [`clear_log`](Self::clear_log).
    pub async fn query_log(&self) -> Vec<QueryLogEntry> {
        self.log.read().await.clone()
    }

    /// Forgets previously executed statements.
    pub async fn clear_log(&self) {
        self.log.write().await.clear();
    }

    /// Returns the number of rows stored in `table`.
    pub async fn row_count(&self, table: Table) -> usize {
        let tables = self.tables.read().await;
        match table {
            Table::Customers => tables.customers.len(),
            Table::Products => tables.products.len(),
            Table::Shipments => tables.shipments.len(),
            Table::Orders => tables.orders.len(),
            Table::LineItems => tables.line_items.len(),
        }
    }

    /// Clears all tables, sequences and the statement log.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
        self.sequences.lock().await.clear();
        self.log.write().await.clear();
    }
}

#[async_trait]
impl RowSource for InMemoryRowSource {
    async fn fetch_all(&self, query: &Query) -> Result<Vec<Row>> {
        check_parameter_limit(query, self.parameter_limit)?;

        let rows = {
            let tables = self.tables.read().await;
            execute(&tables, query)
        };

        tracing::debug!(
            sql = query.sql(),
            parameters = query.parameter_count(),
            rows = rows.len(),
            "executed query"
        );
        metrics::counter!("row_source_queries_total", "backend" => "memory").increment(1);

        self.log.write().await.push(QueryLogEntry {
            sql: query.sql().to_string(),
            parameters: query.parameter_count(),
            rows: rows.len(),
        });
        Ok(rows)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryRowSource {
    async fn next_id(&self, table: Table) -> Result<i64> {
        let stored = self.tables.read().await.max_id(table);
        let mut sequences = self.sequences.lock().await;
        let sequence = sequences.entry(table).or_insert(0);
        *sequence = (*sequence).max(stored) + 1;
        Ok(*sequence)
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<()> {
        let count = writes.len();
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        for write in writes {
            staged.apply(write)?;
        }
        *tables = staged;

        tracing::debug!(writes = count, "committed unit of work");
        metrics::counter!("row_source_commits_total", "backend" => "memory").increment(1);
        Ok(())
    }
}
