use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{
    CustomerRecord, LineItemRecord, OrderRecord, ProductRecord, Query, Result, Row,
    ShipmentRecord, Table,
};
use common::{OrderId, ProductId, ShipmentId};

/// Largest number of bind parameters a single PostgreSQL statement accepts.
pub const POSTGRES_MAX_PARAMETERS: usize = 65_535;

/// A stream of rows, in the order the store produced them.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row>> + Send + 'a>>;

/// Executes queries against a relational store.
///
/// Rows come back in the order the query asks for; without an `ORDER BY`
/// the order is whatever the store yields.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Executes the query and buffers every row.
    async fn fetch_all(&self, query: &Query) -> Result<Vec<Row>>;

    /// Executes the query and streams rows as they arrive.
    ///
    /// The default implementation buffers through [`RowSource::fetch_all`].
    async fn fetch<'a>(&'a self, query: &'a Query) -> Result<RowStream<'a>> {
        let rows = self.fetch_all(query).await?;
        Ok(Box::pin(futures_util::stream::iter(rows.into_iter().map(Ok))))
    }
}

#[async_trait]
impl<T: RowSource + ?Sized> RowSource for &T {
    async fn fetch_all(&self, query: &Query) -> Result<Vec<Row>> {
        (**self).fetch_all(query).await
    }

    async fn fetch<'a>(&'a self, query: &'a Query) -> Result<RowStream<'a>> {
        (**self).fetch(query).await
    }
}

#[async_trait]
impl<T: RowSource + ?Sized> RowSource for Arc<T> {
    async fn fetch_all(&self, query: &Query) -> Result<Vec<Row>> {
        (**self).fetch_all(query).await
    }

    async fn fetch<'a>(&'a self, query: &'a Query) -> Result<RowStream<'a>> {
        (**self).fetch(query).await
    }
}

/// A single row change applied by [`UnitOfWork::commit`].
///
/// Stock adjustments and status updates are guarded: they are applied
/// against the row as it is at commit time and fail with
/// [`RowSourceError::WriteConflict`](crate::RowSourceError::WriteConflict)
/// when the guard no longer holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    InsertCustomer(CustomerRecord),
    InsertProduct(ProductRecord),
    UpdateProduct(ProductRecord),
    /// Adds `delta` to the stock, refusing to take it below zero.
    AdjustProductStock {
        product_id: ProductId,
        delta: i64,
    },
    InsertShipment(ShipmentRecord),
    /// Moves the shipment from status `from` to `to`.
    UpdateShipmentStatus {
        shipment_id: ShipmentId,
        from: String,
        to: String,
    },
    InsertOrder(OrderRecord),
    /// Moves the order from status `from` to `to`.
    UpdateOrderStatus {
        order_id: OrderId,
        from: String,
        to: String,
    },
    InsertLineItem(LineItemRecord),
}

impl Write {
    /// Returns the table this write touches.
    pub fn table(&self) -> Table {
        match self {
            Write::InsertCustomer(_) => Table::Customers,
            Write::InsertProduct(_) | Write::UpdateProduct(_) | Write::AdjustProductStock { .. } => {
                Table::Products
            }
            Write::InsertShipment(_) | Write::UpdateShipmentStatus { .. } => Table::Shipments,
            Write::InsertOrder(_) | Write::UpdateOrderStatus { .. } => Table::Orders,
            Write::InsertLineItem(_) => Table::LineItems,
        }
    }

    /// Returns the id of the row a guarded write checks.
    pub fn guarded_id(&self) -> Option<i64> {
        match self {
            Write::AdjustProductStock { product_id, .. } => Some(product_id.get()),
            Write::UpdateShipmentStatus { shipment_id, .. } => Some(shipment_id.get()),
            Write::UpdateOrderStatus { order_id, .. } => Some(order_id.get()),
            _ => None,
        }
    }
}

/// Transactional write side of a store.
///
/// Writes in one commit are applied atomically, in order: either every
/// write succeeds or none is visible.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Reserves the next primary key for `table`.
    async fn next_id(&self, table: Table) -> Result<i64>;

    /// Applies all writes in one transaction.
    async fn commit(&self, writes: Vec<Write>) -> Result<()>;
}

#[async_trait]
impl<T: UnitOfWork + ?Sized> UnitOfWork for Arc<T> {
    async fn next_id(&self, table: Table) -> Result<i64> {
        (**self).next_id(table).await
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<()> {
        (**self).commit(writes).await
    }
}

/// Rejects a query that binds more parameters than the store accepts.
pub(crate) fn check_parameter_limit(query: &Query, limit: usize) -> Result<()> {
    let count = query.parameter_count();
    if count > limit {
        return Err(crate::RowSourceError::TooManyParameters { count, limit });
    }
    Ok(())
}
