//! Plain table records, one per schema table.
//!
//! Records are what the write side stores; [`Row`]s are what the read side
//! gets back. `to_row` renders a record with the schema's select aliases.

use chrono::{DateTime, Utc};

use crate::{Column, Row, Table};
use common::{CustomerId, LineItemId, OrderId, ProductId, ShipmentId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: String,
    pub city: String,
    pub street: String,
    pub zipcode: String,
}

impl CustomerRecord {
    pub fn to_row(&self) -> Row {
        Row::new()
            .with(Column::CustomerId.alias(), self.id)
            .with(Column::CustomerName.alias(), self.name.as_str())
            .with(Column::CustomerCity.alias(), self.city.as_str())
            .with(Column::CustomerStreet.alias(), self.street.as_str())
            .with(Column::CustomerZipcode.alias(), self.zipcode.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub price: i64,
    pub stock_quantity: i64,
}

impl ProductRecord {
    pub fn to_row(&self) -> Row {
        Row::new()
            .with(Column::ProductId.alias(), self.id)
            .with(Column::ProductName.alias(), self.name.as_str())
            .with(Column::ProductPrice.alias(), self.price)
            .with(Column::ProductStock.alias(), self.stock_quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentRecord {
    pub id: ShipmentId,
    pub city: String,
    pub street: String,
    pub zipcode: String,
    pub status: String,
}

impl ShipmentRecord {
    pub fn to_row(&self) -> Row {
        Row::new()
            .with(Column::ShipmentId.alias(), self.id)
            .with(Column::ShipmentCity.alias(), self.city.as_str())
            .with(Column::ShipmentStreet.alias(), self.street.as_str())
            .with(Column::ShipmentZipcode.alias(), self.zipcode.as_str())
            .with(Column::ShipmentStatus.alias(), self.status.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub shipment_id: ShipmentId,
    pub status: String,
    pub ordered_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn to_row(&self) -> Row {
        Row::new()
            .with(Column::OrderId.alias(), self.id)
            .with(Column::OrderCustomerId.alias(), self.customer_id)
            .with(Column::OrderShipmentId.alias(), self.shipment_id)
            .with(Column::OrderStatus.alias(), self.status.as_str())
            .with(Column::OrderedAt.alias(), self.ordered_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemRecord {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub unit_price: i64,
    pub quantity: i64,
}

impl LineItemRecord {
    pub fn to_row(&self) -> Row {
        Row::new()
            .with(Column::LineItemId.alias(), self.id)
            .with(Column::LineItemOrderId.alias(), self.order_id)
            .with(Column::LineItemProductId.alias(), self.product_id)
            .with(Column::LineItemUnitPrice.alias(), self.unit_price)
            .with(Column::LineItemQuantity.alias(), self.quantity)
    }
}

/// Renders a row of `NULL`s for every column of `table`, used to pad
/// unmatched left joins.
pub(crate) fn null_row(table: Table) -> Row {
    let mut row = Row::new();
    for column in table.columns() {
        row.push(column.alias(), crate::Value::Null);
    }
    row
}
