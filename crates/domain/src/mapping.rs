//! Conversions between entities and row-source rows/records.

use std::str::FromStr;

use common::{CustomerId, LineItemId, OrderId, ProductId, ShipmentId};
use row_source::{
    Column, CustomerRecord, LineItemRecord, OrderRecord, ProductRecord, Result, Row,
    RowSourceError, ShipmentRecord,
};

use crate::{Address, Customer, LineItem, Money, Order, Product, Shipment};

fn unsigned(row: &Row, column: Column) -> Result<u32> {
    let value: i64 = row.column(column)?;
    u32::try_from(value).map_err(|e| RowSourceError::invalid_value(column.alias(), e))
}

fn status<T>(row: &Row, column: Column) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value: String = row.column(column)?;
    value
        .parse()
        .map_err(|e| RowSourceError::invalid_value(column.alias(), e))
}

pub fn customer_from_row(row: &Row) -> Result<Customer> {
    Ok(Customer::new(
        CustomerId::new(row.column(Column::CustomerId)?),
        row.column::<String>(Column::CustomerName)?,
        Address::new(
            row.column::<String>(Column::CustomerCity)?,
            row.column::<String>(Column::CustomerStreet)?,
            row.column::<String>(Column::CustomerZipcode)?,
        ),
    ))
}

pub fn product_from_row(row: &Row) -> Result<Product> {
    Product::new(
        ProductId::new(row.column(Column::ProductId)?),
        row.column::<String>(Column::ProductName)?,
        Money::new(row.column(Column::ProductPrice)?),
        unsigned(row, Column::ProductStock)?,
    )
    .map_err(|e| RowSourceError::invalid_value(Column::ProductPrice.alias(), e))
}

pub fn shipment_from_row(row: &Row) -> Result<Shipment> {
    Ok(Shipment::from_parts(
        ShipmentId::new(row.column(Column::ShipmentId)?),
        Address::new(
            row.column::<String>(Column::ShipmentCity)?,
            row.column::<String>(Column::ShipmentStreet)?,
            row.column::<String>(Column::ShipmentZipcode)?,
        ),
        status(row, Column::ShipmentStatus)?,
    ))
}

pub fn line_item_from_row(row: &Row) -> Result<LineItem> {
    Ok(LineItem::from_parts(
        LineItemId::new(row.column(Column::LineItemId)?),
        OrderId::new(row.column(Column::LineItemOrderId)?),
        ProductId::new(row.column(Column::LineItemProductId)?),
        Money::new(row.column(Column::LineItemUnitPrice)?),
        unsigned(row, Column::LineItemQuantity)?,
    ))
}

/// Rebuilds an order from a row carrying order and shipment columns.
pub fn order_from_row(row: &Row, line_items: Vec<LineItem>) -> Result<Order> {
    Ok(Order::from_parts(
        OrderId::new(row.column(Column::OrderId)?),
        CustomerId::new(row.column(Column::OrderCustomerId)?),
        shipment_from_row(row)?,
        line_items,
        status(row, Column::OrderStatus)?,
        row.column(Column::OrderedAt)?,
    ))
}

pub fn customer_record(customer: &Customer) -> CustomerRecord {
    let address = customer.address();
    CustomerRecord {
        id: customer.id(),
        name: customer.name().to_string(),
        city: address.city.clone(),
        street: address.street.clone(),
        zipcode: address.zipcode.clone(),
    }
}

pub fn product_record(product: &Product) -> ProductRecord {
    ProductRecord {
        id: product.id(),
        name: product.name().to_string(),
        price: product.price().amount(),
        stock_quantity: i64::from(product.stock_quantity()),
    }
}

pub fn shipment_record(shipment: &Shipment) -> ShipmentRecord {
    let address = shipment.address();
    ShipmentRecord {
        id: shipment.id(),
        city: address.city.clone(),
        street: address.street.clone(),
        zipcode: address.zipcode.clone(),
        status: shipment.status().as_str().to_string(),
    }
}

pub fn order_record(order: &Order) -> OrderRecord {
    OrderRecord {
        id: order.id(),
        customer_id: order.customer_id(),
        shipment_id: order.shipment().id(),
        status: order.status().as_str().to_string(),
        ordered_at: order.ordered_at(),
    }
}

pub fn line_item_record(line: &LineItem) -> LineItemRecord {
    LineItemRecord {
        id: line.id(),
        order_id: line.order_id(),
        product_id: line.product_id(),
        unit_price: line.unit_price().amount(),
        quantity: i64::from(line.quantity()),
    }
}
