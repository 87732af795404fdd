//! Decoding of the root and child projections shared by the root, batched
//! and flat loaders.

use chrono::{DateTime, Utc};
use common::{CustomerId, LineItemId, OrderId, ProductId};
use domain::mapping::shipment_from_row;
use domain::{Money, OrderStatus};
use row_source::{Column, Result, Row, RowSourceError};

use crate::view::{DeliveryView, LineItemView, OrderView};

/// Order columns plus the to-one customer name and shipment.
pub(crate) const ROOT_COLUMNS: &[Column] = &[
    Column::OrderId,
    Column::OrderCustomerId,
    Column::OrderStatus,
    Column::OrderedAt,
    Column::CustomerName,
    Column::ShipmentId,
    Column::ShipmentCity,
    Column::ShipmentStreet,
    Column::ShipmentZipcode,
    Column::ShipmentStatus,
];

/// Line item columns plus the product's name and price.
pub(crate) const CHILD_COLUMNS: &[Column] = &[
    Column::LineItemId,
    Column::LineItemOrderId,
    Column::LineItemProductId,
    Column::ProductName,
    Column::ProductPrice,
    Column::LineItemUnitPrice,
    Column::LineItemQuantity,
];

/// Decodes the root columns into an order with no line items.
pub(crate) fn decode_root(row: &Row) -> Result<OrderView> {
    let status: String = row.column(Column::OrderStatus)?;
    let status: OrderStatus = status
        .parse()
        .map_err(|e| RowSourceError::invalid_value(Column::OrderStatus.alias(), e))?;
    let ordered_at: DateTime<Utc> = row.column(Column::OrderedAt)?;

    Ok(OrderView {
        order_id: OrderId::new(row.column(Column::OrderId)?),
        customer_id: CustomerId::new(row.column(Column::OrderCustomerId)?),
        customer_name: row.column(Column::CustomerName)?,
        ordered_at,
        status,
        delivery: DeliveryView::from(&shipment_from_row(row)?),
        line_items: Vec::new(),
    })
}

/// Decodes the child columns. Returns `None` for the null side of a left join.
pub(crate) fn decode_child(row: &Row) -> Result<Option<LineItemView>> {
    let Some(id) = row.column::<Option<i64>>(Column::LineItemId)? else {
        return Ok(None);
    };
    let quantity: i64 = row.column(Column::LineItemQuantity)?;
    let quantity = u32::try_from(quantity)
        .map_err(|e| RowSourceError::invalid_value(Column::LineItemQuantity.alias(), e))?;

    Ok(Some(LineItemView {
        line_item_id: LineItemId::new(id),
        order_id: OrderId::new(row.column(Column::LineItemOrderId)?),
        product_id: ProductId::new(row.column(Column::LineItemProductId)?),
        product_name: row.column(Column::ProductName)?,
        product_price: Money::new(row.column(Column::ProductPrice)?),
        unit_price: Money::new(row.column(Column::LineItemUnitPrice)?),
        quantity,
    }))
}

#[cfg(test)]
mod tests {
    use row_source::Value;

    use super::*;

    fn child_row(quantity: i64) -> Row {
        Row::new()
            .with(Column::LineItemId.alias(), 7_i64)
            .with(Column::LineItemOrderId.alias(), 1_i64)
            .with(Column::LineItemProductId.alias(), 3_i64)
            .with(Column::ProductName.alias(), "Book A")
            .with(Column::ProductPrice.alias(), 5500_i64)
            .with(Column::LineItemUnitPrice.alias(), 5000_i64)
            .with(Column::LineItemQuantity.alias(), quantity)
    }

    #[test]
    fn test_decode_child() {
        let line = decode_child(&child_row(2)).unwrap().unwrap();
        assert_eq!(line.line_item_id, LineItemId::new(7));
        assert_eq!(line.product_name, "Book A");
        assert_eq!(line.unit_price, Money::new(5000));
        assert_eq!(line.product_price, Money::new(5500));
        assert_eq!(line.total_price(), Money::new(10000));
    }

    #[test]
    fn test_null_child_is_none() {
        let row = Row::new().with(Column::LineItemId.alias(), Value::Null);
        assert_eq!(decode_child(&row).unwrap(), None);
    }

    #[test]
    fn test_negative_quantity_is_invalid() {
        assert!(matches!(
            decode_child(&child_row(-1)),
            Err(RowSourceError::InvalidValue { column, .. }) if column == "quantity"
        ));
    }
}
