//! The nested order shape every loading strategy returns.

use chrono::{DateTime, Utc};
use common::{CustomerId, LineItemId, OrderId, ProductId, ShipmentId};
use domain::{
    Address, Customer, DeliveryStatus, LineItem, Money, Order, OrderStatus, Product, Shipment,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryView {
    pub shipment_id: ShipmentId,
    pub address: Address,
    pub status: DeliveryStatus,
}

impl From<&Shipment> for DeliveryView {
    fn from(shipment: &Shipment) -> Self {
        Self {
            shipment_id: shipment.id(),
            address: shipment.address().clone(),
            status: shipment.status(),
        }
    }
}

/// A line item with its product resolved.
///
/// `unit_price` is the price captured when the order was placed;
/// `product_price` is the catalog price at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemView {
    pub line_item_id: LineItemId,

    /// Key of the owning order. Read-only; not a back-reference.
    pub order_id: OrderId,

    pub product_id: ProductId,
    pub product_name: String,
    pub product_price: Money,
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineItemView {
    pub fn from_entities(line: &LineItem, product: &Product) -> Self {
        Self {
            line_item_id: line.id(),
            order_id: line.order_id(),
            product_id: product.id(),
            product_name: product.name().to_string(),
            product_price: product.price(),
            unit_price: line.unit_price(),
            quantity: line.quantity(),
        }
    }

    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// An order with customer, delivery and line items resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub ordered_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub delivery: DeliveryView,

    /// Line items in line item id order. Empty until children are loaded.
    pub line_items: Vec<LineItemView>,
}

impl OrderView {
    pub fn from_entities(order: &Order, customer: &Customer, line_items: Vec<LineItemView>) -> Self {
        Self {
            order_id: order.id(),
            customer_id: customer.id(),
            customer_name: customer.name().to_string(),
            ordered_at: order.ordered_at(),
            status: order.status(),
            delivery: DeliveryView::from(order.shipment()),
            line_items,
        }
    }

    /// Returns the sum of the line totals.
    pub fn total_price(&self) -> Money {
        self.line_items.iter().map(LineItemView::total_price).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, unit_price: i64, quantity: u32) -> LineItemView {
        LineItemView {
            line_item_id: LineItemId::new(id),
            order_id: OrderId::new(1),
            product_id: ProductId::new(id),
            product_name: format!("Book {id}"),
            product_price: Money::new(unit_price),
            unit_price: Money::new(unit_price),
            quantity,
        }
    }

    #[test]
    fn test_total_price_sums_lines() {
        let order = OrderView {
            order_id: OrderId::new(1),
            customer_id: CustomerId::new(1),
            customer_name: "Kim".into(),
            ordered_at: Utc::now(),
            status: OrderStatus::Placed,
            delivery: DeliveryView {
                shipment_id: ShipmentId::new(1),
                address: Address::new("Seoul", "Main", "04524"),
                status: DeliveryStatus::Ready,
            },
            line_items: vec![line(1, 5000, 2), line(2, 3000, 1)],
        };
        assert_eq!(order.total_price(), Money::new(13000));
    }

    #[test]
    fn test_serializes_statuses_as_strings() {
        let json = serde_json::to_value(line(1, 5000, 2)).unwrap();
        assert_eq!(json["unit_price"], 5000);
        assert_eq!(json["quantity"], 2);

        let delivery = DeliveryView {
            shipment_id: ShipmentId::new(3),
            address: Address::new("Seoul", "Main", "04524"),
            status: DeliveryStatus::InTransit,
        };
        let json = serde_json::to_value(delivery).unwrap();
        assert_eq!(json["status"], "IN_TRANSIT");
        assert_eq!(json["shipment_id"], 3);
    }
}
