//! Order aggregate implementation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, ProductId, ShipmentId};
use serde::{Deserialize, Serialize};

use super::{LineItem, OrderError, OrderStatus};
use crate::{Customer, DeliveryStatus, Money, Shipment};

/// Order aggregate root.
///
/// Owns its line items and its shipment; references the customer by key.
/// State only changes through [`Order::cancel`] and [`Order::advance_delivery`],
/// which return errors instead of applying illegal transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,

    /// Customer who placed the order.
    customer_id: CustomerId,

    /// Shipment created together with the order.
    shipment: Shipment,

    /// Line items in placement order.
    line_items: Vec<LineItem>,

    status: OrderStatus,

    ordered_at: DateTime<Utc>,
}

impl Order {
    /// Places an order for `customer`.
    ///
    /// The shipment starts READY and ships to a copy of the customer's address.
    /// The line items must already have taken their stock (see [`LineItem::create`]).
    pub fn place(
        id: OrderId,
        customer: &Customer,
        shipment_id: ShipmentId,
        line_items: Vec<LineItem>,
        ordered_at: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if line_items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        Ok(Self {
            id,
            customer_id: customer.id(),
            shipment: Shipment::ready(shipment_id, customer.address().clone()),
            line_items,
            status: OrderStatus::Placed,
            ordered_at,
        })
    }

    /// Rebuilds a stored order.
    pub fn from_parts(
        id: OrderId,
        customer_id: CustomerId,
        shipment: Shipment,
        line_items: Vec<LineItem>,
        status: OrderStatus,
        ordered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            customer_id,
            shipment,
            line_items,
            status,
            ordered_at,
        }
    }

    /// Cancels the order.
    ///
    /// Returns the quantity to restore per product. Lines for the same product
    /// are summed. Nothing changes when the transition is illegal.
    pub fn cancel(&mut self) -> Result<HashMap<ProductId, u32>, OrderError> {
        self.status = self
            .status
            .transition(OrderStatus::Cancelled, self.shipment.status())?;

        let mut restored: HashMap<ProductId, u32> = HashMap::new();
        for line in &self.line_items {
            *restored.entry(line.product_id()).or_default() += line.quantity();
        }
        Ok(restored)
    }

    /// Moves the shipment forward. A cancelled order's shipment cannot move.
    pub fn advance_delivery(&mut self, to: DeliveryStatus) -> Result<(), OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::IllegalStateTransition {
                entity: "delivery",
                from: self.shipment.status().as_str(),
                to: to.as_str(),
                reason: "order is cancelled",
            });
        }
        self.shipment.advance(to)
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn shipment(&self) -> &Shipment {
        &self.shipment
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn ordered_at(&self) -> DateTime<Utc> {
        self.ordered_at
    }

    /// Returns the sum of the line totals.
    pub fn total_price(&self) -> Money {
        self.line_items.iter().map(LineItem::total_price).sum()
    }
}
