use common::{LineItemId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use super::OrderError;
use crate::{Money, Product};

/// One product line of an order.
///
/// The unit price is captured when the line is placed and does not follow
/// later catalog price changes. The owning order is a plain key, not a
/// reference the line can navigate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    id: LineItemId,
    order_id: OrderId,
    product_id: ProductId,
    unit_price: Money,
    quantity: u32,
}

impl LineItem {
    /// Creates a line for `quantity` units of `product`, taking them out of stock.
    pub fn create(
        id: LineItemId,
        order_id: OrderId,
        product: &mut Product,
        quantity: u32,
    ) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        product.remove_stock(quantity)?;

        Ok(Self {
            id,
            order_id,
            product_id: product.id(),
            unit_price: product.price(),
            quantity,
        })
    }

    /// Rebuilds a stored line item.
    pub fn from_parts(
        id: LineItemId,
        order_id: OrderId,
        product_id: ProductId,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            id,
            order_id,
            product_id,
            unit_price,
            quantity,
        }
    }

    pub fn id(&self) -> LineItemId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns `unit_price × quantity`.
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}
