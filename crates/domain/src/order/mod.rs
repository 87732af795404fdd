//! Order aggregate and related types.

mod aggregate;
mod line_item;
mod state;

pub use aggregate::Order;
pub use line_item::LineItem;
pub use state::OrderStatus;

use common::ProductId;
use thiserror::Error;

/// Business rule violations raised by the write path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Taking the requested quantity would drive the product's stock below zero.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A status change the state machine does not allow.
    #[error("Illegal {entity} transition from {from} to {to}: {reason}")]
    IllegalStateTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
        reason: &'static str,
    },

    /// Order has no line items.
    #[error("Order has no line items")]
    EmptyOrder,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Invalid price.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: i64 },
}
