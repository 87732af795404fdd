//! Order state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;
use crate::shipment::{DeliveryStatus, ParseStatusError};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Placed ──► Cancelled   (unless the shipment is Delivered)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order has been placed and stock has been taken.
    #[default]
    Placed,

    /// Order was cancelled and its stock restored (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns the status name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    /// Moves to `to`, given the current delivery status of the order's shipment.
    ///
    /// `Placed -> Cancelled` is the only legal change, and only while the
    /// shipment has not been delivered.
    pub fn transition(
        self,
        to: OrderStatus,
        delivery: DeliveryStatus,
    ) -> Result<OrderStatus, OrderError> {
        let reason = match (self, to) {
            (OrderStatus::Placed, OrderStatus::Cancelled) => {
                if delivery == DeliveryStatus::Delivered {
                    "shipment has already been delivered"
                } else {
                    return Ok(to);
                }
            }
            (OrderStatus::Cancelled, _) => "order is already cancelled",
            (OrderStatus::Placed, OrderStatus::Placed) => "order is already placed",
        };

        Err(OrderError::IllegalStateTransition {
            entity: "order",
            from: self.as_str(),
            to: to.as_str(),
            reason,
        })
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLACED" => Ok(OrderStatus::Placed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(ParseStatusError::new("order", other)),
        }
    }
}
