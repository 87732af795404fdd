//! Shipment entity and its delivery state machine.

use common::ShipmentId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Address, OrderError};

/// A stored status string that names no known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} status: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    pub(crate) fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Delivery progress of a shipment.
///
/// State transitions:
/// ```text
/// Ready ──► InTransit ──► Delivered
///   └──────────────────────▲
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    #[default]
    Ready,
    InTransit,
    /// Terminal; an order whose shipment is delivered can no longer be cancelled.
    Delivered,
}

impl DeliveryStatus {
    /// Returns the status name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Ready => "READY",
            DeliveryStatus::InTransit => "IN_TRANSIT",
            DeliveryStatus::Delivered => "DELIVERED",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            DeliveryStatus::Ready => 0,
            DeliveryStatus::InTransit => 1,
            DeliveryStatus::Delivered => 2,
        }
    }

    /// Moves forward to `to`. Delivery never goes backwards or stays put.
    pub fn advance(self, to: DeliveryStatus) -> Result<DeliveryStatus, OrderError> {
        if to.rank() > self.rank() {
            return Ok(to);
        }
        Err(OrderError::IllegalStateTransition {
            entity: "delivery",
            from: self.as_str(),
            to: to.as_str(),
            reason: "delivery status only moves forward",
        })
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(DeliveryStatus::Ready),
            "IN_TRANSIT" => Ok(DeliveryStatus::InTransit),
            "DELIVERED" => Ok(DeliveryStatus::Delivered),
            other => Err(ParseStatusError::new("delivery", other)),
        }
    }
}

/// The shipment owned by exactly one order, created together with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    id: ShipmentId,
    address: Address,
    status: DeliveryStatus,
}

impl Shipment {
    /// Creates a shipment that is ready to go to `address`.
    pub fn ready(id: ShipmentId, address: Address) -> Self {
        Self {
            id,
            address,
            status: DeliveryStatus::Ready,
        }
    }

    /// Rebuilds a stored shipment.
    pub fn from_parts(id: ShipmentId, address: Address, status: DeliveryStatus) -> Self {
        Self {
            id,
            address,
            status,
        }
    }

    pub fn id(&self) -> ShipmentId {
        self.id
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub(crate) fn advance(&mut self, to: DeliveryStatus) -> Result<(), OrderError> {
        self.status = self.status.advance(to)?;
        Ok(())
    }
}
