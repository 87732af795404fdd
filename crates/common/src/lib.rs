//! Identifier types shared by the row source, domain and query crates.

pub mod types;

pub use types::{CustomerId, LineItemId, OrderId, ProductId, ShipmentId};
