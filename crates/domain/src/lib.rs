//! Domain layer for the shop.
//!
//! This crate provides the write path of the order aggregate:
//! - Customer, Product and Shipment entities with the Address and Money value objects
//! - Order aggregate with its line items and the order/delivery state machines
//! - OrderService, which validates every change before committing it in one unit of work

pub mod customer;
pub mod error;
pub mod mapping;
pub mod order;
pub mod product;
pub mod service;
pub mod shipment;
pub mod value_objects;

pub use customer::Customer;
pub use error::DomainError;
pub use order::{LineItem, Order, OrderError, OrderStatus};
pub use product::Product;
pub use service::{OrderLine, OrderService};
pub use shipment::{DeliveryStatus, ParseStatusError, Shipment};
pub use value_objects::{Address, Money};
