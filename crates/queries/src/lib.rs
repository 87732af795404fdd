//! Order read path.
//!
//! Turns a root selection into fully populated order aggregates without
//! issuing one query per order:
//! - [`OrderLoader::load_roots`] loads orders with customer and shipment in one to-one join
//! - [`OrderLoader::attach_children_batched`] loads line items for many orders with chunked `IN` lists
//! - [`OrderLoader::load_with_fetch_join`] loads the whole graph in one wide join and dedupes roots
//! - [`OrderLoader::load_flat_and_group`] streams a flat projection through a [`FlatGrouper`]
//!
//! Every strategy returns the same [`OrderView`] shape, and [`Strategy::select`]
//! picks one from the caller's requirements.

mod batch_loader;
pub mod config;
mod decode;
pub mod error;
pub mod fetch_join;
pub mod flat;
pub mod loader;
mod root_loader;
pub mod search;
pub mod strategy;
pub mod view;

pub use config::LoaderConfig;
pub use error::{ConfigurationError, LoadError, Result};
pub use fetch_join::{FetchPlan, Relation};
pub use flat::{FlatGrouper, FlatOrderRow, group_flat_rows};
pub use loader::OrderLoader;
pub use search::OrderSearch;
pub use strategy::{LoadRequirements, Strategy};
pub use view::{DeliveryView, LineItemView, OrderView};
