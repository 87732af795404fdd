//! Row source for the order read path.
//!
//! This crate is the relational collaborator the loaders talk to:
//! - [`Table`] and [`Column`] describe the shop schema and its foreign keys
//! - [`Select`] builds a validated [`Query`] that renders parameterized SQL
//! - [`RowSource`] executes queries and returns ordered [`Row`]s
//! - [`UnitOfWork`] applies a batch of [`Write`]s atomically
//! - [`InMemoryRowSource`] and [`PostgresRowSource`] implement both traits

pub mod counting;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
pub mod row;
pub mod schema;
pub mod store;
pub mod value;

pub use counting::{CountingRowSource, QueryStats};
pub use error::{Result, RowSourceError};
pub use memory::{InMemoryRowSource, QueryLogEntry};
pub use postgres::PostgresRowSource;
pub use query::{Filter, Join, JoinKind, Query, Select};
pub use records::{CustomerRecord, LineItemRecord, OrderRecord, ProductRecord, ShipmentRecord};
pub use row::{FromValue, Row};
pub use schema::{Cardinality, Column, Table};
pub use store::{POSTGRES_MAX_PARAMETERS, RowSource, RowStream, UnitOfWork, Write};
pub use value::Value;
