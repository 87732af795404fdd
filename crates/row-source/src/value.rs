//! Scalar values carried by rows and bound as query parameters.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// A single column value or bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the name of this value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Returns true if this is SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Compares two values the way an `ORDER BY ... ASC` would.
    ///
    /// Nulls sort last. Values of different types compare by type name so the
    /// ordering stays total.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (a, b) => a.type_name().cmp(b.type_name()),
        }
    }

    /// SQL equality: `NULL` never equals anything, including `NULL`.
    pub fn sql_eq(&self, other: &Value) -> bool {
        !self.is_null() && !other.is_null() && self == other
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

macro_rules! id_value {
    ($($id:ty),*) => {
        $(
            impl From<$id> for Value {
                fn from(id: $id) -> Self {
                    Value::Int(id.get())
                }
            }
        )*
    };
}

id_value!(
    common::OrderId,
    common::CustomerId,
    common::ShipmentId,
    common::ProductId,
    common::LineItemId
);
