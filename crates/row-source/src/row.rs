//! Ordered, named rows returned by a row source.

use chrono::{DateTime, Utc};

use crate::{Column, Result, RowSourceError, Value};

/// Conversion from a column [`Value`] into a Rust type.
pub trait FromValue: Sized {
    /// Name of the expected type, used in error messages.
    const EXPECTED: &'static str;

    /// Converts `value`, returning `None` when the type does not match.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "text";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromValue for DateTime<Utc> {
    const EXPECTED: &'static str = "timestamp";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

/// Nullable columns decode into `Option<T>`; `NULL` becomes `None`.
impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// A single result row: column names paired with values, in select order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a column.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.push((name.into(), value.into()));
    }

    /// Returns the raw value of a column, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Decodes a column by name.
    pub fn try_get<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self
            .get(name)
            .ok_or_else(|| RowSourceError::ColumnNotFound(name.to_string()))?;

        T::from_value(value).ok_or_else(|| RowSourceError::TypeMismatch {
            column: name.to_string(),
            expected: T::EXPECTED,
            found: value.type_name(),
        })
    }

    /// Decodes a schema column by its select alias.
    pub fn column<T: FromValue>(&self, column: Column) -> Result<T> {
        self.try_get(column.alias())
    }

    /// Returns the column names in select order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keeps only the named columns, in the given order.
    pub(crate) fn project(&self, names: &[&str]) -> Row {
        let values = names
            .iter()
            .map(|name| {
                let value = self.get(name).cloned().unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect();
        Row { values }
    }

    /// Appends every column of `other`.
    pub(crate) fn extend(&mut self, other: Row) {
        self.values.extend(other.values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_get_decodes_typed_values() {
        let row = Row::new().with("order_id", 1i64).with("customer_name", "Kim");

        assert_eq!(row.try_get::<i64>("order_id").unwrap(), 1);
        assert_eq!(row.try_get::<String>("customer_name").unwrap(), "Kim");
    }

    #[test]
    fn missing_column_is_reported() {
        let row = Row::new();
        assert!(matches!(
            row.try_get::<i64>("order_id"),
            Err(RowSourceError::ColumnNotFound(name)) if name == "order_id"
        ));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let row = Row::new().with("order_id", "one");
        assert!(matches!(
            row.try_get::<i64>("order_id"),
            Err(RowSourceError::TypeMismatch {
                expected: "int",
                found: "text",
                ..
            })
        ));
    }

    #[test]
    fn null_decodes_into_none() {
        let row = Row::new().with("line_item_id", Value::Null);
        assert_eq!(row.try_get::<Option<i64>>("line_item_id").unwrap(), None);
        assert!(row.try_get::<i64>("line_item_id").is_err());
    }

    #[test]
    fn project_keeps_requested_order() {
        let row = Row::new().with("a", 1i64).with("b", 2i64).with("c", 3i64);
        let projected = row.project(&["c", "a"]);
        assert_eq!(projected.columns().collect::<Vec<_>>(), vec!["c", "a"]);
    }
}
