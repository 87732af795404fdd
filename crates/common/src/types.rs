use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw primary-key value.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw primary-key value.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id!(
    /// Primary key of an order, the root of the order aggregate.
    OrderId
);

row_id!(
    /// Primary key of a customer.
    CustomerId
);

row_id!(
    /// Primary key of a shipment. Each order owns exactly one.
    ShipmentId
);

row_id!(
    /// Primary key of a catalog product.
    ProductId
);

row_id!(
    /// Primary key of a line item inside an order.
    LineItemId
);
