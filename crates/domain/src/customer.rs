use common::CustomerId;
use serde::{Deserialize, Serialize};

use crate::Address;

/// A registered customer. Orders reference customers but never own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    name: String,
    address: Address,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>, address: Address) -> Self {
        Self {
            id,
            name: name.into(),
            address,
        }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }
}
