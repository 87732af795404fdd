//! Catalog products and their stock.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::{Money, OrderError};

/// A product with a list price and a stock count that never goes below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    price: Money,
    stock_quantity: u32,
}

impl Product {
    /// Creates a product, rejecting a negative price.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Money,
        stock_quantity: u32,
    ) -> Result<Self, OrderError> {
        if price.is_negative() {
            return Err(OrderError::InvalidPrice {
                price: price.amount(),
            });
        }
        Ok(Self {
            id,
            name: name.into(),
            price,
            stock_quantity,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    /// Takes `quantity` units out of stock.
    pub fn remove_stock(&mut self, quantity: u32) -> Result<(), OrderError> {
        let remaining =
            self.stock_quantity
                .checked_sub(quantity)
                .ok_or(OrderError::InsufficientStock {
                    product_id: self.id,
                    requested: quantity,
                    available: self.stock_quantity,
                })?;
        self.stock_quantity = remaining;
        Ok(())
    }

    /// Puts `quantity` units back into stock.
    pub fn add_stock(&mut self, quantity: u32) {
        self.stock_quantity = self.stock_quantity.saturating_add(quantity);
    }

    /// Replaces the catalog fields. Existing line items keep the price they
    /// captured when they were placed.
    pub fn change(
        &mut self,
        name: impl Into<String>,
        price: Money,
        stock_quantity: u32,
    ) -> Result<(), OrderError> {
        if price.is_negative() {
            return Err(OrderError::InvalidPrice {
                price: price.amount(),
            });
        }
        self.name = name.into();
        self.price = price;
        self.stock_quantity = stock_quantity;
        Ok(())
    }
}
