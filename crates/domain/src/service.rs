//! Write-path service: registers customers, maintains the catalog and
//! places, cancels and ships orders.
//!
//! Every mutating call loads what it needs, validates the whole change on
//! in-memory entities, and only then commits one [`Write`] batch. A call
//! that fails leaves the store untouched.
//!
//! Stock is moved by deltas and status changes name the status they were
//! validated against, so the store rejects a batch whose reads went stale
//! while it was being built. A rejected batch is reported as the business
//! error the current state explains.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use common::{CustomerId, LineItemId, OrderId, ProductId, ShipmentId};
use row_source::{
    Column, Filter, RowSource, RowSourceError, Select, Table, UnitOfWork, Write,
};

use crate::error::DomainError;
use crate::mapping::{
    customer_from_row, customer_record, line_item_from_row, line_item_record, order_from_row,
    order_record, product_from_row, product_record, shipment_record,
};
use crate::{Address, Customer, DeliveryStatus, LineItem, Money, Order, OrderError, Product};

/// One requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Service for the shop's write path.
pub struct OrderService<S> {
    store: S,
}

impl<S: RowSource + UnitOfWork> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a customer. Names are unique.
    #[tracing::instrument(skip(self, address))]
    pub async fn register_customer(
        &self,
        name: &str,
        address: Address,
    ) -> Result<Customer, DomainError> {
        let query = Select::from_table(Table::Customers)
            .select(&[Column::CustomerId])
            .filter(Filter::eq(Column::CustomerName, name))
            .build()?;
        if !self.store.fetch_all(&query).await?.is_empty() {
            return Err(DomainError::DuplicateCustomer(name.to_string()));
        }

        let id = CustomerId::new(self.store.next_id(Table::Customers).await?);
        let customer = Customer::new(id, name, address);
        self.store
            .commit(vec![Write::InsertCustomer(customer_record(&customer))])
            .await?;

        tracing::info!(customer_id = %id, "customer registered");
        Ok(customer)
    }

    /// Returns every customer, ordered by id.
    pub async fn find_customers(&self) -> Result<Vec<Customer>, DomainError> {
        let query = Select::from_table(Table::Customers)
            .order_by(Column::CustomerId)
            .build()?;
        let rows = self.store.fetch_all(&query).await?;
        Ok(rows
            .iter()
            .map(customer_from_row)
            .collect::<Result<_, _>>()?)
    }

    pub async fn find_customer(&self, id: CustomerId) -> Result<Customer, DomainError> {
        let query = Select::from_table(Table::Customers)
            .filter(Filter::eq(Column::CustomerId, id))
            .build()?;
        let rows = self.store.fetch_all(&query).await?;
        let row = rows
            .first()
            .ok_or_else(|| DomainError::not_found("customer", id))?;
        Ok(customer_from_row(row)?)
    }

    /// Adds a product to the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn add_product(
        &self,
        name: &str,
        price: Money,
        stock_quantity: u32,
    ) -> Result<Product, DomainError> {
        if price.is_negative() {
            return Err(OrderError::InvalidPrice {
                price: price.amount(),
            }
            .into());
        }

        let id = ProductId::new(self.store.next_id(Table::Products).await?);
        let product = Product::new(id, name, price, stock_quantity)?;
        self.store
            .commit(vec![Write::InsertProduct(product_record(&product))])
            .await?;

        tracing::info!(product_id = %id, "product added");
        Ok(product)
    }

    /// Replaces a product's name, price and stock. Placed orders keep the
    /// unit prices they captured.
    #[tracing::instrument(skip(self))]
    pub async fn update_product(
        &self,
        id: ProductId,
        name: &str,
        price: Money,
        stock_quantity: u32,
    ) -> Result<Product, DomainError> {
        let mut product = self.find_product(id).await?;
        product.change(name, price, stock_quantity)?;
        self.store
            .commit(vec![Write::UpdateProduct(product_record(&product))])
            .await?;
        Ok(product)
    }

    /// Returns every product, ordered by id.
    pub async fn find_products(&self) -> Result<Vec<Product>, DomainError> {
        let query = Select::from_table(Table::Products)
            .order_by(Column::ProductId)
            .build()?;
        let rows = self.store.fetch_all(&query).await?;
        Ok(rows
            .iter()
            .map(product_from_row)
            .collect::<Result<_, _>>()?)
    }

    pub async fn find_product(&self, id: ProductId) -> Result<Product, DomainError> {
        let query = Select::from_table(Table::Products)
            .filter(Filter::eq(Column::ProductId, id))
            .build()?;
        let rows = self.store.fetch_all(&query).await?;
        let row = rows
            .first()
            .ok_or_else(|| DomainError::not_found("product", id))?;
        Ok(product_from_row(row)?)
    }

    /// Loads the given products in one query, keyed by id.
    async fn load_products(
        &self,
        ids: impl IntoIterator<Item = ProductId>,
    ) -> Result<HashMap<ProductId, Product>, DomainError> {
        let mut ids: Vec<ProductId> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = Select::from_table(Table::Products)
            .filter(Filter::in_list(Column::ProductId, ids.iter().copied()))
            .build()?;
        let rows = self.store.fetch_all(&query).await?;

        let mut products = HashMap::with_capacity(rows.len());
        for row in &rows {
            let product = product_from_row(row)?;
            products.insert(product.id(), product);
        }
        if let Some(missing) = ids.iter().find(|id| !products.contains_key(*id)) {
            return Err(DomainError::not_found("product", *missing));
        }
        Ok(products)
    }

    /// Places an order for `customer_id`.
    ///
    /// Every line is checked against stock before anything is written; the
    /// first line that cannot be served fails the whole order with
    /// [`OrderError::InsufficientStock`].
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        lines: &[OrderLine],
    ) -> Result<Order, DomainError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyOrder.into());
        }

        let customer = self.find_customer(customer_id).await?;
        let mut products = self
            .load_products(lines.iter().map(|line| line.product_id))
            .await?;

        // Dry run on a copy so no ids are reserved for an order that cannot be placed.
        let mut draft = products.clone();
        for line in lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: line.quantity,
                }
                .into());
            }
            if let Some(product) = draft.get_mut(&line.product_id) {
                product.remove_stock(line.quantity)?;
            }
        }

        let order_id = OrderId::new(self.store.next_id(Table::Orders).await?);
        let shipment_id = ShipmentId::new(self.store.next_id(Table::Shipments).await?);

        let mut line_items = Vec::with_capacity(lines.len());
        for line in lines {
            let id = LineItemId::new(self.store.next_id(Table::LineItems).await?);
            let product = products
                .get_mut(&line.product_id)
                .ok_or_else(|| DomainError::not_found("product", line.product_id))?;
            line_items.push(LineItem::create(id, order_id, product, line.quantity)?);
        }

        let order = Order::place(order_id, &customer, shipment_id, line_items, Utc::now())?;

        let mut writes = vec![
            Write::InsertShipment(shipment_record(order.shipment())),
            Write::InsertOrder(order_record(&order)),
        ];
        writes.extend(
            order
                .line_items()
                .iter()
                .map(|line| Write::InsertLineItem(line_item_record(line))),
        );

        let mut taken: BTreeMap<ProductId, u32> = BTreeMap::new();
        for line in lines {
            *taken.entry(line.product_id).or_default() += line.quantity;
        }
        writes.extend(
            taken
                .iter()
                .map(|(&product_id, &quantity)| Write::AdjustProductStock {
                    product_id,
                    delta: -i64::from(quantity),
                }),
        );
        if let Err(err) = self.store.commit(writes).await {
            return Err(self.explain_stock_conflict(err, &taken).await);
        }

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            total = %order.total_price(),
            "order placed"
        );
        Ok(order)
    }

    /// Loads one order with its shipment and line items.
    pub async fn find_order(&self, id: OrderId) -> Result<Order, DomainError> {
        let header = Select::from_table(Table::Orders)
            .join(Table::Shipments)
            .filter(Filter::eq(Column::OrderId, id))
            .build()?;
        let rows = self.store.fetch_all(&header).await?;
        let row = rows
            .first()
            .ok_or_else(|| DomainError::not_found("order", id))?;

        let lines = Select::from_table(Table::LineItems)
            .filter(Filter::eq(Column::LineItemOrderId, id))
            .order_by(Column::LineItemId)
            .build()?;
        let line_items = self
            .store
            .fetch_all(&lines)
            .await?
            .iter()
            .map(line_item_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(order_from_row(row, line_items)?)
    }

    /// Cancels an order and puts its quantities back into stock.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order, DomainError> {
        let mut order = self.find_order(id).await?;
        let from = order.status();
        let delivery = order.shipment().status().as_str();
        let restored: BTreeMap<ProductId, u32> = order.cancel()?.into_iter().collect();

        let mut writes = vec![
            Write::UpdateOrderStatus {
                order_id: id,
                from: from.as_str().to_string(),
                to: order.status().as_str().to_string(),
            },
            // Pins the delivery status the cancellation was checked against.
            Write::UpdateShipmentStatus {
                shipment_id: order.shipment().id(),
                from: delivery.to_string(),
                to: delivery.to_string(),
            },
        ];
        writes.extend(
            restored
                .into_iter()
                .map(|(product_id, quantity)| Write::AdjustProductStock {
                    product_id,
                    delta: i64::from(quantity),
                }),
        );
        if let Err(err) = self.store.commit(writes).await {
            return Err(self
                .explain_status_conflict(err, id, |current| current.cancel().map(drop))
                .await);
        }

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_id = %id, "order cancelled");
        Ok(order)
    }

    /// Moves an order's shipment forward.
    #[tracing::instrument(skip(self))]
    pub async fn advance_delivery(
        &self,
        id: OrderId,
        to: DeliveryStatus,
    ) -> Result<Order, DomainError> {
        let mut order = self.find_order(id).await?;
        let from = order.shipment().status();
        order.advance_delivery(to)?;

        let status = order.status().as_str();
        let writes = vec![
            // Pins the order status the delivery change was checked against.
            Write::UpdateOrderStatus {
                order_id: id,
                from: status.to_string(),
                to: status.to_string(),
            },
            Write::UpdateShipmentStatus {
                shipment_id: order.shipment().id(),
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            },
        ];
        if let Err(err) = self.store.commit(writes).await {
            return Err(self
                .explain_status_conflict(err, id, |current| current.advance_delivery(to))
                .await);
        }
        Ok(order)
    }

    /// Reports a failed stock guard as the shortage the current stock shows.
    async fn explain_stock_conflict(
        &self,
        err: RowSourceError,
        taken: &BTreeMap<ProductId, u32>,
    ) -> DomainError {
        let RowSourceError::WriteConflict {
            table: Table::Products,
            id,
            ..
        } = err
        else {
            return err.into();
        };

        let product_id = ProductId::new(id);
        match self.find_product(product_id).await {
            Ok(product) => {
                tracing::debug!(product_id = %product_id, "stock changed before commit");
                OrderError::InsufficientStock {
                    product_id,
                    requested: taken.get(&product_id).copied().unwrap_or_default(),
                    available: product.stock_quantity(),
                }
                .into()
            }
            Err(reload) => reload,
        }
    }

    /// Replays `change` on the order as it is now, so a batch that lost a
    /// race reports the transition that is no longer legal.
    async fn explain_status_conflict(
        &self,
        err: RowSourceError,
        id: OrderId,
        change: impl FnOnce(&mut Order) -> Result<(), OrderError>,
    ) -> DomainError {
        if !matches!(
            err,
            RowSourceError::WriteConflict {
                table: Table::Orders | Table::Shipments,
                ..
            }
        ) {
            return err.into();
        }

        match self.find_order(id).await {
            Ok(mut current) => match change(&mut current) {
                Err(rejected) => {
                    tracing::debug!(order_id = %id, "order changed before commit");
                    rejected.into()
                }
                Ok(()) => err.into(),
            },
            Err(reload) => reload,
        }
    }
}
