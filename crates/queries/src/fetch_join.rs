//! Single-query loading of the whole order graph.

use std::collections::HashMap;

use common::OrderId;
use domain::mapping::{customer_from_row, line_item_from_row, order_from_row, product_from_row};
use row_source::{Cardinality, Column, Row, RowSource, Select, Table};
use serde::Serialize;

use crate::loader::record_query;
use crate::{
    ConfigurationError, LineItemView, OrderLoader, OrderSearch, OrderView, Result, Strategy,
};

/// A relation reachable from an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Relation {
    /// The customer who placed the order.
    Customer,
    /// The order's shipment.
    Shipment,
    /// The order's line items.
    LineItems,
    /// The product of each line item.
    Product,
    /// Every other order of the same customer.
    CustomerOrders,
}

impl Relation {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Relation::LineItems | Relation::CustomerOrders => Cardinality::ToMany,
            Relation::Customer | Relation::Shipment | Relation::Product => Cardinality::ToOne,
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Relation::Customer => "customer",
            Relation::Shipment => "shipment",
            Relation::LineItems => "line items",
            Relation::Product => "product",
            Relation::CustomerOrders => "customer orders",
        };
        f.write_str(name)
    }
}

/// Relations the nested order view cannot be built without.
const REQUIRED: [Relation; 4] = [
    Relation::Customer,
    Relation::Shipment,
    Relation::LineItems,
    Relation::Product,
];

/// The relations one fetch-join query should load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPlan {
    relations: Vec<Relation>,
}

impl FetchPlan {
    /// An empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Customer, shipment, line items and their products.
    pub fn order_graph() -> Self {
        REQUIRED
            .into_iter()
            .fold(Self::new(), |plan, relation| plan.with(relation))
    }

    pub fn with(mut self, relation: Relation) -> Self {
        if !self.relations.contains(&relation) {
            self.relations.push(relation);
        }
        self
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Joins the plan's relations onto the order root.
    ///
    /// To-one relations are inner joins; line items and their products are
    /// left joins so orders without lines still come back. Joins follow the
    /// schema order regardless of the order relations were added in.
    /// Customer orders are never joined; [`FetchPlan::validate`] rejects
    /// them next to line items.
    pub fn select(&self) -> Select {
        REQUIRED
            .into_iter()
            .filter(|relation| self.relations.contains(relation))
            .fold(
                Select::from_table(Table::Orders),
                |select, relation| match relation {
                    Relation::Customer => select.join(Table::Customers),
                    Relation::Shipment => select.join(Table::Shipments),
                    Relation::LineItems => select.left_join(Table::LineItems),
                    Relation::Product => select.left_join(Table::Products),
                    Relation::CustomerOrders => select,
                },
            )
    }

    /// Rejects plans that join more than one collection or leave out a
    /// relation the order view needs.
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        let collections: Vec<Relation> = self
            .relations
            .iter()
            .copied()
            .filter(|relation| relation.cardinality() == Cardinality::ToMany)
            .collect();
        if collections.len() > 1 {
            return Err(ConfigurationError::MultipleCollectionFetch {
                relations: collections,
            });
        }

        if let Some(missing) = REQUIRED
            .into_iter()
            .find(|relation| !self.relations.contains(relation))
        {
            return Err(ConfigurationError::MissingRelation(missing));
        }
        Ok(())
    }
}

/// Collects duplicated root rows into distinct orders, first seen first.
#[derive(Default)]
struct RootDeduper {
    index: HashMap<OrderId, usize>,
    orders: Vec<OrderView>,
}

impl RootDeduper {
    fn push(&mut self, row: &Row) -> row_source::Result<()> {
        let order_id = OrderId::new(row.column(Column::OrderId)?);
        let position = match self.index.get(&order_id) {
            Some(position) => *position,
            None => {
                let customer = customer_from_row(row)?;
                let order = order_from_row(row, Vec::new())?;
                self.orders
                    .push(OrderView::from_entities(&order, &customer, Vec::new()));
                self.index.insert(order_id, self.orders.len() - 1);
                self.orders.len() - 1
            }
        };

        if row.column::<Option<i64>>(Column::LineItemId)?.is_some() {
            let line = line_item_from_row(row)?;
            let product = product_from_row(row)?;
            self.orders[position]
                .line_items
                .push(LineItemView::from_entities(&line, &product));
        }
        Ok(())
    }
}

impl<S: RowSource + ?Sized> OrderLoader<'_, S> {
    /// Loads matching orders with every relation in one query.
    ///
    /// Orders are repeated once per line item in the result set and are
    /// deduplicated here. Limits are rejected because they would count
    /// line items instead of orders.
    pub async fn load_with_fetch_join(&self, search: &OrderSearch) -> Result<Vec<OrderView>> {
        self.load_with_fetch_plan(&FetchPlan::order_graph(), search)
            .await
    }

    /// Loads matching orders with the relations of `plan` in one query.
    ///
    /// The plan is validated before any query runs and then renders the
    /// joins. A plan must name every relation the order view is built
    /// from, so a valid plan loads the whole order graph.
    #[tracing::instrument(skip(self, plan), fields(relations = ?plan.relations()))]
    pub async fn load_with_fetch_plan(
        &self,
        plan: &FetchPlan,
        search: &OrderSearch,
    ) -> Result<Vec<OrderView>> {
        plan.validate()?;
        if search.limit.is_some() {
            return Err(ConfigurationError::PaginationUnsupported {
                strategy: Strategy::FetchJoin,
            }
            .into());
        }

        let query = search
            .apply(plan.select())
            .order_by(Column::OrderId)
            .order_by(Column::LineItemId)
            .build()?;

        let rows = self.source.fetch_all(&query).await?;
        record_query(Strategy::FetchJoin.as_str(), rows.len());

        let mut deduper = RootDeduper::default();
        for row in &rows {
            deduper.push(row)?;
        }
        tracing::debug!(
            rows = rows.len(),
            orders = deduper.orders.len(),
            "deduplicated fetch-join rows"
        );
        Ok(deduper.orders)
    }
}
