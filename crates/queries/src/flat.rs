//! Grouping of a denormalized order projection back into nested orders.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use domain::OrderStatus;
use futures_util::StreamExt;
use row_source::{Column, Row, RowSource, Select, Table};

use crate::decode::{CHILD_COLUMNS, ROOT_COLUMNS, decode_child, decode_root};
use crate::loader::record_query;
use crate::{
    ConfigurationError, DeliveryView, LineItemView, OrderLoader, OrderSearch, OrderView, Result,
    Strategy,
};

/// One row of the flat projection: order fields repeated next to at most one line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatOrderRow {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub ordered_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub delivery: DeliveryView,

    /// `None` for an order without line items.
    pub line_item: Option<LineItemView>,
}

impl FlatOrderRow {
    pub fn from_row(row: &Row) -> row_source::Result<Self> {
        let root = decode_root(row)?;
        Ok(Self {
            order_id: root.order_id,
            customer_id: root.customer_id,
            customer_name: root.customer_name,
            ordered_at: root.ordered_at,
            status: root.status,
            delivery: root.delivery,
            line_item: decode_child(row)?,
        })
    }
}

/// Accumulates flat rows into nested orders.
///
/// Orders are identified by id alone. The first row seen for an order sets
/// its fields; every row contributes its line item. Orders come out in the
/// order their ids first appeared, even if their rows are not contiguous.
#[derive(Debug, Default)]
pub struct FlatGrouper {
    index: HashMap<OrderId, usize>,
    orders: Vec<OrderView>,
    rows: usize,
}

impl FlatGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: FlatOrderRow) {
        self.rows += 1;
        let position = match self.index.get(&row.order_id) {
            Some(position) => *position,
            None => {
                self.orders.push(OrderView {
                    order_id: row.order_id,
                    customer_id: row.customer_id,
                    customer_name: row.customer_name,
                    ordered_at: row.ordered_at,
                    status: row.status,
                    delivery: row.delivery,
                    line_items: Vec::new(),
                });
                self.index.insert(row.order_id, self.orders.len() - 1);
                self.orders.len() - 1
            }
        };

        if let Some(line) = row.line_item {
            self.orders[position].line_items.push(line);
        }
    }

    /// Number of rows pushed so far.
    pub fn rows_seen(&self) -> usize {
        self.rows
    }

    /// Number of distinct orders so far.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn finish(self) -> Vec<OrderView> {
        self.orders
    }
}

/// Groups flat rows into nested orders in one pass.
pub fn group_flat_rows(rows: impl IntoIterator<Item = FlatOrderRow>) -> Vec<OrderView> {
    let mut grouper = FlatGrouper::new();
    for row in rows {
        grouper.push(row);
    }
    grouper.finish()
}

impl<S: RowSource + ?Sized> OrderLoader<'_, S> {
    /// Loads matching orders through one flat projection and groups the rows
    /// in memory as they stream in.
    ///
    /// Like the fetch join, the projection repeats each order once per line
    /// item, so limits are rejected.
    #[tracing::instrument(skip(self))]
    pub async fn load_flat_and_group(&self, search: &OrderSearch) -> Result<Vec<OrderView>> {
        if search.limit.is_some() {
            return Err(ConfigurationError::PaginationUnsupported {
                strategy: Strategy::FlatGrouped,
            }
            .into());
        }

        let columns: Vec<Column> = ROOT_COLUMNS.iter().chain(CHILD_COLUMNS).copied().collect();
        let select = Select::from_table(Table::Orders)
            .join(Table::Customers)
            .join(Table::Shipments)
            .left_join(Table::LineItems)
            .left_join(Table::Products)
            .select(&columns);
        let query = search
            .apply(select)
            .order_by(Column::OrderId)
            .order_by(Column::LineItemId)
            .build()?;

        let mut grouper = FlatGrouper::new();
        let mut stream = self.source.fetch(&query).await?;
        while let Some(row) = stream.next().await {
            grouper.push(FlatOrderRow::from_row(&row?)?);
        }
        record_query(Strategy::FlatGrouped.as_str(), grouper.rows_seen());

        tracing::debug!(
            rows = grouper.rows_seen(),
            orders = grouper.len(),
            "grouped flat rows"
        );
        Ok(grouper.finish())
    }
}

#[cfg(test)]
mod tests {
    use common::{LineItemId, ProductId, ShipmentId};
    use domain::{Address, DeliveryStatus, Money};

    use super::*;

    fn flat(order_id: i64, line_item_id: Option<i64>) -> FlatOrderRow {
        let order_id = OrderId::new(order_id);
        FlatOrderRow {
            order_id,
            customer_id: CustomerId::new(1),
            customer_name: "Kim".into(),
            ordered_at: DateTime::<Utc>::UNIX_EPOCH,
            status: OrderStatus::Placed,
            delivery: DeliveryView {
                shipment_id: ShipmentId::new(order_id.get()),
                address: Address::new("Seoul", "Main", "04524"),
                status: DeliveryStatus::Ready,
            },
            line_item: line_item_id.map(|id| LineItemView {
                line_item_id: LineItemId::new(id),
                order_id,
                product_id: ProductId::new(1),
                product_name: "Book A".into(),
                product_price: Money::new(5000),
                unit_price: Money::new(5000),
                quantity: 1,
            }),
        }
    }

    fn line_ids(order: &OrderView) -> Vec<i64> {
        order
            .line_items
            .iter()
            .map(|line| line.line_item_id.get())
            .collect()
    }

    #[test]
    fn test_rows_of_one_order_become_one_root() {
        let orders = group_flat_rows(vec![flat(1, Some(1)), flat(1, Some(2)), flat(1, Some(3))]);
        assert_eq!(orders.len(), 1);
        assert_eq!(line_ids(&orders[0]), vec![1, 2, 3]);
    }

    #[test]
    fn test_first_appearance_order_survives_interleaving() {
        let orders = group_flat_rows(vec![
            flat(2, Some(10)),
            flat(1, Some(11)),
            flat(2, Some(12)),
            flat(3, None),
            flat(1, Some(13)),
        ]);

        let ids: Vec<i64> = orders.iter().map(|order| order.order_id.get()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(line_ids(&orders[0]), vec![10, 12]);
        assert_eq!(line_ids(&orders[1]), vec![11, 13]);
        assert!(orders[2].line_items.is_empty());
    }

    #[test]
    fn test_header_comes_from_first_row() {
        let mut later = flat(1, Some(2));
        later.customer_name = "Lee".into();

        let mut grouper = FlatGrouper::new();
        grouper.push(flat(1, Some(1)));
        grouper.push(later);

        assert_eq!(grouper.rows_seen(), 2);
        assert_eq!(grouper.len(), 1);
        let orders = grouper.finish();
        assert_eq!(orders[0].customer_name, "Kim");
        assert_eq!(orders[0].line_items.len(), 2);
    }

    #[test]
    fn test_no_rows_is_empty() {
        let grouper = FlatGrouper::new();
        assert!(grouper.is_empty());
        assert!(grouper.finish().is_empty());
    }
}
