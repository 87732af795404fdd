//! Child loading in chunked `IN` lists.

use std::collections::{HashMap, HashSet, VecDeque};

use common::OrderId;
use row_source::{Column, Filter, Query, RowSource, RowSourceError, Select, Table};

use crate::decode::{CHILD_COLUMNS, decode_child};
use crate::loader::record_query;
use crate::{LineItemView, OrderLoader, OrderView, Result};

fn child_query(order_ids: &[OrderId]) -> row_source::Result<Query> {
    Select::from_table(Table::LineItems)
        .join(Table::Products)
        .select(CHILD_COLUMNS)
        .filter(Filter::in_list(
            Column::LineItemOrderId,
            order_ids.iter().copied(),
        ))
        .order_by(Column::LineItemId)
        .build()
}

impl<S: RowSource + ?Sized> OrderLoader<'_, S> {
    /// Loads the line items of every given order, keyed by order id.
    ///
    /// Keys are deduplicated and split into chunks of at most `batch_size`
    /// (capped by the parameter limit); one query runs per chunk. A chunk the
    /// store rejects for binding too many parameters is split in half and
    /// retried. Orders without line items have no entry.
    #[tracing::instrument(skip(self, order_ids), fields(keys = order_ids.len()))]
    pub async fn load_line_items(
        &self,
        order_ids: &[OrderId],
        batch_size: usize,
    ) -> Result<HashMap<OrderId, Vec<LineItemView>>> {
        let chunk_size = self.config.chunk_size(batch_size)?;

        let mut seen = HashSet::with_capacity(order_ids.len());
        let keys: Vec<OrderId> = order_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let mut children: HashMap<OrderId, Vec<LineItemView>> = HashMap::new();
        if keys.is_empty() {
            return Ok(children);
        }

        let mut pending: VecDeque<Vec<OrderId>> =
            keys.chunks(chunk_size).map(<[OrderId]>::to_vec).collect();

        while let Some(chunk) = pending.pop_front() {
            let query = child_query(&chunk)?;
            match self.source.fetch_all(&query).await {
                Ok(rows) => {
                    record_query("batched_children", rows.len());
                    for row in &rows {
                        if let Some(line) = decode_child(row)? {
                            children.entry(line.order_id).or_default().push(line);
                        }
                    }
                }
                Err(RowSourceError::TooManyParameters { count, limit }) if chunk.len() > 1 => {
                    tracing::warn!(
                        count,
                        limit,
                        chunk = chunk.len(),
                        "child batch exceeds parameter limit, splitting"
                    );
                    metrics::counter!("order_loader_rechunks_total").increment(1);

                    let (head, tail) = chunk.split_at(chunk.len() / 2);
                    pending.push_front(tail.to_vec());
                    pending.push_front(head.to_vec());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(children)
    }

    /// Fills in the line items of already loaded roots.
    ///
    /// Runs `ceil(N / batch_size)` child queries for N distinct orders.
    pub async fn attach_children_batched(
        &self,
        mut roots: Vec<OrderView>,
        batch_size: usize,
    ) -> Result<Vec<OrderView>> {
        let order_ids: Vec<OrderId> = roots.iter().map(|root| root.order_id).collect();
        let children = self.load_line_items(&order_ids, batch_size).await?;

        for root in &mut roots {
            root.line_items = children.get(&root.order_id).cloned().unwrap_or_default();
        }
        Ok(roots)
    }

    /// Fills in line items with one query per root.
    ///
    /// This is the 1+N access pattern; it exists to measure the others against.
    pub async fn attach_children_per_root(
        &self,
        mut roots: Vec<OrderView>,
    ) -> Result<Vec<OrderView>> {
        for root in &mut roots {
            let query = Select::from_table(Table::LineItems)
                .join(Table::Products)
                .select(CHILD_COLUMNS)
                .filter(Filter::eq(Column::LineItemOrderId, root.order_id))
                .order_by(Column::LineItemId)
                .build()?;
            let rows = self.source.fetch_all(&query).await?;
            record_query("per_root_children", rows.len());

            root.line_items = rows
                .iter()
                .filter_map(|row| decode_child(row).transpose())
                .collect::<row_source::Result<Vec<_>>>()?;
        }
        Ok(roots)
    }
}
