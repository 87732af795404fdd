use row_source::{Column, RowSource, Select, Table};

use crate::decode::{ROOT_COLUMNS, decode_root};
use crate::{OrderLoader, OrderSearch, OrderView, Result};

impl<S: RowSource + ?Sized> OrderLoader<'_, S> {
    /// Loads matching orders with customer and shipment resolved and no line items.
    ///
    /// Issues one query over to-one joins only, so the limit and offset count
    /// distinct orders. The limit is capped at the configured root limit.
    #[tracing::instrument(skip(self))]
    pub async fn load_roots(
        &self,
        search: &OrderSearch,
        offset: Option<usize>,
    ) -> Result<Vec<OrderView>> {
        let root_limit = self.config.root_limit;
        let limit = search.limit.unwrap_or(root_limit).min(root_limit);

        let mut select = Select::from_table(Table::Orders)
            .join(Table::Customers)
            .join(Table::Shipments)
            .select(ROOT_COLUMNS);
        select = search
            .apply(select)
            .order_by(Column::OrderId)
            .limit(limit);
        if let Some(offset) = offset {
            select = select.offset(offset);
        }

        let rows = self.source.fetch_all(&select.build()?).await?;
        crate::loader::record_query("roots", rows.len());

        let roots = rows
            .iter()
            .map(decode_root)
            .collect::<row_source::Result<Vec<_>>>()?;
        Ok(roots)
    }
}
