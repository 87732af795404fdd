use domain::OrderStatus;
use row_source::{Column, Filter, Select};

/// Root-selection predicate shared by every loading strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSearch {
    /// Only orders in this status.
    pub status: Option<OrderStatus>,

    /// Only orders whose customer name contains this text. Blank text is ignored.
    pub customer_name: Option<String>,

    /// Maximum number of roots. Only the root loader accepts it.
    pub limit: Option<usize>,
}

impl OrderSearch {
    /// Matches every order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Adds the predicate's filters to a select that joins orders and customers.
    pub(crate) fn apply(&self, mut select: Select) -> Select {
        if let Some(status) = self.status {
            select = select.filter(Filter::eq(Column::OrderStatus, status.as_str()));
        }
        if let Some(name) = self.customer_name.as_deref()
            && !name.trim().is_empty()
        {
            select = select.filter(Filter::contains(Column::CustomerName, name));
        }
        select
    }
}
