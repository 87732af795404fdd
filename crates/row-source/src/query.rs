//! Query builder that validates a select against the schema and renders
//! parameterized PostgreSQL.

use crate::{Column, Result, Row, RowSourceError, Table, Value};

/// A predicate in a `WHERE` clause. All filters of a query are combined with `AND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column = value`
    Eq(Column, Value),
    /// `column LIKE '%needle%'`, matched literally.
    Contains(Column, String),
    /// `column IN (v1, v2, ...)`, one bound parameter per value.
    In(Column, Vec<Value>),
}

impl Filter {
    /// Creates an equality filter.
    pub fn eq(column: Column, value: impl Into<Value>) -> Self {
        Filter::Eq(column, value.into())
    }

    /// Creates a substring filter.
    pub fn contains(column: Column, needle: impl Into<String>) -> Self {
        Filter::Contains(column, needle.into())
    }

    /// Creates an `IN` list filter.
    pub fn in_list<V: Into<Value>>(column: Column, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(column, values.into_iter().map(Into::into).collect())
    }

    /// Returns the column this filter constrains.
    pub fn column(&self) -> Column {
        match self {
            Filter::Eq(column, _) | Filter::Contains(column, _) | Filter::In(column, _) => *column,
        }
    }

    /// Returns the number of parameters this filter binds.
    pub fn parameter_count(&self) -> usize {
        match self {
            Filter::Eq(..) | Filter::Contains(..) => 1,
            Filter::In(_, values) => values.len(),
        }
    }

    /// Evaluates the filter against a row.
    pub fn matches(&self, row: &Row) -> bool {
        let Some(actual) = row.get(self.column().alias()) else {
            return false;
        };
        match self {
            Filter::Eq(_, expected) => actual.sql_eq(expected),
            Filter::Contains(_, needle) => {
                matches!(actual, Value::Text(text) if text.contains(needle.as_str()))
            }
            Filter::In(_, values) => values.iter().any(|value| actual.sql_eq(value)),
        }
    }
}

/// How a joined table is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Parent rows without a match are dropped.
    Inner,
    /// Parent rows without a match are kept with `NULL`s for the joined columns.
    Left,
}

/// A table joined along its foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Join {
    pub table: Table,
    pub kind: JoinKind,
}

/// Builder for a select over the shop schema.
///
/// Joins always follow the schema's foreign keys (see [`Table::join_key`]),
/// so a select only names which tables to bring in.
#[derive(Debug, Clone)]
pub struct Select {
    /// The driving table.
    pub from: Table,

    /// Joined tables, in join order.
    pub joins: Vec<Join>,

    /// Explicit projection. `None` selects every column of every table.
    pub projection: Option<Vec<Column>>,

    /// Predicates combined with `AND`.
    pub filters: Vec<Filter>,

    /// Ascending sort keys.
    pub order_by: Vec<Column>,

    /// Maximum number of rows to return.
    pub limit: Option<usize>,

    /// Number of rows to skip.
    pub offset: Option<usize>,
}

impl Select {
    /// Starts a select driven by `table`.
    pub fn from_table(table: Table) -> Self {
        Self {
            from: table,
            joins: Vec::new(),
            projection: None,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Inner-joins a table.
    pub fn join(mut self, table: Table) -> Self {
        self.joins.push(Join {
            table,
            kind: JoinKind::Inner,
        });
        self
    }

    /// Left-joins a table.
    pub fn left_join(mut self, table: Table) -> Self {
        self.joins.push(Join {
            table,
            kind: JoinKind::Left,
        });
        self
    }

    /// Restricts the projection to the given columns.
    pub fn select(mut self, columns: &[Column]) -> Self {
        self.projection = Some(columns.to_vec());
        self
    }

    /// Adds a predicate.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds an ascending sort key.
    pub fn order_by(mut self, column: Column) -> Self {
        self.order_by.push(column);
        self
    }

    /// Limits the number of rows returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many rows before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns every table the select touches, driving table first.
    pub fn tables(&self) -> Vec<Table> {
        std::iter::once(self.from)
            .chain(self.joins.iter().map(|join| join.table))
            .collect()
    }

    /// Validates the select and renders it.
    pub fn build(self) -> Result<Query> {
        let mut tables = vec![self.from];
        for join in &self.joins {
            if tables.contains(&join.table) {
                return Err(RowSourceError::InvalidQuery(format!(
                    "table {} is joined twice",
                    join.table
                )));
            }
            let parent = join.table.join_parent();
            if !tables.contains(&parent) {
                return Err(RowSourceError::InvalidQuery(format!(
                    "cannot join {}: {} is not part of the query",
                    join.table, parent
                )));
            }
            tables.push(join.table);
        }

        let columns: Vec<Column> = match &self.projection {
            Some(columns) if columns.is_empty() => {
                return Err(RowSourceError::InvalidQuery(
                    "projection selects no columns".to_string(),
                ));
            }
            Some(columns) => columns.clone(),
            None => tables
                .iter()
                .flat_map(|table| table.columns().iter().copied())
                .collect(),
        };

        let referenced = columns
            .iter()
            .copied()
            .chain(self.filters.iter().map(Filter::column))
            .chain(self.order_by.iter().copied());
        for column in referenced {
            if !tables.contains(&column.table()) {
                return Err(RowSourceError::InvalidQuery(format!(
                    "column {} references {}, which is not part of the query",
                    column.alias(),
                    column.table()
                )));
            }
        }

        for filter in &self.filters {
            if let Filter::In(column, values) = filter
                && values.is_empty()
            {
                return Err(RowSourceError::InvalidQuery(format!(
                    "empty IN list for {}",
                    column.alias()
                )));
            }
        }

        let (sql, params) = render(&self, &columns);
        Ok(Query {
            select: self,
            columns,
            sql,
            params,
        })
    }
}

/// A validated, rendered query.
#[derive(Debug, Clone)]
pub struct Query {
    select: Select,
    columns: Vec<Column>,
    sql: String,
    params: Vec<Value>,
}

impl Query {
    /// Returns the select this query was built from.
    pub fn select(&self) -> &Select {
        &self.select
    }

    /// Returns the projected columns, in select order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the rendered SQL with `$n` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the bound parameters, in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Returns the number of bound parameters.
    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }
}

fn render(select: &Select, columns: &[Column]) -> (String, Vec<Value>) {
    let mut params = Vec::new();
    let mut placeholder = |value: Value, params: &mut Vec<Value>| {
        params.push(value);
        format!("${}", params.len())
    };

    let projection = columns
        .iter()
        .map(|column| format!("{} AS {}", column.qualified(), column.alias()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "SELECT {} FROM {} {}",
        projection,
        select.from.name(),
        select.from.alias()
    );

    for join in &select.joins {
        let (own, parent) = join.table.join_key();
        let keyword = match join.kind {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
        };
        sql.push_str(&format!(
            " {} {} {} ON {} = {}",
            keyword,
            join.table.name(),
            join.table.alias(),
            own.qualified(),
            parent.qualified()
        ));
    }

    let predicates: Vec<String> = select
        .filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, value) => {
                format!(
                    "{} = {}",
                    column.qualified(),
                    placeholder(value.clone(), &mut params)
                )
            }
            Filter::Contains(column, needle) => {
                let pattern = Value::Text(format!("%{}%", escape_like(needle)));
                format!(
                    "{} LIKE {}",
                    column.qualified(),
                    placeholder(pattern, &mut params)
                )
            }
            Filter::In(column, values) => {
                let list = values
                    .iter()
                    .map(|value| placeholder(value.clone(), &mut params))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} IN ({})", column.qualified(), list)
            }
        })
        .collect();
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    if !select.order_by.is_empty() {
        let keys = select
            .order_by
            .iter()
            .map(Column::qualified)
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys);
    }

    if let Some(limit) = select.limit {
        let limit = placeholder(Value::Int(limit as i64), &mut params);
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = select.offset {
        let offset = placeholder(Value::Int(offset as i64), &mut params);
        sql.push_str(&format!(" OFFSET {offset}"));
    }

    (sql, params)
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
