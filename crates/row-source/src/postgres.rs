use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use sqlx::{
    Column as _, PgPool, Postgres, Row as _, Transaction, TypeInfo as _,
    postgres::{PgArguments, PgRow},
};

use crate::{
    Query, Result, Row, RowSourceError, Table, Value,
    store::{POSTGRES_MAX_PARAMETERS, RowSource, RowStream, UnitOfWork, Write, check_parameter_limit},
};

/// PostgreSQL-backed row source.
#[derive(Clone)]
pub struct PostgresRowSource {
    pool: PgPool,
}

impl PostgresRowSource {
    /// Creates a new PostgreSQL row source.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn bind(query: &Query) -> sqlx::query::Query<'_, Postgres, PgArguments> {
        let mut statement = sqlx::query(query.sql());
        for value in query.params() {
            statement = match value {
                Value::Null => statement.bind(None::<i64>),
                Value::Int(v) => statement.bind(*v),
                Value::Text(v) => statement.bind(v.as_str()),
                Value::Timestamp(v) => statement.bind(*v),
            };
        }
        statement
    }

    fn decode(pg_row: &PgRow) -> Result<Row> {
        let mut row = Row::new();
        for (index, column) in pg_row.columns().iter().enumerate() {
            let value: Value = match column.type_info().name() {
                "INT8" => pg_row.try_get::<Option<i64>, _>(index)?.into(),
                "INT4" => pg_row.try_get::<Option<i32>, _>(index)?.map(i64::from).into(),
                "TEXT" | "VARCHAR" => pg_row.try_get::<Option<String>, _>(index)?.into(),
                "TIMESTAMPTZ" => pg_row.try_get::<Option<DateTime<Utc>>, _>(index)?.into(),
                other => {
                    return Err(RowSourceError::UnsupportedColumnType {
                        column: column.name().to_string(),
                        type_name: other.to_string(),
                    });
                }
            };
            row.push(column.name(), value);
        }
        Ok(row)
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, write: Write) -> Result<()> {
        let result = match &write {
            Write::InsertCustomer(record) => {
                sqlx::query(
                    "INSERT INTO customers (id, name, city, street, zipcode) VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(record.id.get())
                .bind(&record.name)
                .bind(&record.city)
                .bind(&record.street)
                .bind(&record.zipcode)
                .execute(&mut **tx)
                .await
            }
            Write::InsertProduct(record) => {
                sqlx::query(
                    "INSERT INTO products (id, name, price, stock_quantity) VALUES ($1, $2, $3, $4)",
                )
                .bind(record.id.get())
                .bind(&record.name)
                .bind(record.price)
                .bind(record.stock_quantity)
                .execute(&mut **tx)
                .await
            }
            Write::UpdateProduct(record) => {
                sqlx::query(
                    "UPDATE products SET name = $2, price = $3, stock_quantity = $4 WHERE id = $1",
                )
                .bind(record.id.get())
                .bind(&record.name)
                .bind(record.price)
                .bind(record.stock_quantity)
                .execute(&mut **tx)
                .await
            }
            Write::AdjustProductStock { product_id, delta } => {
                sqlx::query(
                    "UPDATE products SET stock_quantity = stock_quantity + $2 WHERE id = $1 AND stock_quantity + $2 >= 0",
                )
                .bind(product_id.get())
                .bind(*delta)
                .execute(&mut **tx)
                .await
            }
            Write::InsertShipment(record) => {
                sqlx::query(
                    "INSERT INTO shipments (id, city, street, zipcode, status) VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(record.id.get())
                .bind(&record.city)
                .bind(&record.street)
                .bind(&record.zipcode)
                .bind(&record.status)
                .execute(&mut **tx)
                .await
            }
            Write::UpdateShipmentStatus {
                shipment_id,
                from,
                to,
            } => {
                sqlx::query("UPDATE shipments SET status = $2 WHERE id = $1 AND status = $3")
                    .bind(shipment_id.get())
                    .bind(to)
                    .bind(from)
                    .execute(&mut **tx)
                    .await
            }
            Write::InsertOrder(record) => {
                sqlx::query(
                    "INSERT INTO orders (id, customer_id, shipment_id, status, ordered_at) VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(record.id.get())
                .bind(record.customer_id.get())
                .bind(record.shipment_id.get())
                .bind(&record.status)
                .bind(record.ordered_at)
                .execute(&mut **tx)
                .await
            }
            Write::UpdateOrderStatus { order_id, from, to } => {
                sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status = $3")
                    .bind(order_id.get())
                    .bind(to)
                    .bind(from)
                    .execute(&mut **tx)
                    .await
            }
            Write::InsertLineItem(record) => {
                sqlx::query(
                    "INSERT INTO line_items (id, order_id, product_id, unit_price, quantity) VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(record.id.get())
                .bind(record.order_id.get())
                .bind(record.product_id.get())
                .bind(record.unit_price)
                .bind(record.quantity)
                .execute(&mut **tx)
                .await
            }
        };

        let done = result.map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && (db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation())
            {
                return RowSourceError::ConstraintViolation(db_err.message().to_string());
            }
            RowSourceError::Database(e)
        })?;

        if done.rows_affected() == 0 {
            if let Some(id) = write.guarded_id() {
                return Err(RowSourceError::WriteConflict {
                    table: write.table(),
                    id,
                    reason: format!("guard of {write:?} no longer holds"),
                });
            }
            return Err(RowSourceError::ConstraintViolation(format!(
                "{} row targeted by {:?} does not exist",
                write.table(),
                write
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RowSource for PostgresRowSource {
    #[tracing::instrument(skip(self, query), fields(parameters = query.parameter_count()))]
    async fn fetch_all(&self, query: &Query) -> Result<Vec<Row>> {
        check_parameter_limit(query, POSTGRES_MAX_PARAMETERS)?;

        let pg_rows = Self::bind(query).fetch_all(&self.pool).await?;
        let rows = pg_rows
            .iter()
            .map(Self::decode)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(sql = query.sql(), rows = rows.len(), "executed query");
        metrics::counter!("row_source_queries_total", "backend" => "postgres").increment(1);
        Ok(rows)
    }

    async fn fetch<'a>(&'a self, query: &'a Query) -> Result<RowStream<'a>> {
        check_parameter_limit(query, POSTGRES_MAX_PARAMETERS)?;

        tracing::debug!(sql = query.sql(), "streaming query");
        metrics::counter!("row_source_queries_total", "backend" => "postgres").increment(1);

        let stream = Self::bind(query)
            .fetch(&self.pool)
            .map(|result| match result {
                Ok(row) => Self::decode(&row),
                Err(e) => Err(RowSourceError::Database(e)),
            });

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl UnitOfWork for PostgresRowSource {
    async fn next_id(&self, table: Table) -> Result<i64> {
        let id: i64 = sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence($1, 'id'))")
            .bind(table.name())
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    #[tracing::instrument(skip(self, writes), fields(writes = writes.len()))]
    async fn commit(&self, writes: Vec<Write>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for write in writes {
            Self::apply(&mut tx, write).await?;
        }
        tx.commit().await?;

        metrics::counter!("row_source_commits_total", "backend" => "postgres").increment(1);
        Ok(())
    }
}
