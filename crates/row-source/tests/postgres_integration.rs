//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and truncate the shop tables
//! before each test, so they run serially. They need a Docker daemon:
//!
//! ```bash
//! cargo test -p row-source --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{CustomerId, LineItemId, OrderId, ProductId, ShipmentId};
use futures_util::TryStreamExt;
use row_source::{
    Column, CustomerRecord, Filter, LineItemRecord, OrderRecord, PostgresRowSource,
    ProductRecord, RowSource, RowSourceError, Select, ShipmentRecord, Table, UnitOfWork, Write,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_shop_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_source() -> PostgresRowSource {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE line_items, orders, shipments, products, customers")
        .execute(&pool)
        .await
        .unwrap();

    PostgresRowSource::new(pool)
}

/// Writes one customer, one product and `orders` orders with two line items each.
async fn seed(source: &PostgresRowSource, orders: i64) {
    let customer_id = CustomerId::new(source.next_id(Table::Customers).await.unwrap());
    let product_id = ProductId::new(source.next_id(Table::Products).await.unwrap());

    let mut writes = vec![
        Write::InsertCustomer(CustomerRecord {
            id: customer_id,
            name: "Kim".into(),
            city: "Seoul".into(),
            street: "Main".into(),
            zipcode: "04524".into(),
        }),
        Write::InsertProduct(ProductRecord {
            id: product_id,
            name: "Book A".into(),
            price: 5000,
            stock_quantity: 100,
        }),
    ];

    for _ in 0..orders {
        let shipment_id = ShipmentId::new(source.next_id(Table::Shipments).await.unwrap());
        let order_id = OrderId::new(source.next_id(Table::Orders).await.unwrap());
        writes.push(Write::InsertShipment(ShipmentRecord {
            id: shipment_id,
            city: "Seoul".into(),
            street: "Main".into(),
            zipcode: "04524".into(),
            status: "READY".into(),
        }));
        writes.push(Write::InsertOrder(OrderRecord {
            id: order_id,
            customer_id,
            shipment_id,
            status: "PLACED".into(),
            ordered_at: Utc::now(),
        }));
        for quantity in [2, 1] {
            writes.push(Write::InsertLineItem(LineItemRecord {
                id: LineItemId::new(source.next_id(Table::LineItems).await.unwrap()),
                order_id,
                product_id,
                unit_price: 5000,
                quantity,
            }));
        }
    }

    source.commit(writes).await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn joined_rows_decode_with_aliases() {
    let source = get_test_source().await;
    seed(&source, 1).await;

    let query = Select::from_table(Table::Orders)
        .join(Table::Customers)
        .join(Table::Shipments)
        .join(Table::LineItems)
        .join(Table::Products)
        .order_by(Column::LineItemId)
        .build()
        .unwrap();

    let rows = source.fetch_all(&query).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].column::<String>(Column::CustomerName).unwrap(), "Kim");
    assert_eq!(rows[0].column::<i64>(Column::LineItemQuantity).unwrap(), 2);
    assert_eq!(rows[1].column::<i64>(Column::LineItemQuantity).unwrap(), 1);
    assert!(rows[0].column::<chrono::DateTime<Utc>>(Column::OrderedAt).is_ok());
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn in_list_and_paging_bind_parameters() {
    let source = get_test_source().await;
    seed(&source, 3).await;

    let roots = Select::from_table(Table::Orders)
        .select(&[Column::OrderId])
        .order_by(Column::OrderId)
        .limit(2)
        .offset(1)
        .build()
        .unwrap();
    let rows = source.fetch_all(&roots).await.unwrap();
    assert_eq!(rows.len(), 2);

    let ids: Vec<i64> = rows
        .iter()
        .map(|row| row.column::<i64>(Column::OrderId).unwrap())
        .collect();
    let children = Select::from_table(Table::LineItems)
        .filter(Filter::in_list(Column::LineItemOrderId, ids))
        .build()
        .unwrap();
    assert_eq!(source.fetch_all(&children).await.unwrap().len(), 4);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn left_join_pads_missing_children_with_nulls() {
    let source = get_test_source().await;
    seed(&source, 0).await;

    let customer_id = CustomerId::new(source.next_id(Table::Customers).await.unwrap());
    let shipment_id = ShipmentId::new(source.next_id(Table::Shipments).await.unwrap());
    let order_id = OrderId::new(source.next_id(Table::Orders).await.unwrap());
    source
        .commit(vec![
            Write::InsertCustomer(CustomerRecord {
                id: customer_id,
                name: "Lee".into(),
                city: "Busan".into(),
                street: "Harbor".into(),
                zipcode: "48058".into(),
            }),
            Write::InsertShipment(ShipmentRecord {
                id: shipment_id,
                city: "Busan".into(),
                street: "Harbor".into(),
                zipcode: "48058".into(),
                status: "READY".into(),
            }),
            Write::InsertOrder(OrderRecord {
                id: order_id,
                customer_id,
                shipment_id,
                status: "PLACED".into(),
                ordered_at: Utc::now(),
            }),
        ])
        .await
        .unwrap();

    let query = Select::from_table(Table::Orders)
        .left_join(Table::LineItems)
        .build()
        .unwrap();
    let rows = source.fetch_all(&query).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].column::<Option<i64>>(Column::LineItemId).unwrap(),
        None
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn streaming_fetch_yields_every_row() {
    let source = get_test_source().await;
    seed(&source, 2).await;

    let query = Select::from_table(Table::LineItems).build().unwrap();
    let rows: Vec<_> = source
        .fetch(&query)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn stock_guard_rolls_back_commit() {
    let source = get_test_source().await;
    seed(&source, 0).await;

    let product_id = Select::from_table(Table::Products).build().unwrap();
    let rows = source.fetch_all(&product_id).await.unwrap();
    let product_id = ProductId::new(rows[0].column::<i64>(Column::ProductId).unwrap());

    let result = source
        .commit(vec![
            Write::AdjustProductStock {
                product_id,
                delta: 50,
            },
            Write::AdjustProductStock {
                product_id,
                delta: -1_000,
            },
        ])
        .await;
    assert!(matches!(
        result,
        Err(RowSourceError::WriteConflict {
            table: Table::Products,
            ..
        })
    ));

    let rows = source.fetch_all(&Select::from_table(Table::Products).build().unwrap()).await.unwrap();
    assert_eq!(rows[0].column::<i64>(Column::ProductStock).unwrap(), 100);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn concurrent_stock_adjustments_do_not_oversell() {
    let source = get_test_source().await;
    seed(&source, 0).await;

    let rows = source.fetch_all(&Select::from_table(Table::Products).build().unwrap()).await.unwrap();
    let product_id = ProductId::new(rows[0].column::<i64>(Column::ProductId).unwrap());
    let take = |delta| {
        source.commit(vec![Write::AdjustProductStock { product_id, delta }])
    };

    let (first, second) = tokio::join!(take(-60), take(-60));
    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);

    let rows = source.fetch_all(&Select::from_table(Table::Products).build().unwrap()).await.unwrap();
    assert_eq!(rows[0].column::<i64>(Column::ProductStock).unwrap(), 40);
}
