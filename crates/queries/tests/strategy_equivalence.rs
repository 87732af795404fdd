//! Integration tests for the order loaders.
//!
//! Every strategy runs against the same seeded in-memory store. The tests
//! check that the strategies agree, count the round trips each one takes,
//! and check that misconfigured loads fail before any query runs.

use common::{CustomerId, OrderId, ProductId, ShipmentId};
use domain::{Address, Money, OrderLine, OrderService, OrderStatus};
use queries::{
    ConfigurationError, FetchPlan, LoadError, LoaderConfig, OrderLoader, OrderSearch, OrderView,
    Relation, Strategy,
};
use row_source::{
    CountingRowSource, InMemoryRowSource, OrderRecord, RowSourceError, ShipmentRecord, Table,
    UnitOfWork, Write,
};

struct Shop {
    source: InMemoryRowSource,
    kim: CustomerId,
    lee: CustomerId,
    book_a: ProductId,
    book_b: ProductId,
    book_c: ProductId,
}

async fn create_shop() -> Shop {
    let source = InMemoryRowSource::new();
    let service = OrderService::new(source.clone());

    let kim = service
        .register_customer("Kim", Address::new("Seoul", "Main", "04524"))
        .await
        .unwrap()
        .id();
    let lee = service
        .register_customer("Lee", Address::new("Busan", "Harbor", "48058"))
        .await
        .unwrap()
        .id();
    let book_a = service
        .add_product("Book A", Money::new(5000), 1_000)
        .await
        .unwrap()
        .id();
    let book_b = service
        .add_product("Book B", Money::new(3000), 1_000)
        .await
        .unwrap()
        .id();
    let book_c = service
        .add_product("Book C", Money::new(1000), 1_000)
        .await
        .unwrap()
        .id();

    Shop {
        source,
        kim,
        lee,
        book_a,
        book_b,
        book_c,
    }
}

impl Shop {
    fn service(&self) -> OrderService<InMemoryRowSource> {
        OrderService::new(self.source.clone())
    }

    /// Places `count` orders alternating between customers, with one to
    /// three line items each.
    async fn place_orders(&self, count: usize) -> Vec<OrderId> {
        let service = self.service();
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let customer = if i % 2 == 0 { self.kim } else { self.lee };
            let lines = match i % 3 {
                0 => vec![OrderLine::new(self.book_a, 2), OrderLine::new(self.book_b, 1)],
                1 => vec![OrderLine::new(self.book_c, 5)],
                _ => vec![
                    OrderLine::new(self.book_b, 1),
                    OrderLine::new(self.book_c, 1),
                    OrderLine::new(self.book_a, 1),
                ],
            };
            ids.push(service.place_order(customer, &lines).await.unwrap().id());
        }
        ids
    }

    /// Inserts an order that has no line items.
    async fn insert_empty_order(&self) -> OrderId {
        let order_id = OrderId::new(self.source.next_id(Table::Orders).await.unwrap());
        let shipment_id = ShipmentId::new(self.source.next_id(Table::Shipments).await.unwrap());
        self.source
            .commit(vec![
                Write::InsertShipment(ShipmentRecord {
                    id: shipment_id,
                    city: "Seoul".into(),
                    street: "Main".into(),
                    zipcode: "04524".into(),
                    status: "READY".into(),
                }),
                Write::InsertOrder(OrderRecord {
                    id: order_id,
                    customer_id: self.kim,
                    shipment_id,
                    status: "PLACED".into(),
                    ordered_at: chrono::Utc::now(),
                }),
            ])
            .await
            .unwrap();
        order_id
    }
}

async fn load_batched(
    loader: &OrderLoader<'_, InMemoryRowSource>,
    search: &OrderSearch,
    batch_size: usize,
) -> Vec<OrderView> {
    let roots = loader.load_roots(search, None).await.unwrap();
    loader
        .attach_children_batched(roots, batch_size)
        .await
        .unwrap()
}

mod equivalence {
    use super::*;

    #[tokio::test]
    async fn all_child_loading_strategies_agree() {
        let shop = create_shop().await;
        shop.place_orders(7).await;
        let loader = OrderLoader::new(&shop.source);
        let search = OrderSearch::all();

        let batched = load_batched(&loader, &search, 3).await;
        let flat = loader.load_flat_and_group(&search).await.unwrap();
        let joined = loader.load_with_fetch_join(&search).await.unwrap();
        let roots = loader.load_roots(&search, None).await.unwrap();
        let per_root = loader.attach_children_per_root(roots).await.unwrap();

        assert_eq!(batched.len(), 7);
        assert_eq!(batched, flat);
        assert_eq!(batched, joined);
        assert_eq!(batched, per_root);
    }

    #[tokio::test]
    async fn strategies_agree_under_filters() {
        let shop = create_shop().await;
        let ids = shop.place_orders(6).await;
        shop.service().cancel_order(ids[0]).await.unwrap();
        shop.service().cancel_order(ids[3]).await.unwrap();
        let loader = OrderLoader::new(&shop.source);

        let cancelled = OrderSearch::all().with_status(OrderStatus::Cancelled);
        let batched = load_batched(&loader, &cancelled, 100).await;
        let flat = loader.load_flat_and_group(&cancelled).await.unwrap();
        let joined = loader.load_with_fetch_join(&cancelled).await.unwrap();
        let order_ids: Vec<OrderId> = batched.iter().map(|order| order.order_id).collect();
        assert_eq!(order_ids, vec![ids[0], ids[3]]);
        assert_eq!(batched, flat);
        assert_eq!(batched, joined);

        let lee = OrderSearch::all().with_customer_name("e");
        let batched = load_batched(&loader, &lee, 100).await;
        let flat = loader.load_flat_and_group(&lee).await.unwrap();
        assert_eq!(batched.len(), 3);
        assert!(batched.iter().all(|order| order.customer_name == "Lee"));
        assert_eq!(batched, flat);
    }

    #[tokio::test]
    async fn orders_without_line_items_are_kept() {
        let shop = create_shop().await;
        shop.place_orders(2).await;
        let empty = shop.insert_empty_order().await;
        let loader = OrderLoader::new(&shop.source);
        let search = OrderSearch::all();

        let batched = load_batched(&loader, &search, 100).await;
        let flat = loader.load_flat_and_group(&search).await.unwrap();
        let joined = loader.load_with_fetch_join(&search).await.unwrap();

        let last = batched.last().unwrap();
        assert_eq!(last.order_id, empty);
        assert!(last.line_items.is_empty());
        assert_eq!(batched, flat);
        assert_eq!(batched, joined);
    }

    #[tokio::test]
    async fn roots_only_leaves_line_items_empty() {
        let shop = create_shop().await;
        shop.place_orders(3).await;
        let loader = OrderLoader::new(&shop.source);

        let roots = loader
            .load(Strategy::RootsOnly, &OrderSearch::all(), None)
            .await
            .unwrap();

        assert_eq!(roots.len(), 3);
        assert!(roots.iter().all(|order| order.line_items.is_empty()));
        assert_eq!(roots[0].customer_name, "Kim");
        assert_eq!(roots[0].delivery.address.city, "Seoul");
    }

    #[tokio::test]
    async fn empty_store_is_not_an_error() {
        let shop = create_shop().await;
        let loader = OrderLoader::new(&shop.source);

        for strategy in Strategy::ALL {
            let orders = loader
                .load(strategy, &OrderSearch::all(), None)
                .await
                .unwrap();
            assert!(orders.is_empty(), "{strategy} returned orders");
        }
    }
}

mod scenario {
    use super::*;

    #[tokio::test]
    async fn kim_order_groups_two_rows_into_one_root() {
        let shop = create_shop().await;
        let order = shop
            .service()
            .place_order(
                shop.kim,
                &[
                    OrderLine::new(shop.book_a, 2),
                    OrderLine::new(shop.book_b, 1),
                ],
            )
            .await
            .unwrap();
        let loader = OrderLoader::new(&shop.source);
        let search = OrderSearch::all().with_customer_name("Kim");

        shop.source.clear_log().await;
        let flat = loader.load_flat_and_group(&search).await.unwrap();
        let log = shop.source.query_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].rows, 2);

        shop.source.clear_log().await;
        let joined = loader.load_with_fetch_join(&search).await.unwrap();
        let log = shop.source.query_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].rows, 2);

        assert_eq!(flat, joined);
        assert_eq!(flat.len(), 1);
        let root = &flat[0];
        assert_eq!(root.order_id, order.id());
        assert_eq!(root.customer_name, "Kim");

        let lines: Vec<(&str, u32, Money)> = root
            .line_items
            .iter()
            .map(|line| (line.product_name.as_str(), line.quantity, line.unit_price))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("Book A", 2, Money::new(5000)),
                ("Book B", 1, Money::new(3000)),
            ]
        );
        assert_eq!(root.total_price(), Money::new(13000));
    }

    #[tokio::test]
    async fn unit_price_stays_after_catalog_change() {
        let shop = create_shop().await;
        shop.service()
            .place_order(shop.kim, &[OrderLine::new(shop.book_a, 1)])
            .await
            .unwrap();
        shop.service()
            .update_product(shop.book_a, "Book A", Money::new(7000), 10)
            .await
            .unwrap();
        let loader = OrderLoader::new(&shop.source);

        let orders = loader
            .load(Strategy::FetchJoin, &OrderSearch::all(), None)
            .await
            .unwrap();

        let line = &orders[0].line_items[0];
        assert_eq!(line.unit_price, Money::new(5000));
        assert_eq!(line.product_price, Money::new(7000));
    }
}

mod round_trips {
    use super::*;

    #[tokio::test]
    async fn batched_loading_takes_one_query_per_chunk() {
        let shop = create_shop().await;
        shop.place_orders(10).await;
        let counting = CountingRowSource::new(shop.source.clone());
        let loader = OrderLoader::new(&counting);

        let roots = loader.load_roots(&OrderSearch::all(), None).await.unwrap();
        let orders = loader.attach_children_batched(roots, 3).await.unwrap();

        assert_eq!(orders.len(), 10);
        assert_eq!(counting.stats().queries, 1 + 4);
        assert_eq!(
            Strategy::RootsThenBatched.expected_round_trips(10, 3),
            counting.stats().queries
        );
    }

    #[tokio::test]
    async fn child_query_count_ignores_child_count() {
        let shop = create_shop().await;
        let service = shop.service();
        let many_lines: Vec<OrderLine> = (0..20).map(|_| OrderLine::new(shop.book_c, 1)).collect();
        for _ in 0..4 {
            service.place_order(shop.kim, &many_lines).await.unwrap();
        }
        let loader = OrderLoader::new(&shop.source);
        let roots = loader.load_roots(&OrderSearch::all(), None).await.unwrap();

        shop.source.clear_log().await;
        let orders = loader.attach_children_batched(roots, 2).await.unwrap();

        let log = shop.source.query_log().await;
        assert_eq!(log.len(), 2);
        assert_eq!(log.iter().map(|entry| entry.rows).sum::<usize>(), 80);
        assert!(orders.iter().all(|order| order.line_items.len() == 20));
    }

    #[tokio::test]
    async fn duplicate_keys_are_loaded_once() {
        let shop = create_shop().await;
        let ids = shop.place_orders(2).await;
        let loader = OrderLoader::new(&shop.source);

        shop.source.clear_log().await;
        let children = loader
            .load_line_items(&[ids[0], ids[1], ids[0], ids[1]], 2)
            .await
            .unwrap();

        let log = shop.source.query_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].parameters, 2);
        assert_eq!(children[&ids[0]].len(), 2);
        assert_eq!(children[&ids[1]].len(), 1);
    }

    #[tokio::test]
    async fn no_keys_means_no_child_query() {
        let shop = create_shop().await;
        let loader = OrderLoader::new(&shop.source);

        let children = loader.load_line_items(&[], 10).await.unwrap();

        assert!(children.is_empty());
        assert!(shop.source.query_log().await.is_empty());
    }

    #[tokio::test]
    async fn wide_strategies_take_one_query() {
        let shop = create_shop().await;
        shop.place_orders(5).await;
        let counting = CountingRowSource::new(shop.source.clone());
        let loader = OrderLoader::new(&counting);

        loader.load_with_fetch_join(&OrderSearch::all()).await.unwrap();
        assert_eq!(counting.stats().queries, 1);

        counting.reset();
        loader.load_flat_and_group(&OrderSearch::all()).await.unwrap();
        assert_eq!(counting.stats().queries, 1);
    }
}

mod rechunking {
    use super::*;

    #[tokio::test]
    async fn oversized_chunks_are_split_and_retried() {
        let shop = create_shop().await;
        shop.place_orders(5).await;
        let expected = load_batched(&OrderLoader::new(&shop.source), &OrderSearch::all(), 5).await;

        let limited = shop.source.clone().with_parameter_limit(2);
        let loader = OrderLoader::new(&limited);
        let roots = loader.load_roots(&OrderSearch::all(), None).await.unwrap();
        limited.clear_log().await;
        let orders = loader.attach_children_batched(roots, 5).await.unwrap();

        assert_eq!(orders, expected);
        let log = limited.query_log().await;
        let parameters: Vec<usize> = log.iter().map(|entry| entry.parameters).collect();
        assert_eq!(parameters, vec![2, 1, 2]);
    }

    #[tokio::test]
    async fn configured_parameter_limit_caps_chunk_size() {
        let shop = create_shop().await;
        shop.place_orders(5).await;
        let config = LoaderConfig::default().with_max_parameters(2);
        let loader = OrderLoader::with_config(&shop.source, config).unwrap();
        let roots = loader.load_roots(&OrderSearch::all(), None).await.unwrap();

        shop.source.clear_log().await;
        loader.attach_children_batched(roots, 100).await.unwrap();

        let parameters: Vec<usize> = shop
            .source
            .query_log()
            .await
            .iter()
            .map(|entry| entry.parameters)
            .collect();
        assert_eq!(parameters, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn single_key_over_the_limit_is_an_error() {
        let shop = create_shop().await;
        let ids = shop.place_orders(1).await;
        let limited = shop.source.clone().with_parameter_limit(0);
        let loader = OrderLoader::new(&limited);

        let result = loader.load_line_items(&ids, 10).await;

        assert!(matches!(
            result,
            Err(LoadError::RowSource(RowSourceError::TooManyParameters {
                count: 1,
                limit: 0
            }))
        ));
    }
}

mod pagination {
    use super::*;

    #[tokio::test]
    async fn root_pages_count_distinct_orders() {
        let shop = create_shop().await;
        let ids = shop.place_orders(5).await;
        let loader = OrderLoader::new(&shop.source);

        let page = loader
            .load(
                Strategy::RootsThenBatched,
                &OrderSearch::all().with_limit(2),
                Some(2),
            )
            .await
            .unwrap();

        let page_ids: Vec<OrderId> = page.iter().map(|order| order.order_id).collect();
        assert_eq!(page_ids, vec![ids[2], ids[3]]);
        assert!(page.iter().all(|order| !order.line_items.is_empty()));
    }

    #[tokio::test]
    async fn root_limit_caps_requested_limit() {
        let shop = create_shop().await;
        shop.place_orders(5).await;
        let config = LoaderConfig::default().with_root_limit(3);
        let loader = OrderLoader::with_config(&shop.source, config).unwrap();

        let capped = loader
            .load_roots(&OrderSearch::all().with_limit(10), None)
            .await
            .unwrap();
        let defaulted = loader.load_roots(&OrderSearch::all(), None).await.unwrap();

        assert_eq!(capped.len(), 3);
        assert_eq!(defaulted.len(), 3);
    }
}

mod configuration {
    use super::*;

    #[tokio::test]
    async fn second_collection_is_rejected_before_querying() {
        let shop = create_shop().await;
        shop.place_orders(2).await;
        let loader = OrderLoader::new(&shop.source);
        shop.source.clear_log().await;

        let plan = FetchPlan::order_graph().with(Relation::CustomerOrders);
        let result = loader.load_with_fetch_plan(&plan, &OrderSearch::all()).await;

        assert!(matches!(
            result,
            Err(LoadError::Configuration(
                ConfigurationError::MultipleCollectionFetch { .. }
            ))
        ));
        assert!(shop.source.query_log().await.is_empty());
    }

    #[tokio::test]
    async fn wide_strategies_reject_limits_and_offsets() {
        let shop = create_shop().await;
        shop.place_orders(2).await;
        let loader = OrderLoader::new(&shop.source);
        shop.source.clear_log().await;
        let limited = OrderSearch::all().with_limit(1);

        for strategy in [Strategy::FetchJoin, Strategy::FlatGrouped] {
            let with_limit = loader.load(strategy, &limited, None).await;
            assert!(matches!(
                with_limit,
                Err(LoadError::Configuration(
                    ConfigurationError::PaginationUnsupported { strategy: s }
                )) if s == strategy
            ));

            let with_offset = loader.load(strategy, &OrderSearch::all(), Some(1)).await;
            assert!(matches!(
                with_offset,
                Err(LoadError::Configuration(
                    ConfigurationError::PaginationUnsupported { .. }
                ))
            ));
        }
        assert!(shop.source.query_log().await.is_empty());
    }

    #[tokio::test]
    async fn zero_batch_size_is_rejected() {
        let shop = create_shop().await;
        let ids = shop.place_orders(1).await;
        let loader = OrderLoader::new(&shop.source);
        shop.source.clear_log().await;

        let result = loader.load_line_items(&ids, 0).await;

        assert!(matches!(
            result,
            Err(LoadError::Configuration(ConfigurationError::InvalidBatchSize))
        ));
        assert!(shop.source.query_log().await.is_empty());
        assert!(matches!(
            OrderLoader::with_config(&shop.source, LoaderConfig::default().with_batch_size(0)),
            Err(LoadError::Configuration(ConfigurationError::InvalidBatchSize))
        ));
    }
}
