//! End-to-end placement tests over a real SQLite database.

use common::{ItemId, UserId};
use placement::{
    DraftLine, GatewayKeyRegistry, GatewayOrderStore, GatewayStockLedger, OrderDraft,
    PlacementCoordinator, PlacementError,
};
use sqlx::sqlite::SqlitePoolOptions;
use store::{SqliteGateway, StoreGateway, Value};

type SqliteCoordinator = PlacementCoordinator<
    GatewayStockLedger<SqliteGateway>,
    GatewayOrderStore<SqliteGateway>,
    GatewayKeyRegistry<SqliteGateway>,
>;

async fn setup() -> (SqliteCoordinator, SqliteGateway) {
    // One connection so every statement sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let gateway = SqliteGateway::new(pool);
    gateway.run_migrations().await.unwrap();

    let coordinator = PlacementCoordinator::new(
        GatewayStockLedger::new(gateway.clone()),
        GatewayOrderStore::new(gateway.clone()),
        GatewayKeyRegistry::new(gateway.clone()),
    );
    (coordinator, gateway)
}

async fn seed_item(gateway: &SqliteGateway, title: &str, price: f64, in_stock: i64) -> i64 {
    let row = gateway
        .get(
            "INSERT INTO item (title, price, category, in_stock, sold_quantity) \
             VALUES (?, ?, ?, ?, 0) RETURNING id",
            &[
                Value::Text(title.into()),
                Value::Real(price),
                Value::Text("misc".into()),
                Value::Integer(in_stock),
            ],
        )
        .await
        .unwrap()
        .unwrap();
    row.integer("id").unwrap()
}

async fn item_state(gateway: &SqliteGateway, id: i64) -> (i64, i64) {
    let row = gateway
        .get(
            "SELECT in_stock, sold_quantity FROM item WHERE id = ?",
            &[Value::Integer(id)],
        )
        .await
        .unwrap()
        .unwrap();
    (
        row.integer("in_stock").unwrap(),
        row.integer("sold_quantity").unwrap(),
    )
}

async fn order_count(gateway: &SqliteGateway) -> i64 {
    let row = gateway
        .get("SELECT COUNT(*) AS n FROM orders", &[])
        .await
        .unwrap()
        .unwrap();
    row.integer("n").unwrap()
}

fn draft(user_id: i64, items: &[(i64, i64)]) -> OrderDraft {
    OrderDraft {
        user_id: Some(user_id),
        order_items: items
            .iter()
            .map(|(id, quantity)| DraftLine {
                id: *id,
                quantity: *quantity,
            })
            .collect(),
        idempotency_key: None,
    }
}

#[tokio::test]
async fn committed_placement_adjusts_stock_and_creates_rows() {
    let (coordinator, gateway) = setup().await;
    let item = seed_item(&gateway, "Widget", 9.99, 5).await;

    let receipt = coordinator.place(&draft(3, &[(item, 2)])).await.unwrap();

    assert_eq!(receipt.order_ids.len(), 1);
    assert_eq!(item_state(&gateway, item).await, (3, 2));

    let row = gateway
        .get(
            "SELECT user_id, item_id, quantity, status FROM orders WHERE id = ?",
            &[Value::Integer(receipt.order_ids[0].as_i64())],
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.integer("user_id").unwrap(), 3);
    assert_eq!(row.integer("item_id").unwrap(), item);
    assert_eq!(row.integer("quantity").unwrap(), 2);
    assert_eq!(row.text("status").unwrap(), "Placed");
}

#[tokio::test]
async fn insufficient_stock_leaves_the_store_untouched() {
    let (coordinator, gateway) = setup().await;
    let item = seed_item(&gateway, "Widget", 9.99, 5).await;

    let error = coordinator
        .place(&draft(3, &[(item, 10)]))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        PlacementError::InsufficientStock {
            available: 5,
            requested: 10,
            ..
        }
    ));
    assert_eq!(item_state(&gateway, item).await, (5, 0));
    assert_eq!(order_count(&gateway).await, 0);
}

#[tokio::test]
async fn infeasible_second_line_blocks_the_first() {
    let (coordinator, gateway) = setup().await;
    let first = seed_item(&gateway, "Widget", 9.99, 5).await;
    let second = seed_item(&gateway, "Gadget", 25.0, 0).await;

    let error = coordinator
        .place(&draft(3, &[(first, 2), (second, 1)]))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        PlacementError::InsufficientStock { available: 0, .. }
    ));
    assert_eq!(item_state(&gateway, first).await, (5, 0));
    assert_eq!(item_state(&gateway, second).await, (0, 0));
    assert_eq!(order_count(&gateway).await, 0);
}

#[tokio::test]
async fn missing_item_is_not_found() {
    let (coordinator, gateway) = setup().await;

    let error = coordinator.place(&draft(3, &[(999, 1)])).await.unwrap_err();

    assert!(matches!(
        error,
        PlacementError::NotFound(item) if item == ItemId::new(999)
    ));
    assert_eq!(order_count(&gateway).await, 0);
}

#[tokio::test]
async fn draining_stock_to_zero_commits() {
    let (coordinator, gateway) = setup().await;
    let item = seed_item(&gateway, "Widget", 9.99, 5).await;

    coordinator.place(&draft(3, &[(item, 5)])).await.unwrap();

    assert_eq!(item_state(&gateway, item).await, (0, 5));
}

#[tokio::test]
async fn sequential_placements_share_the_stock() {
    let (coordinator, gateway) = setup().await;
    let item = seed_item(&gateway, "Widget", 9.99, 5).await;

    coordinator.place(&draft(3, &[(item, 3)])).await.unwrap();
    let error = coordinator
        .place(&draft(4, &[(item, 3)]))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        PlacementError::InsufficientStock {
            available: 2,
            requested: 3,
            ..
        }
    ));
    assert_eq!(item_state(&gateway, item).await, (2, 3));
    assert_eq!(order_count(&gateway).await, 1);
}

#[tokio::test]
async fn history_is_newest_first_with_item_details() {
    let (coordinator, gateway) = setup().await;
    let widget = seed_item(&gateway, "Widget", 9.99, 5).await;
    let gadget = seed_item(&gateway, "Gadget", 25.0, 5).await;

    coordinator.place(&draft(3, &[(widget, 2)])).await.unwrap();
    coordinator.place(&draft(3, &[(gadget, 1)])).await.unwrap();
    coordinator.place(&draft(4, &[(widget, 1)])).await.unwrap();

    let history = coordinator.history(UserId::new(3)).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].item_name, "Gadget");
    assert_eq!(history[0].quantity, 1);
    assert_eq!(history[1].item_name, "Widget");
    assert_eq!(history[1].category, "misc");

    let empty = coordinator.history(UserId::new(99)).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn idempotency_key_survives_in_the_dedupe_table() {
    let (coordinator, gateway) = setup().await;
    let item = seed_item(&gateway, "Widget", 9.99, 5).await;

    let mut order = draft(3, &[(item, 2)]);
    order.idempotency_key = Some("key-abc".to_string());

    let first = coordinator.place(&order).await.unwrap();
    assert!(!first.duplicate);

    let second = coordinator.place(&order).await.unwrap();
    assert!(second.duplicate);

    assert_eq!(item_state(&gateway, item).await, (3, 2));
    assert_eq!(order_count(&gateway).await, 1);
}

#[tokio::test]
async fn seller_orders_join_buyer_details() {
    let (coordinator, gateway) = setup().await;
    let item = seed_item(&gateway, "Widget", 10.0, 5).await;
    gateway
        .run(
            "UPDATE item SET seller_id = ? WHERE id = ?",
            &[Value::Integer(1), Value::Integer(item)],
        )
        .await
        .unwrap();
    gateway
        .run(
            "INSERT INTO seller (id, user_id, shop_name) VALUES (?, ?, ?)",
            &[
                Value::Integer(1),
                Value::Integer(8),
                Value::Text("Widget World".into()),
            ],
        )
        .await
        .unwrap();
    gateway
        .run(
            "INSERT INTO user (id, first_name, last_name, phone_number) VALUES (?, ?, ?, ?)",
            &[
                Value::Integer(3),
                Value::Text("Jane".into()),
                Value::Text("Doe".into()),
                Value::Text("555-0100".into()),
            ],
        )
        .await
        .unwrap();

    coordinator.place(&draft(3, &[(item, 2)])).await.unwrap();

    let records = coordinator
        .seller_orders(UserId::new(8))
        .await
        .unwrap()
        .expect("seller should exist");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].customer_name, "Jane Doe");
    assert_eq!(records[0].customer_phone, "555-0100");
    assert_eq!(records[0].total_price, 20.0);

    let missing = coordinator.seller_orders(UserId::new(99)).await.unwrap();
    assert!(missing.is_none());
}
