//! HTTP-level tests over the in-memory services.

use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{ItemId, UserId};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use placement::{InMemoryOrderStore, InMemoryStockLedger};
use tower::ServiceExt;

// The process-global metrics recorder can only be installed once.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install recorder")
        })
        .clone()
}

fn setup() -> (Router, InMemoryStockLedger, InMemoryOrderStore) {
    let (state, ledger, orders) = api::create_in_memory_state();
    let app = api::create_app(state, metrics_handle());
    (app, ledger, orders)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn place_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/order/place")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_reports_status_and_version() {
    let (app, _, _) = setup();
    let (status, body) = send(app, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let (app, _, _) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn placing_an_order_returns_ids_and_decrements_stock() {
    let (app, ledger, orders) = setup();
    ledger.put_item(ItemId::new(7), 5);

    let (status, body) = send(
        app,
        place_request(serde_json::json!({
            "userId": 3,
            "orderItems": [{ "id": 7, "quantity": 2 }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Order placed successfully");
    assert_eq!(body["orderIds"].as_array().unwrap().len(), 1);
    assert_eq!(body["duplicate"], false);
    assert_eq!(ledger.in_stock(ItemId::new(7)), Some(3));
    assert_eq!(orders.order_count(), 1);
}

#[tokio::test]
async fn missing_user_id_is_a_bad_request() {
    let (app, _, _) = setup();
    let (status, body) = send(
        app,
        place_request(serde_json::json!({
            "orderItems": [{ "id": 7, "quantity": 2 }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("userId"));
}

#[tokio::test]
async fn non_positive_quantity_is_a_bad_request() {
    let (app, ledger, _) = setup();
    ledger.put_item(ItemId::new(7), 5);

    let (status, _) = send(
        app,
        place_request(serde_json::json!({
            "userId": 3,
            "orderItems": [{ "id": 7, "quantity": 0 }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_item_is_not_found() {
    let (app, _, _) = setup();
    let (status, _) = send(
        app,
        place_request(serde_json::json!({
            "userId": 3,
            "orderItems": [{ "id": 999, "quantity": 1 }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn insufficient_stock_is_a_conflict() {
    let (app, ledger, orders) = setup();
    ledger.put_item(ItemId::new(7), 1);

    let (status, body) = send(
        app,
        place_request(serde_json::json!({
            "userId": 3,
            "orderItems": [{ "id": 7, "quantity": 2 }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Insufficient stock"));
    assert_eq!(ledger.in_stock(ItemId::new(7)), Some(1));
    assert_eq!(orders.order_count(), 0);
}

#[tokio::test]
async fn duplicate_key_replays_without_new_writes() {
    let (app, ledger, orders) = setup();
    ledger.put_item(ItemId::new(7), 5);
    let body = serde_json::json!({
        "userId": 3,
        "orderItems": [{ "id": 7, "quantity": 2 }],
        "idempotencyKey": "key-abc",
    });

    let (first, _) = send(app.clone(), place_request(body.clone())).await;
    assert_eq!(first, StatusCode::OK);

    let (second, replay) = send(app, place_request(body)).await;
    assert_eq!(second, StatusCode::OK);
    assert_eq!(replay["duplicate"], true);
    assert_eq!(ledger.in_stock(ItemId::new(7)), Some(3));
    assert_eq!(orders.order_count(), 1);
}

#[tokio::test]
async fn history_of_a_new_user_is_empty() {
    let (app, _, _) = setup();
    let (status, body) = send(app, get_request("/order/history/42")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"], serde_json::json!([]));
}

#[tokio::test]
async fn history_lists_placed_orders() {
    let (app, ledger, orders) = setup();
    ledger.put_item(ItemId::new(7), 5);
    orders.put_item_info(ItemId::new(7), "Widget", 9.99, "tools");

    let (status, _) = send(
        app.clone(),
        place_request(serde_json::json!({
            "userId": 3,
            "orderItems": [{ "id": 7, "quantity": 2 }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, get_request("/order/history/3")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["orders"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["itemName"], "Widget");
    assert_eq!(rows[0]["quantity"], 2);
    assert_eq!(rows[0]["itemPrice"], 9.99);
}

#[tokio::test]
async fn seller_orders_require_the_user_id_param() {
    let (app, _, _) = setup();
    let (status, body) = send(app, get_request("/order/forsellers")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing userId");
}

#[tokio::test]
async fn seller_orders_for_unknown_seller_are_not_found() {
    let (app, _, _) = setup();
    let (status, _) = send(app, get_request("/order/forsellers?userId=8")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn seller_orders_for_a_registered_seller() {
    let (app, _, orders) = setup();
    orders.put_seller(UserId::new(8));

    let (status, body) = send(app, get_request("/order/forsellers?userId=8")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"], serde_json::json!([]));
}
