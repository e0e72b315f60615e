//! HTTP API server for the marketplace order-placement backend.
//!
//! Provides the placement endpoint and order listing endpoints, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use placement::{
    GatewayKeyRegistry, GatewayOrderStore, GatewayStockLedger, InMemoryKeyRegistry,
    InMemoryOrderStore, InMemoryStockLedger, KeyRegistry, OrderStore, PlacementCoordinator,
    StockLedger,
};
use store::SqliteGateway;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, O, K>(state: Arc<AppState<L, O, K>>, metrics_handle: PrometheusHandle) -> Router
where
    L: StockLedger + 'static,
    O: OrderStore + 'static,
    K: KeyRegistry + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/order/place", post(routes::orders::place::<L, O, K>))
        .route(
            "/order/history/{user_id}",
            get(routes::orders::history::<L, O, K>),
        )
        .route(
            "/order/forsellers",
            get(routes::orders::for_sellers::<L, O, K>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Application state wired to the SQLite gateway.
pub type SqliteAppState = AppState<
    GatewayStockLedger<SqliteGateway>,
    GatewayOrderStore<SqliteGateway>,
    GatewayKeyRegistry<SqliteGateway>,
>;

/// Creates application state over a SQLite gateway.
pub fn create_sqlite_state(gateway: SqliteGateway) -> Arc<SqliteAppState> {
    let coordinator = PlacementCoordinator::new(
        GatewayStockLedger::new(gateway.clone()),
        GatewayOrderStore::new(gateway.clone()),
        GatewayKeyRegistry::new(gateway),
    );
    Arc::new(AppState { coordinator })
}

/// Application state wired to in-memory services.
pub type InMemoryAppState =
    AppState<InMemoryStockLedger, InMemoryOrderStore, InMemoryKeyRegistry>;

/// Creates in-memory application state, returning the service handles
/// so tests can seed and inspect them.
pub fn create_in_memory_state() -> (
    Arc<InMemoryAppState>,
    InMemoryStockLedger,
    InMemoryOrderStore,
) {
    let ledger = InMemoryStockLedger::new();
    let orders = InMemoryOrderStore::new();
    let keys = InMemoryKeyRegistry::new();
    let coordinator = PlacementCoordinator::new(ledger.clone(), orders.clone(), keys);
    (Arc::new(AppState { coordinator }), ledger, orders)
}
