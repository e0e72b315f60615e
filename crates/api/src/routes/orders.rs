//! Order placement and order listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::{OrderId, UserId};
use placement::{
    HistoryRecord, KeyRegistry, OrderDraft, OrderStore, PlacementCoordinator, SellerOrderRecord,
    StockLedger,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<L, O, K>
where
    L: StockLedger,
    O: OrderStore,
    K: KeyRegistry,
{
    pub coordinator: PlacementCoordinator<L, O, K>,
}

// -- Response types --

#[derive(Serialize)]
pub struct PlaceResponse {
    pub message: &'static str,
    #[serde(rename = "orderIds")]
    pub order_ids: Vec<OrderId>,
    pub duplicate: bool,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub orders: Vec<HistoryRecord>,
}

#[derive(Serialize)]
pub struct SellerOrdersResponse {
    pub orders: Vec<SellerOrderRecord>,
}

#[derive(Deserialize)]
pub struct SellerQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
}

// -- Handlers --

/// POST /order/place — place a multi-item order.
#[tracing::instrument(skip(state, draft))]
pub async fn place<L, O, K>(
    State(state): State<Arc<AppState<L, O, K>>>,
    Json(draft): Json<OrderDraft>,
) -> Result<Json<PlaceResponse>, ApiError>
where
    L: StockLedger + 'static,
    O: OrderStore + 'static,
    K: KeyRegistry + 'static,
{
    let receipt = state.coordinator.place(&draft).await?;
    Ok(Json(PlaceResponse {
        message: "Order placed successfully",
        order_ids: receipt.order_ids,
        duplicate: receipt.duplicate,
    }))
}

/// GET /order/history/:user_id — a buyer's order history, newest first.
///
/// Returns an empty list, not a 404, when the user has no orders.
#[tracing::instrument(skip(state))]
pub async fn history<L, O, K>(
    State(state): State<Arc<AppState<L, O, K>>>,
    Path(user_id): Path<i64>,
) -> Result<Json<HistoryResponse>, ApiError>
where
    L: StockLedger + 'static,
    O: OrderStore + 'static,
    K: KeyRegistry + 'static,
{
    let orders = state.coordinator.history(UserId::new(user_id)).await?;
    Ok(Json(HistoryResponse { orders }))
}

/// GET /order/forsellers?userId=... — orders for the caller's shop.
#[tracing::instrument(skip(state, query))]
pub async fn for_sellers<L, O, K>(
    State(state): State<Arc<AppState<L, O, K>>>,
    Query(query): Query<SellerQuery>,
) -> Result<Json<SellerOrdersResponse>, ApiError>
where
    L: StockLedger + 'static,
    O: OrderStore + 'static,
    K: KeyRegistry + 'static,
{
    let user_id = query
        .user_id
        .ok_or_else(|| ApiError::BadRequest("Missing userId".to_string()))?;

    let orders = state
        .coordinator
        .seller_orders(UserId::new(user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Seller not found for this user".to_string()))?;

    Ok(Json(SellerOrdersResponse { orders }))
}
