//! Order rows: insertion, targeted deletion, and read queries.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, OrderId, UserId};
use serde::Serialize;
use store::{StoreError, StoreGateway, Value};

/// A new order row to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub quantity: u32,
    pub placed_at: DateTime<Utc>,
}

/// One row of a buyer's order history, joined with item details.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    #[serde(rename = "orderDate")]
    pub order_date: String,
    pub quantity: i64,
    #[serde(rename = "itemId")]
    pub item_id: ItemId,
    #[serde(rename = "itemName")]
    pub item_name: String,
    #[serde(rename = "itemPrice")]
    pub item_price: f64,
    pub category: String,
}

/// One order visible to a seller, joined with buyer and item details.
#[derive(Debug, Clone, Serialize)]
pub struct SellerOrderRecord {
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    #[serde(rename = "orderDate")]
    pub order_date: String,
    pub quantity: i64,
    #[serde(rename = "customerName")]
    pub customer_name: String,
    #[serde(rename = "customerPhone")]
    pub customer_phone: String,
    #[serde(rename = "itemName")]
    pub item_name: String,
    #[serde(rename = "itemPrice")]
    pub item_price: f64,
    #[serde(rename = "totalPrice")]
    pub total_price: f64,
}

/// Trait for order row persistence and reads.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts one order row with status "Placed".
    ///
    /// Returns the new row id, or None when the write took no effect.
    async fn insert(&self, order: &NewOrder) -> Result<Option<OrderId>, StoreError>;

    /// Deletes a specific order row. Returns false when no row matched.
    async fn delete(&self, order_id: OrderId) -> Result<bool, StoreError>;

    /// Returns a buyer's order history, newest first.
    async fn history(&self, user_id: UserId) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Returns orders for the seller owned by `user_id`, newest first.
    ///
    /// None when the user has no seller record.
    async fn seller_orders(
        &self,
        user_id: UserId,
    ) -> Result<Option<Vec<SellerOrderRecord>>, StoreError>;
}

const INSERT_SQL: &str = "INSERT INTO orders (user_id, item_id, quantity, order_date, status) \
     VALUES (?, ?, ?, ?, ?) RETURNING id";

const DELETE_SQL: &str = "DELETE FROM orders WHERE id = ?";

const HISTORY_SQL: &str = "SELECT o.id AS order_id, o.order_date, o.quantity, \
     i.id AS item_id, i.title, i.price, i.category \
     FROM orders o JOIN item i ON o.item_id = i.id \
     WHERE o.user_id = ? ORDER BY o.order_date DESC, o.id DESC";

const SELLER_LOOKUP_SQL: &str = "SELECT id FROM seller WHERE user_id = ?";

const SELLER_ORDERS_SQL: &str = "SELECT o.id AS order_id, o.order_date, o.quantity, \
     u.first_name || ' ' || u.last_name AS customer_name, \
     u.phone_number AS customer_phone, \
     i.title, i.price, o.quantity * i.price AS total_price \
     FROM orders o \
     JOIN item i ON o.item_id = i.id \
     JOIN user u ON o.user_id = u.id \
     WHERE i.seller_id = ? ORDER BY o.order_date DESC, o.id DESC";

/// Order store backed by the store gateway.
#[derive(Clone)]
pub struct GatewayOrderStore<G> {
    gateway: G,
}

impl<G> GatewayOrderStore<G> {
    /// Creates an order store over the given gateway.
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl<G: StoreGateway> OrderStore for GatewayOrderStore<G> {
    async fn insert(&self, order: &NewOrder) -> Result<Option<OrderId>, StoreError> {
        let row = self
            .gateway
            .get(
                INSERT_SQL,
                &[
                    Value::Integer(order.user_id.as_i64()),
                    Value::Integer(order.item_id.as_i64()),
                    order.quantity.into(),
                    Value::Text(order.placed_at.to_rfc3339()),
                    Value::Text("Placed".into()),
                ],
            )
            .await?;
        match row {
            Some(row) => Ok(Some(OrderId::new(row.integer("id")?))),
            None => Ok(None),
        }
    }

    async fn delete(&self, order_id: OrderId) -> Result<bool, StoreError> {
        let affected = self
            .gateway
            .run(DELETE_SQL, &[Value::Integer(order_id.as_i64())])
            .await?;
        Ok(affected > 0)
    }

    async fn history(&self, user_id: UserId) -> Result<Vec<HistoryRecord>, StoreError> {
        let rows = self
            .gateway
            .all(HISTORY_SQL, &[Value::Integer(user_id.as_i64())])
            .await?;
        rows.iter()
            .map(|row| {
                Ok(HistoryRecord {
                    order_id: OrderId::new(row.integer("order_id")?),
                    order_date: row.text("order_date")?.to_string(),
                    quantity: row.integer("quantity")?,
                    item_id: ItemId::new(row.integer("item_id")?),
                    item_name: row.text("title")?.to_string(),
                    item_price: row.real("price")?,
                    category: row.text("category")?.to_string(),
                })
            })
            .collect()
    }

    async fn seller_orders(
        &self,
        user_id: UserId,
    ) -> Result<Option<Vec<SellerOrderRecord>>, StoreError> {
        let seller = self
            .gateway
            .get(SELLER_LOOKUP_SQL, &[Value::Integer(user_id.as_i64())])
            .await?;
        let Some(seller) = seller else {
            return Ok(None);
        };
        let seller_id = seller.integer("id")?;

        let rows = self
            .gateway
            .all(SELLER_ORDERS_SQL, &[Value::Integer(seller_id)])
            .await?;
        let records = rows
            .iter()
            .map(|row| {
                Ok(SellerOrderRecord {
                    order_id: OrderId::new(row.integer("order_id")?),
                    order_date: row.text("order_date")?.to_string(),
                    quantity: row.integer("quantity")?,
                    customer_name: row.text("customer_name")?.to_string(),
                    customer_phone: row.text("customer_phone")?.to_string(),
                    item_name: row.text("title")?.to_string(),
                    item_price: row.real("price")?,
                    total_price: row.real("total_price")?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(Some(records))
    }
}

/// One order row held by the in-memory store.
#[derive(Debug, Clone)]
pub struct StoredOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub quantity: u32,
    pub placed_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Default)]
struct ItemInfo {
    title: String,
    price: f64,
    category: String,
}

#[derive(Debug, Default)]
struct OrdersState {
    orders: HashMap<OrderId, StoredOrder>,
    item_info: HashMap<ItemId, ItemInfo>,
    sellers: HashMap<UserId, Vec<SellerOrderRecord>>,
    next_id: i64,
    inserts_done: usize,
    fail_after_inserts: Option<usize>,
    lose_writes: bool,
    fail_on_delete: bool,
}

/// In-memory order store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrdersState>>,
}

impl InMemoryOrderStore {
    /// Creates an empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers item details used by the history join.
    pub fn put_item_info(&self, item_id: ItemId, title: &str, price: f64, category: &str) {
        self.state.write().unwrap().item_info.insert(
            item_id,
            ItemInfo {
                title: title.to_string(),
                price,
                category: category.to_string(),
            },
        );
    }

    /// Registers a seller record for the given user.
    pub fn put_seller(&self, user_id: UserId) {
        self.state.write().unwrap().sellers.insert(user_id, Vec::new());
    }

    /// Fails the insert once `count` inserts have succeeded.
    pub fn set_fail_after_inserts(&self, count: usize) {
        self.state.write().unwrap().fail_after_inserts = Some(count);
    }

    /// Makes inserts report no effect instead of returning an id.
    pub fn set_lose_writes(&self, lose: bool) {
        self.state.write().unwrap().lose_writes = lose;
    }

    /// Configures delete calls to fail with a store error.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.state.write().unwrap().fail_on_delete = fail;
    }

    /// Returns the number of stored order rows.
    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    /// Returns the stored orders for a user, in insertion order.
    pub fn orders_for(&self, user_id: UserId) -> Vec<StoredOrder> {
        let state = self.state.read().unwrap();
        let mut orders: Vec<StoredOrder> = state
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.id);
        orders
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &NewOrder) -> Result<Option<OrderId>, StoreError> {
        let mut state = self.state.write().unwrap();
        if let Some(threshold) = state.fail_after_inserts
            && state.inserts_done >= threshold
        {
            return Err(StoreError::Rejected("injected insert failure".into()));
        }
        if state.lose_writes {
            return Ok(None);
        }
        state.next_id += 1;
        state.inserts_done += 1;
        let id = OrderId::new(state.next_id);
        state.orders.insert(
            id,
            StoredOrder {
                id,
                user_id: order.user_id,
                item_id: order.item_id,
                quantity: order.quantity,
                placed_at: order.placed_at,
                status: "Placed".to_string(),
            },
        );
        Ok(Some(id))
    }

    async fn delete(&self, order_id: OrderId) -> Result<bool, StoreError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_delete {
            return Err(StoreError::Rejected("injected delete failure".into()));
        }
        Ok(state.orders.remove(&order_id).is_some())
    }

    async fn history(&self, user_id: UserId) -> Result<Vec<HistoryRecord>, StoreError> {
        let state = self.state.read().unwrap();
        let mut orders: Vec<&StoredOrder> = state
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .collect();
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then(b.id.cmp(&a.id)));
        Ok(orders
            .into_iter()
            .map(|order| {
                let info = state
                    .item_info
                    .get(&order.item_id)
                    .cloned()
                    .unwrap_or_default();
                HistoryRecord {
                    order_id: order.id,
                    order_date: order.placed_at.to_rfc3339(),
                    quantity: i64::from(order.quantity),
                    item_id: order.item_id,
                    item_name: info.title,
                    item_price: info.price,
                    category: info.category,
                }
            })
            .collect())
    }

    async fn seller_orders(
        &self,
        user_id: UserId,
    ) -> Result<Option<Vec<SellerOrderRecord>>, StoreError> {
        let state = self.state.read().unwrap();
        Ok(state.sellers.get(&user_id).cloned())
    }
}
