//! Stock ledger: batched reads and guarded stock adjustments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ItemId;
use store::{StoreError, StoreGateway, Value, placeholders};

/// Trait for reading and adjusting per-item stock.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Reads current stock for the given items in one batched query.
    ///
    /// Items absent from the result do not exist.
    async fn stock_levels(
        &self,
        items: &[ItemId],
    ) -> Result<HashMap<ItemId, u32>, StoreError>;

    /// Decrements stock and increments sold quantity in one statement,
    /// guarded on `in_stock >= quantity`. Returns false when no row
    /// matched: the item is gone or the guard failed.
    async fn reserve(&self, item_id: ItemId, quantity: u32) -> Result<bool, StoreError>;

    /// Reverses a reservation: adds the quantity back to stock and
    /// subtracts it from sold quantity. Returns false when no row
    /// matched.
    async fn release(&self, item_id: ItemId, quantity: u32) -> Result<bool, StoreError>;
}

const RESERVE_SQL: &str = "UPDATE item SET in_stock = in_stock - ?, \
     sold_quantity = sold_quantity + ? WHERE id = ? AND in_stock >= ?";

const RELEASE_SQL: &str = "UPDATE item SET in_stock = in_stock + ?, \
     sold_quantity = sold_quantity - ? WHERE id = ?";

/// Stock ledger backed by the store gateway.
#[derive(Clone)]
pub struct GatewayStockLedger<G> {
    gateway: G,
}

impl<G> GatewayStockLedger<G> {
    /// Creates a ledger over the given gateway.
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl<G: StoreGateway> StockLedger for GatewayStockLedger<G> {
    async fn stock_levels(
        &self,
        items: &[ItemId],
    ) -> Result<HashMap<ItemId, u32>, StoreError> {
        if items.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT id, in_stock FROM item WHERE id IN ({})",
            placeholders(items.len())
        );
        let params: Vec<Value> = items.iter().map(|id| Value::Integer(id.as_i64())).collect();
        let rows = self.gateway.all(&sql, &params).await?;

        let mut levels = HashMap::with_capacity(rows.len());
        for row in rows {
            let id = ItemId::new(row.integer("id")?);
            let in_stock = u32::try_from(row.integer("in_stock")?)
                .map_err(|_| StoreError::decode("in_stock"))?;
            levels.insert(id, in_stock);
        }
        Ok(levels)
    }

    async fn reserve(&self, item_id: ItemId, quantity: u32) -> Result<bool, StoreError> {
        let affected = self
            .gateway
            .run(
                RESERVE_SQL,
                &[
                    quantity.into(),
                    quantity.into(),
                    Value::Integer(item_id.as_i64()),
                    quantity.into(),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn release(&self, item_id: ItemId, quantity: u32) -> Result<bool, StoreError> {
        let affected = self
            .gateway
            .run(
                RELEASE_SQL,
                &[
                    quantity.into(),
                    quantity.into(),
                    Value::Integer(item_id.as_i64()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    items: HashMap<ItemId, ItemStock>,
    fail_on_reserve: bool,
    fail_on_release: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct ItemStock {
    in_stock: u32,
    sold_quantity: u32,
}

/// In-memory stock ledger for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryStockLedger {
    /// Creates an empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an item with the given stock level.
    pub fn put_item(&self, item_id: ItemId, in_stock: u32) {
        self.state.write().unwrap().items.insert(
            item_id,
            ItemStock {
                in_stock,
                sold_quantity: 0,
            },
        );
    }

    /// Returns the current stock of an item.
    pub fn in_stock(&self, item_id: ItemId) -> Option<u32> {
        self.state
            .read()
            .unwrap()
            .items
            .get(&item_id)
            .map(|item| item.in_stock)
    }

    /// Returns the sold quantity of an item.
    pub fn sold_quantity(&self, item_id: ItemId) -> Option<u32> {
        self.state
            .read()
            .unwrap()
            .items
            .get(&item_id)
            .map(|item| item.sold_quantity)
    }

    /// Configures reserve calls to fail with a store error.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve = fail;
    }

    /// Configures release calls to fail with a store error.
    pub fn set_fail_on_release(&self, fail: bool) {
        self.state.write().unwrap().fail_on_release = fail;
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn stock_levels(
        &self,
        items: &[ItemId],
    ) -> Result<HashMap<ItemId, u32>, StoreError> {
        let state = self.state.read().unwrap();
        Ok(items
            .iter()
            .filter_map(|id| state.items.get(id).map(|item| (*id, item.in_stock)))
            .collect())
    }

    async fn reserve(&self, item_id: ItemId, quantity: u32) -> Result<bool, StoreError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_reserve {
            return Err(StoreError::Rejected("injected reserve failure".into()));
        }
        match state.items.get_mut(&item_id) {
            Some(item) if item.in_stock >= quantity => {
                item.in_stock -= quantity;
                item.sold_quantity += quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, item_id: ItemId, quantity: u32) -> Result<bool, StoreError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_release {
            return Err(StoreError::Rejected("injected release failure".into()));
        }
        match state.items.get_mut(&item_id) {
            Some(item) => {
                item.in_stock += quantity;
                item.sold_quantity = item.sold_quantity.saturating_sub(quantity);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
