//! Idempotency key registry.
//!
//! Committed placements record their client-supplied key here; a
//! resubmission with the same key is answered without re-applying any
//! writes. Keys are recorded after commit, so a crash between the last
//! order insert and the key insert can still let a retry double-apply —
//! the window is narrowed, not closed, without a native transaction.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use store::{StoreError, StoreGateway, Value};

/// Trait for the placement dedupe table.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// True when the key was recorded by an earlier committed placement.
    async fn seen(&self, key: &str) -> Result<bool, StoreError>;

    /// Records a key after commit.
    async fn record(&self, key: &str, user_id: UserId) -> Result<(), StoreError>;
}

const LOOKUP_SQL: &str = "SELECT key FROM placement_key WHERE key = ?";

const RECORD_SQL: &str =
    "INSERT OR IGNORE INTO placement_key (key, user_id) VALUES (?, ?)";

/// Key registry backed by the store gateway.
#[derive(Clone)]
pub struct GatewayKeyRegistry<G> {
    gateway: G,
}

impl<G> GatewayKeyRegistry<G> {
    /// Creates a registry over the given gateway.
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl<G: StoreGateway> KeyRegistry for GatewayKeyRegistry<G> {
    async fn seen(&self, key: &str) -> Result<bool, StoreError> {
        let row = self.gateway.get(LOOKUP_SQL, &[Value::from(key)]).await?;
        Ok(row.is_some())
    }

    async fn record(&self, key: &str, user_id: UserId) -> Result<(), StoreError> {
        self.gateway
            .run(
                RECORD_SQL,
                &[Value::from(key), Value::Integer(user_id.as_i64())],
            )
            .await?;
        Ok(())
    }
}

/// In-memory key registry for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyRegistry {
    keys: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryKeyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded keys.
    pub fn key_count(&self) -> usize {
        self.keys.read().unwrap().len()
    }
}

#[async_trait]
impl KeyRegistry for InMemoryKeyRegistry {
    async fn seen(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.keys.read().unwrap().contains(key))
    }

    async fn record(&self, key: &str, _user_id: UserId) -> Result<(), StoreError> {
        self.keys.write().unwrap().insert(key.to_string());
        Ok(())
    }
}
