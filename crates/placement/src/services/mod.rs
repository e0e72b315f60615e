//! Service seams between the coordinator and the store.
//!
//! Each seam is a trait with a gateway-backed implementation (bound
//! parameters only) and an in-memory implementation for tests.

pub mod keys;
pub mod ledger;
pub mod orders;

pub use keys::{GatewayKeyRegistry, InMemoryKeyRegistry, KeyRegistry};
pub use ledger::{GatewayStockLedger, InMemoryStockLedger, StockLedger};
pub use orders::{
    GatewayOrderStore, HistoryRecord, InMemoryOrderStore, NewOrder, OrderStore, SellerOrderRecord,
};
