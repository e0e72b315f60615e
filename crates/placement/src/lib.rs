//! Order placement transaction manager.
//!
//! Committing a multi-item purchase must atomically validate and
//! decrement inventory, record sold quantity, and create order rows —
//! over a store that only executes single statements. This crate
//! emulates atomicity at the application level:
//!
//! 1. Validate the request (no side effects).
//! 2. Read stock for every line in one batch and reject infeasible
//!    requests before any write.
//! 3. Reserve line by line, in request order, appending an
//!    [`AppliedStep`] for each write that takes effect.
//! 4. On any failure, reverse the applied steps in last-in-first-out
//!    order. A reversal failure leaves the request `Inconsistent` and
//!    is surfaced to operators.
//!
//! The per-line stock update is guarded (`in_stock >= quantity` rides
//! in the same statement as the decrement), so concurrent placements
//! cannot drive stock negative even though no lock spans the upfront
//! check and the writes.

pub mod compensator;
pub mod coordinator;
pub mod error;
pub mod request;
pub mod services;
pub mod state;
pub mod steps;

pub use compensator::{CompensationReport, FailedReversal};
pub use coordinator::{PlacementCoordinator, PlacementReceipt};
pub use error::PlacementError;
pub use request::{DraftLine, OrderDraft, OrderLine, OrderRequest};
pub use services::{
    GatewayKeyRegistry, GatewayOrderStore, GatewayStockLedger, HistoryRecord, InMemoryKeyRegistry,
    InMemoryOrderStore, InMemoryStockLedger, KeyRegistry, NewOrder, OrderStore, SellerOrderRecord,
    StockLedger,
};
pub use state::PlacementState;
pub use steps::AppliedStep;
