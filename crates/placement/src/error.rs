//! Placement error taxonomy.

use common::ItemId;
use store::StoreError;
use thiserror::Error;

/// Errors that can terminate an order placement.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Malformed payload; rejected at the boundary, never retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A referenced item does not exist.
    #[error("Item {0} does not exist")]
    NotFound(ItemId),

    /// Business-rule violation: not enough stock for a line.
    #[error(
        "Insufficient stock for item {item_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        item_id: ItemId,
        available: u32,
        requested: u32,
    },

    /// A required write reported zero affected rows.
    #[error("{step} took no effect for item {item_id}")]
    NoEffect {
        step: &'static str,
        item_id: ItemId,
    },

    /// The store gateway failed outright.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Rollback itself failed; persisted state may have diverged and
    /// requires out-of-band reconciliation.
    #[error("Rollback incomplete ({failed_reversals} reversal(s) failed) after: {reason}")]
    Inconsistent {
        reason: Box<PlacementError>,
        failed_reversals: usize,
    },
}

impl PlacementError {
    /// Creates an `InvalidRequest` error.
    pub fn invalid(message: impl Into<String>) -> Self {
        PlacementError::InvalidRequest(message.into())
    }

    /// True when compensation left persisted state diverged.
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, PlacementError::Inconsistent { .. })
    }
}

/// Convenience type alias for placement results.
pub type Result<T> = std::result::Result<T, PlacementError>;
