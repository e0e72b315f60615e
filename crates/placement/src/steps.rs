//! The applied-step log.

use common::{ItemId, OrderId, UserId};

/// A forward action that has taken effect for an in-flight placement.
///
/// Appended as each write succeeds; the compensator consumes the log in
/// reverse on failure. Discarded on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedStep {
    /// Stock was decremented and sold quantity incremented.
    StockAdjustment { item_id: ItemId, quantity: u32 },

    /// An order row was inserted.
    OrderInsertion {
        order_id: OrderId,
        user_id: UserId,
        item_id: ItemId,
    },
}

impl AppliedStep {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppliedStep::StockAdjustment { .. } => "stock_adjustment",
            AppliedStep::OrderInsertion { .. } => "order_insertion",
        }
    }
}
