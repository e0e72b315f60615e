//! Request validation.

use std::collections::HashSet;

use common::{ItemId, UserId};
use serde::Deserialize;

use crate::error::PlacementError;

/// Wire shape of a placement request, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDraft {
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
    #[serde(rename = "orderItems", default)]
    pub order_items: Vec<DraftLine>,
    /// Client-supplied token for at-most-once placement.
    #[serde(rename = "idempotencyKey", default)]
    pub idempotency_key: Option<String>,
}

/// One unvalidated line of an order draft.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftLine {
    pub id: i64,
    pub quantity: i64,
}

/// One validated line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// A validated placement request. Transient; exists only for the
/// duration of one placement call.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub idempotency_key: Option<String>,
}

impl OrderRequest {
    /// Validates a draft into a normalized request. No side effects.
    ///
    /// Rejects a missing user id, an empty line list, non-positive or
    /// out-of-range quantities, and duplicate item ids.
    pub fn validate(draft: &OrderDraft) -> Result<Self, PlacementError> {
        let user_id = draft
            .user_id
            .ok_or_else(|| PlacementError::invalid("userId is required"))?;

        if draft.order_items.is_empty() {
            return Err(PlacementError::invalid(
                "orderItems must be a non-empty list",
            ));
        }

        let mut seen = HashSet::with_capacity(draft.order_items.len());
        let mut lines = Vec::with_capacity(draft.order_items.len());
        for line in &draft.order_items {
            let quantity = u32::try_from(line.quantity)
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| {
                    PlacementError::invalid(format!(
                        "quantity for item {} must be a positive integer",
                        line.id
                    ))
                })?;
            if !seen.insert(line.id) {
                return Err(PlacementError::invalid(format!(
                    "item {} appears more than once",
                    line.id
                )));
            }
            lines.push(OrderLine {
                item_id: ItemId::new(line.id),
                quantity,
            });
        }

        Ok(Self {
            user_id: UserId::new(user_id),
            lines,
            idempotency_key: draft.idempotency_key.clone(),
        })
    }

    /// Returns the item ids of every line, in request order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.lines.iter().map(|line| line.item_id).collect()
    }
}
