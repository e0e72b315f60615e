//! Placement coordinator for driving one order through commit or rollback.

use chrono::Utc;
use common::{ItemId, OrderId, UserId};
use serde::Serialize;

use crate::compensator;
use crate::error::PlacementError;
use crate::request::{OrderDraft, OrderLine, OrderRequest};
use crate::services::{
    HistoryRecord, KeyRegistry, NewOrder, OrderStore, SellerOrderRecord, StockLedger,
};
use crate::state::PlacementState;
use crate::steps::AppliedStep;

/// Caller-visible result of a committed placement.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementReceipt {
    /// Ids of the order rows created, one per line, in request order.
    #[serde(rename = "orderIds")]
    pub order_ids: Vec<OrderId>,
    /// True when the idempotency key matched an earlier commit and no
    /// new writes were made.
    pub duplicate: bool,
}

/// Orchestrates order placement over single-statement store access.
///
/// Drives the state machine
/// `Validating → CheckingStock → Reserving → Committed`, falling into
/// `RollingBack → Failed | Inconsistent` when a reservation-phase write
/// fails. Lines are processed strictly in request order because the
/// compensator must unwind in exact reverse order.
pub struct PlacementCoordinator<L, O, K>
where
    L: StockLedger,
    O: OrderStore,
    K: KeyRegistry,
{
    ledger: L,
    orders: O,
    keys: K,
}

impl<L, O, K> PlacementCoordinator<L, O, K>
where
    L: StockLedger,
    O: OrderStore,
    K: KeyRegistry,
{
    /// Creates a new placement coordinator.
    pub fn new(ledger: L, orders: O, keys: K) -> Self {
        Self {
            ledger,
            orders,
            keys,
        }
    }

    /// Places an order: validates, checks stock, reserves line by line,
    /// and rolls back on failure.
    #[tracing::instrument(skip(self, draft), fields(user_id = ?draft.user_id))]
    pub async fn place(&self, draft: &OrderDraft) -> Result<PlacementReceipt, PlacementError> {
        metrics::counter!("placements_total").increment(1);
        let start = std::time::Instant::now();

        let result = self.drive(draft).await;

        metrics::histogram!("placement_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(receipt) => {
                metrics::counter!("placements_committed").increment(1);
                tracing::info!(
                    orders = receipt.order_ids.len(),
                    duplicate = receipt.duplicate,
                    "placement committed"
                );
            }
            Err(error @ PlacementError::Inconsistent { .. }) => {
                metrics::counter!("placements_inconsistent_total").increment(1);
                // Operator signal: persisted state no longer matches the
                // pre-request state and needs manual reconciliation.
                tracing::error!(%error, "placement left the store inconsistent");
            }
            Err(error) => {
                metrics::counter!("placements_failed").increment(1);
                tracing::warn!(%error, "placement failed");
            }
        }
        result
    }

    async fn drive(&self, draft: &OrderDraft) -> Result<PlacementReceipt, PlacementError> {
        let mut state = PlacementState::Validating;
        tracing::debug!(%state, "placement started");
        let request = OrderRequest::validate(draft)?;

        if let Some(key) = request.idempotency_key.as_deref()
            && self.keys.seen(key).await?
        {
            tracing::info!(key, "idempotency key already recorded");
            return Ok(PlacementReceipt {
                order_ids: Vec::new(),
                duplicate: true,
            });
        }

        state = PlacementState::CheckingStock;
        tracing::debug!(%state, lines = request.lines.len(), "checking stock");
        self.check_stock(&request.lines).await?;

        state = PlacementState::Reserving;
        tracing::debug!(%state, "reserving");
        let mut applied: Vec<AppliedStep> = Vec::with_capacity(request.lines.len() * 2);
        let mut order_ids = Vec::with_capacity(request.lines.len());

        for line in &request.lines {
            match self.reserve_line(&request, line, &mut applied).await {
                Ok(order_id) => order_ids.push(order_id),
                Err(reason) => {
                    state = PlacementState::RollingBack;
                    tracing::warn!(%state, item = %line.item_id, %reason, "rolling back");
                    let report =
                        compensator::unwind(&self.ledger, &self.orders, &applied).await;
                    let error = if report.fully_reversed() {
                        reason
                    } else {
                        PlacementError::Inconsistent {
                            reason: Box::new(reason),
                            failed_reversals: report.failed.len(),
                        }
                    };
                    state = if error.is_inconsistent() {
                        PlacementState::Inconsistent
                    } else {
                        PlacementState::Failed
                    };
                    tracing::debug!(%state, "placement finished");
                    return Err(error);
                }
            }
        }

        // Committed: the applied-step log is discarded.
        state = PlacementState::Committed;
        tracing::debug!(%state, "placement finished");
        if let Some(key) = request.idempotency_key.as_deref() {
            // Post-commit bookkeeping; the order stands either way.
            if let Err(error) = self.keys.record(key, request.user_id).await {
                tracing::warn!(key, %error, "failed to record idempotency key");
            }
        }
        Ok(PlacementReceipt {
            order_ids,
            duplicate: false,
        })
    }

    /// Rejects the request early when any line is infeasible as
    /// observed at read time. Runs before any write; the guarded update
    /// in `reserve_line` covers the window this check leaves open.
    async fn check_stock(&self, lines: &[OrderLine]) -> Result<(), PlacementError> {
        let ids: Vec<ItemId> = lines.iter().map(|line| line.item_id).collect();
        let levels = self.ledger.stock_levels(&ids).await?;

        for line in lines {
            match levels.get(&line.item_id) {
                None => return Err(PlacementError::NotFound(line.item_id)),
                Some(available) if *available < line.quantity => {
                    return Err(PlacementError::InsufficientStock {
                        item_id: line.item_id,
                        available: *available,
                        requested: line.quantity,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    async fn reserve_line(
        &self,
        request: &OrderRequest,
        line: &OrderLine,
        applied: &mut Vec<AppliedStep>,
    ) -> Result<OrderId, PlacementError> {
        let reserved = self.ledger.reserve(line.item_id, line.quantity).await?;
        if !reserved {
            // Zero rows matched: the item vanished or a concurrent
            // placement won the race. Re-read to tell which.
            let levels = self.ledger.stock_levels(&[line.item_id]).await?;
            return Err(match levels.get(&line.item_id) {
                None => PlacementError::NotFound(line.item_id),
                Some(available) => PlacementError::InsufficientStock {
                    item_id: line.item_id,
                    available: *available,
                    requested: line.quantity,
                },
            });
        }
        applied.push(AppliedStep::StockAdjustment {
            item_id: line.item_id,
            quantity: line.quantity,
        });

        let order = NewOrder {
            user_id: request.user_id,
            item_id: line.item_id,
            quantity: line.quantity,
            placed_at: Utc::now(),
        };
        match self.orders.insert(&order).await? {
            Some(order_id) => {
                applied.push(AppliedStep::OrderInsertion {
                    order_id,
                    user_id: request.user_id,
                    item_id: line.item_id,
                });
                Ok(order_id)
            }
            None => Err(PlacementError::NoEffect {
                step: "order insert",
                item_id: line.item_id,
            }),
        }
    }

    /// Returns a buyer's order history, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, user_id: UserId) -> Result<Vec<HistoryRecord>, PlacementError> {
        Ok(self.orders.history(user_id).await?)
    }

    /// Returns the orders visible to the seller owned by `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn seller_orders(
        &self,
        user_id: UserId,
    ) -> Result<Option<Vec<SellerOrderRecord>>, PlacementError> {
        Ok(self.orders.seller_orders(user_id).await?)
    }
}
