//! Reverses applied steps when a placement fails partway.

use crate::services::{OrderStore, StockLedger};
use crate::steps::AppliedStep;

/// One reversal that did not take effect.
#[derive(Debug)]
pub struct FailedReversal {
    pub step: AppliedStep,
    pub reason: String,
}

/// Outcome of one compensation pass.
#[derive(Debug, Default)]
pub struct CompensationReport {
    /// Number of reversals attempted.
    pub attempted: usize,
    /// Reversals that failed, in attempt order.
    pub failed: Vec<FailedReversal>,
}

impl CompensationReport {
    /// True when every applied step was reversed.
    pub fn fully_reversed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Attempts to reverse every applied step, most recent first.
///
/// Each reversal is attempted independently: a failure is recorded and
/// the pass continues with the remaining steps. The caller decides
/// between `Failed` and `Inconsistent` from the report.
#[tracing::instrument(skip_all, fields(steps = steps.len()))]
pub async fn unwind<L: StockLedger, O: OrderStore>(
    ledger: &L,
    orders: &O,
    steps: &[AppliedStep],
) -> CompensationReport {
    let mut report = CompensationReport::default();

    for step in steps.iter().rev() {
        report.attempted += 1;
        let result = match step {
            AppliedStep::StockAdjustment { item_id, quantity } => {
                match ledger.release(*item_id, *quantity).await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err("item row no longer exists".to_string()),
                    Err(error) => Err(error.to_string()),
                }
            }
            AppliedStep::OrderInsertion { order_id, .. } => {
                match orders.delete(*order_id).await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err("order row no longer exists".to_string()),
                    Err(error) => Err(error.to_string()),
                }
            }
        };

        match result {
            Ok(()) => tracing::debug!(kind = step.kind(), "reversal applied"),
            Err(reason) => {
                tracing::error!(kind = step.kind(), %reason, "reversal failed");
                report.failed.push(FailedReversal {
                    step: *step,
                    reason,
                });
            }
        }
    }

    report
}
