//! # Notification Dispatch Coordinator
//!
//! Notifies suppliers of their purchase orders and records the outcome per
//! order.
//!
//! ## Batch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  dispatch_batch([PO-1, PO-2, PO-1, PO-3])                               │
//! │                                                                         │
//! │  1. Collapse duplicates          → [PO-1, PO-2, PO-3]                   │
//! │  2. Load + filter                → skipped: not placed / already sent   │
//! │  3. Send, `concurrency` at a time, each under `timeout_secs`            │
//! │       ┌──────────┐   ok    ┌────────────────────────────────────────┐  │
//! │       │  sender  │───────► │ notification=success, placed→confirmed │  │
//! │       │  .send() │         └────────────────────────────────────────┘  │
//! │       │          │ err /   ┌────────────────────────────────────────┐  │
//! │       │          │ timeout │ notification=failed, error recorded,   │  │
//! │       └──────────┘───────► │ status stays placed                    │  │
//! │                            └────────────────────────────────────────┘  │
//! │  4. DispatchSummary { attempted, succeeded, failed, skipped, results } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed send never aborts the batch and never affects another order.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use ts_rs::TS;
use uuid::Uuid;
use wholesale_core::validation::validate_actor;
use wholesale_core::{NotificationStatus, PurchaseOrder, PurchaseOrderStatus, ValidationError};

use crate::engine::EngineContext;
use crate::error::{EngineResult, TransportError};
use crate::ports::{NotificationSender, PurchaseOrderNotice, SendReceipt};

/// Outcome of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DispatchResult {
    pub order_number: String,
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

/// An order that was named in the batch but not sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SkippedDispatch {
    pub order_number: String,
    pub reason: String,
}

/// Summary of one dispatch batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DispatchSummary {
    pub batch_id: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: Vec<SkippedDispatch>,
    /// In the order the batch named them.
    pub results: Vec<DispatchResult>,
}

impl DispatchSummary {
    pub fn result(&self, order_number: &str) -> Option<&DispatchResult> {
        self.results.iter().find(|r| r.order_number == order_number)
    }
}

#[derive(Clone)]
pub struct DispatchCoordinator {
    ctx: EngineContext,
    sender: Arc<dyn NotificationSender>,
}

impl DispatchCoordinator {
    pub fn new(ctx: EngineContext, sender: Arc<dyn NotificationSender>) -> Self {
        DispatchCoordinator { ctx, sender }
    }

    /// Notifies the suppliers of the named purchase orders.
    ///
    /// ## Errors
    /// Only input errors (empty actor, batch over `max_batch_size`) fail the
    /// call; per-order problems end up in the summary.
    pub async fn dispatch_batch(
        &self,
        order_numbers: &[String],
        actor: &str,
    ) -> EngineResult<DispatchSummary> {
        validate_actor(actor)?;
        let max = self.ctx.config.dispatch.max_batch_size;
        if order_numbers.len() > max {
            return Err(ValidationError::OutOfRange {
                field: "dispatch batch size".to_string(),
                min: 1,
                max: max as i64,
            }
            .into());
        }

        let mut seen = HashSet::new();
        let mut eligible = Vec::new();
        let mut skipped = Vec::new();

        for number in order_numbers {
            if !seen.insert(number.as_str()) {
                debug!(order_number = %number, "Duplicate number in batch collapsed");
                continue;
            }

            match self.ctx.db.purchase_orders().get(number).await? {
                None => skipped.push(SkippedDispatch {
                    order_number: number.clone(),
                    reason: "not found".to_string(),
                }),
                Some(po) if po.status != PurchaseOrderStatus::Placed => {
                    skipped.push(SkippedDispatch {
                        order_number: number.clone(),
                        reason: format!("status is {}", po.status),
                    })
                }
                Some(po) if po.notification == NotificationStatus::Success => {
                    skipped.push(SkippedDispatch {
                        order_number: number.clone(),
                        reason: "already notified".to_string(),
                    })
                }
                Some(po) => eligible.push(po),
            }
        }

        Ok(self.run(eligible, skipped, actor).await)
    }

    /// Retries every placed order whose last notification failed.
    pub async fn resend_failed(&self, actor: &str) -> EngineResult<DispatchSummary> {
        validate_actor(actor)?;
        let failed = self.ctx.db.purchase_orders().list_failed_notifications().await?;
        info!(count = failed.len(), "Resending failed notifications");
        Ok(self.run(failed, Vec::new(), actor).await)
    }

    async fn run(
        &self,
        orders: Vec<PurchaseOrder>,
        skipped: Vec<SkippedDispatch>,
        actor: &str,
    ) -> DispatchSummary {
        let batch_id = Uuid::new_v4().to_string();
        let attempted = orders.len();
        info!(
            %batch_id,
            attempted,
            skipped = skipped.len(),
            concurrency = self.ctx.config.dispatch.concurrency,
            "Dispatch batch starting"
        );

        let mut indexed: Vec<(usize, DispatchResult)> = stream::iter(orders.into_iter().enumerate())
            .map(|(i, po)| async move { (i, self.dispatch_one(po, actor).await) })
            .buffer_unordered(self.ctx.config.dispatch.concurrency.max(1))
            .collect()
            .await;
        indexed.sort_by_key(|(i, _)| *i);
        let results: Vec<DispatchResult> = indexed.into_iter().map(|(_, r)| r).collect();

        let succeeded = results.iter().filter(|r| r.success).count();
        let summary = DispatchSummary {
            batch_id,
            attempted,
            succeeded,
            failed: attempted - succeeded,
            skipped,
            results,
        };

        info!(
            batch_id = %summary.batch_id,
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Dispatch batch complete"
        );
        summary
    }

    async fn send(&self, po: &PurchaseOrder) -> Result<SendReceipt, TransportError> {
        if po.supplier.notification_recipients.is_empty() {
            return Err(TransportError::NoRecipients);
        }

        let notice = PurchaseOrderNotice::for_order(po);
        let timeout = self.ctx.config.dispatch_timeout();

        match tokio::time::timeout(
            timeout,
            self.sender.send(&po.supplier.notification_recipients, &notice),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout.as_secs())),
        }
    }

    async fn dispatch_one(&self, po: PurchaseOrder, actor: &str) -> DispatchResult {
        let outcome = self.send(&po).await;
        let now = self.ctx.now();

        let mut next = po.clone();
        next.last_notified_at = Some(now);
        next.processed_by = Some(actor.trim().to_string());

        let (mut result, confirm) = match &outcome {
            Ok(receipt) => {
                next.notification = NotificationStatus::Success;
                next.last_notification_error = None;
                (
                    DispatchResult {
                        order_number: po.order_number.clone(),
                        success: true,
                        provider_message_id: receipt.provider_message_id.clone(),
                        error: None,
                    },
                    true,
                )
            }
            Err(e) => {
                warn!(order_number = %po.order_number, error = %e, "Supplier notification failed");
                next.notification = NotificationStatus::Failed;
                next.last_notification_error = Some(e.to_string());
                (
                    DispatchResult {
                        order_number: po.order_number.clone(),
                        success: false,
                        provider_message_id: None,
                        error: Some(e.to_string()),
                    },
                    false,
                )
            }
        };

        if confirm {
            match po.status.transition_to(PurchaseOrderStatus::Confirmed) {
                Ok(status) => next.status = status,
                Err(e) => {
                    error!(order_number = %po.order_number, error = %e, "Sent order cannot be confirmed");
                }
            }
        }

        if let Err(e) = self.ctx.db.purchase_orders().update(&next, po.version).await {
            // The message may have gone out; the store just does not know it.
            error!(
                order_number = %po.order_number,
                error = %e,
                "Failed to record dispatch outcome"
            );
            result.success = false;
            result.error = Some(format!("outcome not recorded: {}", e));
        } else {
            debug!(
                order_number = %po.order_number,
                success = result.success,
                "Dispatch outcome recorded"
            );
        }

        result
    }
}
