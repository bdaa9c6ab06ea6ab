//! Order Worker (C5): the job handler that actually moves an order from PENDING to a terminal
//! status. Reserve stock, capture payment, confirm; compensate (release stock) if payment fails
//! after the reservation already succeeded.
//!
//! Grounded on the spec's three-way business/transient/confirmed split (design note #3) and on
//! the teacher's `balance.rs` lock-then-settle-or-unlock sequencing (`lock` followed by either
//! `spend_frozen` or `unlock`), which is the same "reserve now, compensate on later failure"
//! shape applied here to stock instead of balance.

use std::sync::Arc;

use crate::core_types::OrderId;
use crate::error::CoreError;
use crate::order::{Order, OrderStore, TerminalWrite};
use crate::stock::StockStore;

use super::payment::PaymentGateway;

/// What happened to one dispatch attempt at an order.
#[derive(Debug)]
pub enum Outcome {
    /// Order reached CONFIRMED.
    Confirmed,
    /// Order reached FAILED permanently; retrying would never help.
    BusinessFailed(String),
    /// The attempt failed for a reason that might succeed on retry. The job should be
    /// rescheduled with backoff, not marked FAILED yet.
    Transient(CoreError),
}

pub struct OrderHandler<S, O> {
    stock_store: Arc<S>,
    order_store: Arc<O>,
    payment: Arc<dyn PaymentGateway>,
}

impl<S, O> OrderHandler<S, O>
where
    S: StockStore + 'static,
    O: OrderStore + 'static,
{
    pub fn new(stock_store: Arc<S>, order_store: Arc<O>, payment: Arc<dyn PaymentGateway>) -> Self {
        Self {
            stock_store,
            order_store,
            payment,
        }
    }

    pub async fn handle(&self, order_id: OrderId) -> Outcome {
        let order = match self.order_store.get_order(order_id).await {
            Ok(order) => order,
            Err(err) => return Outcome::Transient(err),
        };

        if order.status.is_terminal() {
            // A previous attempt (or a duplicate dispatch) already settled this order; treat it
            // as confirmed/failed-as-already-handled rather than doing the work twice.
            return match order.status {
                crate::order::OrderStatus::Confirmed => Outcome::Confirmed,
                _ => Outcome::BusinessFailed(
                    order.failure_reason.unwrap_or_else(|| "already failed".into()),
                ),
            };
        }

        match self.stock_store.reserve(order.stock_id, order.quantity).await {
            Ok(_) => {}
            Err(err @ CoreError::Insufficient { .. }) => {
                return self.settle_business_failure(&order, err).await;
            }
            Err(err @ CoreError::StockNotFound(_)) => {
                return self.settle_business_failure(&order, err).await;
            }
            Err(err @ CoreError::VersionConflict(_)) => return Outcome::Transient(err),
            Err(err) => return Outcome::Transient(err),
        }

        match self.payment.capture(order.id).await {
            Ok(()) => self.settle_confirmed(&order).await,
            Err(err) if err.is_transient() => {
                // Compensate: the reservation already happened, so a retried attempt must not
                // double-reserve. Release it now; the next attempt reserves fresh.
                self.compensate(&order).await;
                Outcome::Transient(err)
            }
            Err(err) => {
                self.compensate(&order).await;
                self.settle_business_failure(&order, err).await
            }
        }
    }

    /// Releases a reservation made earlier in this attempt. A failure here leaves stock
    /// under-counted until an operator reconciles it — the one acknowledged weakness of this
    /// design — so it is logged loudly rather than silently discarded, and never allowed to mask
    /// the original transient error that triggered the compensation.
    async fn compensate(&self, order: &Order) {
        if let Err(release_err) = self.stock_store.release(order.stock_id, order.quantity).await {
            let critical = CoreError::Critical(format!(
                "failed to release stock {} for order {}: {release_err}",
                order.stock_id, order.id
            ));
            tracing::error!(
                order_id = %order.id,
                stock_id = %order.stock_id,
                quantity = order.quantity,
                error = %release_err,
                "{critical}"
            );
        }
    }

    async fn settle_confirmed(&self, order: &Order) -> Outcome {
        match self.order_store.mark_confirmed(order.id).await {
            Ok(TerminalWrite::Applied | TerminalWrite::AlreadyTerminal) => Outcome::Confirmed,
            Err(err) => {
                // The reservation from step 2 already succeeded; a retried attempt reserves
                // fresh, so this one must be released before the transient error propagates.
                self.compensate(order).await;
                Outcome::Transient(err)
            }
        }
    }

    async fn settle_business_failure(&self, order: &Order, err: CoreError) -> Outcome {
        let reason = err.failure_reason();
        match self.order_store.mark_failed(order.id, reason.clone()).await {
            Ok(_) => Outcome::BusinessFailed(reason),
            Err(err) => Outcome::Transient(err),
        }
    }
}
