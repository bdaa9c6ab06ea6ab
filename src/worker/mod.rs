//! Worker pool: N tokio tasks pulling from the priority queue and running the order handler.
//!
//! Grounded on the `tokio::select!` + `CancellationToken` shutdown shape from
//! `other_examples/.../mls-ds__server-src-federation-queue.rs::run_worker`, and on the
//! soft-timeout-around-handler pattern implied by the spec's stall detection.

pub mod handler;
pub mod payment;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::order::OrderStore;
use crate::queue::PriorityJobQueue;
use crate::stock::StockStore;

pub use handler::{Outcome, OrderHandler};
pub use payment::{NoopPaymentGateway, PaymentGateway, SimulatedPaymentGateway};

/// Spawns `pool_size` worker loops, each dispatching from the shared queue until cancelled.
pub fn spawn_pool<S, O>(
    pool_size: usize,
    queue: Arc<PriorityJobQueue>,
    handler: Arc<OrderHandler<S, O>>,
    stall_timeout: Duration,
    cancel: CancellationToken,
) -> Vec<tokio::task::JoinHandle<()>>
where
    S: StockStore + 'static,
    O: OrderStore + 'static,
{
    (0..pool_size)
        .map(|_| {
            let queue = queue.clone();
            let handler = handler.clone();
            let cancel = cancel.clone();
            tokio::spawn(run_worker_loop(queue, handler, stall_timeout, cancel))
        })
        .collect()
}

async fn run_worker_loop<S, O>(
    queue: Arc<PriorityJobQueue>,
    handler: Arc<OrderHandler<S, O>>,
    stall_timeout: Duration,
    cancel: CancellationToken,
) where
    S: StockStore + 'static,
    O: OrderStore + 'static,
{
    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => return,
            job = queue.dispatch_blocking() => job,
        };

        let order_id = job.order_id;
        let outcome = match tokio::time::timeout(stall_timeout, handler.handle(order_id)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                // The handler future is dropped at the timeout; the order is left PENDING. The
                // queue makes the job re-eligible for dispatch (or dead-letters it if this was
                // the last attempt) so another worker picks the order back up.
                queue.mark_stalled(job.id).await;
                continue;
            }
        };

        match outcome {
            Outcome::Confirmed => queue.complete(job.id).await,
            Outcome::BusinessFailed(reason) => queue.move_to_failed(job.id, reason).await,
            Outcome::Transient(err) => queue.fail_retryable(job.id, err.to_string()).await,
        }
    }
}
