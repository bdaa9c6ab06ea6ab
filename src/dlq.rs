//! DLQ Observer (C6): reacts to queue events for monitoring and idempotent cleanup.
//!
//! `on_failed` marks the corresponding order FAILED if something raced ahead and it is still
//! PENDING (the worker normally does this itself, but a job can reach the dead-letter lane via
//! `move_to_failed` bypass paths that don't always go through the same order mutation, and this
//! is the backstop). `on_stalled` only logs, per the spec's stance that a stall alone is not a
//! terminal signal.

use std::sync::Arc;

use async_trait::async_trait;

use crate::order::OrderStore;
use crate::queue::{Job, QueueSubscriber};

pub struct DlqObserver<O> {
    order_store: Arc<O>,
}

impl<O> DlqObserver<O>
where
    O: OrderStore,
{
    pub fn new(order_store: Arc<O>) -> Self {
        Self { order_store }
    }
}

#[async_trait]
impl<O> QueueSubscriber for DlqObserver<O>
where
    O: OrderStore,
{
    async fn on_failed(&self, job: &Job) {
        let reason = job
            .last_error
            .clone()
            .unwrap_or_else(|| "exhausted retries".into());
        match self.order_store.mark_failed(job.order_id, reason).await {
            Ok(_) => {}
            Err(err) => {
                tracing::error!(order_id = %job.order_id, job_id = %job.id, error = %err, "dlq observer failed to mark order failed");
            }
        }
    }

    async fn on_stalled(&self, job: &Job) {
        tracing::warn!(order_id = %job.order_id, job_id = %job.id, attempts = job.attempts, "job stalled past soft timeout");
    }
}
