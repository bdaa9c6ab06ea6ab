//! Queue lifecycle events, observable by subscribers such as the DLQ observer (C6).
//!
//! Grounded on the spec's `onWaiting`/`onActive`/`onCompleted`/`onFailed`/`onStalled` subscriber
//! contract; modeled in Rust as an `async_trait` with no-op default methods, the same shape the
//! teacher uses for its market-data subscriber traits.

use async_trait::async_trait;

use super::job::Job;

#[async_trait]
pub trait QueueSubscriber: Send + Sync {
    async fn on_waiting(&self, _job: &Job) {}
    async fn on_active(&self, _job: &Job) {}
    async fn on_completed(&self, _job: &Job) {}
    async fn on_failed(&self, _job: &Job) {}
    /// Fired when a transient failure schedules a backoff-delayed retry. Not one of the spec's
    /// externally observable event names, but needed so the durable mirror records
    /// `next_run_at`/`attempts` for restart rehydration instead of leaving the job's last-known
    /// state stuck at `Active`.
    async fn on_delayed(&self, _job: &Job) {}
    /// Fired when a handler exceeds the soft timeout. Does not imply the job is done retrying —
    /// a stall is logged for monitoring only and never consumes an attempt.
    async fn on_stalled(&self, _job: &Job) {}
}
