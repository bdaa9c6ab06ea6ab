//! Job record and retry/backoff policy for the priority queue.
//!
//! Grounded on `other_examples/.../apex__src-backend-core-src-jobs-job.rs`'s `JobStatus` /
//! `RetryPolicy` / exponential-backoff shape, narrowed from a general job system to the one
//! payload this core ever queues: an order awaiting fulfillment.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_types::{JobId, OrderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Waiting,
    Active,
    Delayed,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Fixed exponential backoff: `base * 2^(attempt - 1)`, one-indexed by attempt number.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        self.base.saturating_mul(1u32 << exponent)
    }

    pub fn exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub order_id: OrderId,
    /// Lower sorts first. `config::VIP_PRIORITY` (1) beats `config::REGULAR_PRIORITY` (255).
    pub priority: u8,
    pub state: JobState,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set while `Delayed`; the scheduler only requeues once `Utc::now() >= next_run_at`.
    pub next_run_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(order_id: OrderId, priority: u8, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            order_id,
            priority,
            state: JobState::Waiting,
            attempts: 0,
            max_attempts,
            last_error: None,
            created_at: now,
            updated_at: now,
            next_run_at: None,
        }
    }
}
