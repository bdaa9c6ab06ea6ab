//! Durable mirror of queued jobs, so an in-flight retry schedule survives a restart.
//!
//! Grounded on `other_examples/.../mls-ds__server-src-federation-queue.rs`'s `outbound_queue`
//! table, which stores `next_retry_at` as a plain timestamp column populated from
//! `NOW() + make_interval(secs => $n)` — the same shape used here for `next_run_at`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core_types::{JobId, OrderId};
use crate::error::CoreError;

use super::events::QueueSubscriber;
use super::job::{Job, JobState};

pub struct QueueRepository {
    pool: PgPool,
}

impl QueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads every job not yet in a terminal state, for rehydrating the in-process queue.
    pub async fn load_pending(&self) -> Result<Vec<Job>, CoreError> {
        let rows = sqlx::query_as::<_, JobRowSql>(
            "SELECT id, order_id, priority, state, attempts, max_attempts, last_error, \
                    created_at, updated_at, next_run_at \
             FROM jobs WHERE state NOT IN ('COMPLETED', 'FAILED')",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Inserts a brand-new job row, or — if a job with this id is already mirrored (it left
    /// `Delayed` and came back to `Waiting`, rather than being enqueued for the first time) —
    /// updates the mutable fields in place instead of conflicting on the primary key.
    pub async fn insert(&self, job: &Job) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO jobs \
                (id, order_id, priority, state, attempts, max_attempts, last_error, \
                 created_at, updated_at, next_run_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, NULL) \
             ON CONFLICT (id) DO UPDATE SET \
                state = EXCLUDED.state, attempts = EXCLUDED.attempts, \
                last_error = EXCLUDED.last_error, updated_at = NOW(), next_run_at = NULL",
        )
        .bind(job.id.0)
        .bind(job.order_id.0)
        .bind(job.priority as i16)
        .bind(state_str(job.state))
        .bind(job.attempts as i32)
        .bind(job.max_attempts as i32)
        .bind(&job.last_error)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mirror_state(&self, job: &Job) -> Result<(), CoreError> {
        sqlx::query(
            "UPDATE jobs SET state = $1, attempts = $2, last_error = $3, updated_at = NOW(), \
                    next_run_at = $4 \
             WHERE id = $5",
        )
        .bind(state_str(job.state))
        .bind(job.attempts as i32)
        .bind(&job.last_error)
        .bind(job.next_run_at)
        .bind(job.id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// The queue repository doubles as a [`QueueSubscriber`]: every state transition the in-process
/// queue already committed gets mirrored here so a restart can rehydrate via
/// [`QueueRepository::load_pending`]. Best-effort — a mirror write failure is logged, never
/// propagated, since the in-process queue remains the source of truth while the process is alive.
#[async_trait]
impl QueueSubscriber for QueueRepository {
    async fn on_waiting(&self, job: &Job) {
        if let Err(e) = self.insert(job).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to mirror new job");
        }
    }

    async fn on_active(&self, job: &Job) {
        if let Err(e) = self.mirror_state(job).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to mirror active job");
        }
    }

    async fn on_completed(&self, job: &Job) {
        if let Err(e) = self.mirror_state(job).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to mirror completed job");
        }
    }

    async fn on_delayed(&self, job: &Job) {
        if let Err(e) = self.mirror_state(job).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to mirror delayed job");
        }
    }

    async fn on_failed(&self, job: &Job) {
        if let Err(e) = self.mirror_state(job).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to mirror failed job");
        }
    }
}

fn state_str(state: JobState) -> &'static str {
    match state {
        JobState::Waiting => "WAITING",
        JobState::Active => "ACTIVE",
        JobState::Delayed => "DELAYED",
        JobState::Completed => "COMPLETED",
        JobState::Failed => "FAILED",
    }
}

#[derive(sqlx::FromRow)]
struct JobRowSql {
    id: Uuid,
    order_id: Uuid,
    priority: i16,
    state: String,
    attempts: i32,
    max_attempts: i32,
    last_error: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    next_run_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<JobRowSql> for Job {
    fn from(row: JobRowSql) -> Self {
        let state = match row.state.as_str() {
            "ACTIVE" => JobState::Active,
            "DELAYED" => JobState::Delayed,
            "COMPLETED" => JobState::Completed,
            "FAILED" => JobState::Failed,
            _ => JobState::Waiting,
        };
        Job {
            id: JobId(row.id),
            order_id: OrderId(row.order_id),
            priority: row.priority as u8,
            state,
            attempts: row.attempts as u32,
            max_attempts: row.max_attempts as u32,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
            next_run_at: row.next_run_at,
        }
    }
}
