//! In-process priority job queue: two priority lanes (VIP / regular), FIFO within a lane,
//! priority resolved only at dispatch time so a VIP submission jumps ahead of already-waiting
//! regular jobs without disturbing relative order inside either lane.
//!
//! Grounded on the teacher's `gateway/state.rs` (`Arc<ArrayQueue<OrderAction>>` as shared queue
//! state) generalized from a single FIFO lane to two, and on
//! `other_examples/.../mls-ds__server-src-federation-queue.rs`'s `tokio::time::interval` +
//! `tokio_util::sync::CancellationToken` poll-loop shape for the delayed-retry scheduler.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::config::{QueueConfig, REGULAR_PRIORITY, VIP_PRIORITY};
use crate::core_types::{JobId, OrderId};

use super::events::QueueSubscriber;
use super::job::{BackoffPolicy, Job, JobState};

struct Lanes {
    vip: VecDeque<JobId>,
    regular: VecDeque<JobId>,
    delayed: Vec<JobId>,
    completed: VecDeque<JobId>,
    failed: VecDeque<JobId>,
}

impl Lanes {
    fn new() -> Self {
        Self {
            vip: VecDeque::new(),
            regular: VecDeque::new(),
            delayed: Vec::new(),
            completed: VecDeque::new(),
            failed: VecDeque::new(),
        }
    }
}

pub struct PriorityJobQueue {
    jobs: DashMap<JobId, Job>,
    lanes: Mutex<Lanes>,
    ready: Notify,
    backoff: BackoffPolicy,
    retain_completed: usize,
    retain_failed: usize,
    subscribers: Vec<Arc<dyn QueueSubscriber>>,
}

impl PriorityJobQueue {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            jobs: DashMap::new(),
            lanes: Mutex::new(Lanes::new()),
            ready: Notify::new(),
            backoff: BackoffPolicy {
                base: config.backoff_base,
                max_attempts: config.max_attempts,
            },
            retain_completed: config.retain_completed,
            retain_failed: config.retain_failed,
            subscribers: Vec::new(),
        }
    }

    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn QueueSubscriber>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Enqueue an order-fulfillment job. VIP submissions use `config::VIP_PRIORITY`, everyone
    /// else `config::REGULAR_PRIORITY`; lower sorts first so VIP always dispatches before
    /// regular work waiting in the other lane.
    pub async fn enqueue(&self, order_id: OrderId, is_vip: bool) -> JobId {
        let priority = if is_vip { VIP_PRIORITY } else { REGULAR_PRIORITY };
        let job = Job::new(order_id, priority, self.backoff.max_attempts);
        let id = job.id;
        self.jobs.insert(id, job.clone());
        {
            let mut lanes = self.lanes.lock().await;
            if is_vip {
                lanes.vip.push_back(id);
            } else {
                lanes.regular.push_back(id);
            }
        }
        self.notify_waiting(&job).await;
        self.ready.notify_one();
        id
    }

    /// Pop the next ready job: VIP lane first, regular lane otherwise. Marks it `Active`.
    pub async fn dispatch(&self) -> Option<Job> {
        loop {
            let popped = {
                let mut lanes = self.lanes.lock().await;
                lanes.vip.pop_front().or_else(|| lanes.regular.pop_front())
            };
            let Some(id) = popped else {
                return None;
            };
            let Some(mut entry) = self.jobs.get_mut(&id) else {
                continue;
            };
            entry.state = JobState::Active;
            entry.attempts += 1;
            entry.updated_at = Utc::now();
            let job = entry.clone();
            drop(entry);
            self.notify_active(&job).await;
            return Some(job);
        }
    }

    /// Blocks until a job is ready, then dispatches it. Used by worker pool loops.
    pub async fn dispatch_blocking(&self) -> Job {
        loop {
            if let Some(job) = self.dispatch().await {
                return job;
            }
            self.ready.notified().await;
        }
    }

    pub async fn complete(&self, id: JobId) {
        let Some(mut entry) = self.jobs.get_mut(&id) else {
            return;
        };
        entry.state = JobState::Completed;
        entry.updated_at = Utc::now();
        let job = entry.clone();
        drop(entry);
        {
            let mut lanes = self.lanes.lock().await;
            lanes.completed.push_back(id);
            while lanes.completed.len() > self.retain_completed {
                lanes.completed.pop_front();
            }
        }
        self.notify_completed(&job).await;
    }

    /// Record a failed attempt. If attempts remain, schedules a delayed retry with exponential
    /// backoff; otherwise moves the job straight to the dead-letter lane.
    pub async fn fail_retryable(&self, id: JobId, reason: String) {
        let exhausted = {
            let Some(entry) = self.jobs.get(&id) else {
                return;
            };
            self.backoff.exhausted(entry.attempts)
        };
        if exhausted {
            self.move_to_failed(id, reason).await;
            return;
        }
        let job = {
            let Some(mut entry) = self.jobs.get_mut(&id) else {
                return;
            };
            entry.state = JobState::Delayed;
            entry.last_error = Some(reason);
            entry.updated_at = Utc::now();
            let delay = self.backoff.delay_for_attempt(entry.attempts);
            entry.next_run_at =
                Some(Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default());
            entry.clone()
        };
        {
            let mut lanes = self.lanes.lock().await;
            lanes.delayed.push(id);
        }
        // Picked back up by `run_delay_scheduler`'s periodic sweep once due; no separate timer
        // task per job, so backoff delays don't pile up spawned tasks under heavy retry load.
        self.notify_delayed(&job).await;
    }

    /// Bypass retries entirely and move a job straight to the dead-letter lane. Used by the
    /// business-failure path, where retrying would never help.
    pub async fn move_to_failed(&self, id: JobId, reason: String) {
        let Some(mut entry) = self.jobs.get_mut(&id) else {
            return;
        };
        entry.state = JobState::Failed;
        entry.last_error = Some(reason);
        entry.updated_at = Utc::now();
        let job = entry.clone();
        drop(entry);
        {
            let mut lanes = self.lanes.lock().await;
            lanes.failed.push_back(id);
            while lanes.failed.len() > self.retain_failed {
                lanes.failed.pop_front();
            }
        }
        self.notify_failed(&job).await;
    }

    /// Handler exceeded the soft timeout (or the worker holding it crashed). `dispatch` already
    /// charged this attempt against `maxAttempts`, but a stall is not a retryable failure — per
    /// the at-least-once delivery contract the job just becomes re-eligible for dispatch, with
    /// `attempts` left exactly where it was before this dispatch.
    pub async fn mark_stalled(&self, id: JobId) {
        let exhausted = {
            let Some(entry) = self.jobs.get(&id) else {
                return;
            };
            self.backoff.exhausted(entry.attempts)
        };
        if exhausted {
            if let Some(job) = self.jobs.get(&id).map(|e| e.clone()) {
                self.notify_stalled(&job).await;
            }
            self.move_to_failed(id, "stalled: max attempts exhausted".into())
                .await;
            return;
        }
        let job = {
            let mut entry = match self.jobs.get_mut(&id) {
                Some(entry) => entry,
                None => return,
            };
            // Undo the charge `dispatch` made for this attempt; a stall must not consume any of
            // the job's retry budget.
            entry.attempts = entry.attempts.saturating_sub(1);
            entry.state = JobState::Waiting;
            entry.updated_at = Utc::now();
            entry.clone()
        };
        {
            let mut lanes = self.lanes.lock().await;
            if job.priority == VIP_PRIORITY {
                lanes.vip.push_back(id);
            } else {
                lanes.regular.push_back(id);
            }
        }
        self.ready.notify_one();
        self.notify_stalled(&job).await;
    }

    #[cfg(test)]
    pub async fn requeue_due_delays_for_test(&self) {
        self.requeue_due_delays().await;
    }

    /// Moves due delayed jobs back onto their priority lane. Intended to run on a periodic
    /// ticker for the lifetime of the process, cancellable via the supplied token.
    pub async fn run_delay_scheduler(&self, tick: Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(tick);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = interval.tick() => self.requeue_due_delays().await,
            }
        }
    }

    async fn requeue_due_delays(&self) {
        let now = Utc::now();
        let due: Vec<JobId> = {
            let mut lanes = self.lanes.lock().await;
            let mut due = Vec::new();
            lanes.delayed.retain(|id| {
                let is_due = self
                    .jobs
                    .get(id)
                    .and_then(|j| j.next_run_at)
                    .map(|t| t <= now)
                    .unwrap_or(true);
                if is_due {
                    due.push(*id);
                }
                !is_due
            });
            due
        };
        if due.is_empty() {
            return;
        }
        let mut requeued = Vec::with_capacity(due.len());
        {
            let mut lanes = self.lanes.lock().await;
            for id in due {
                let Some(mut entry) = self.jobs.get_mut(&id) else {
                    continue;
                };
                entry.state = JobState::Waiting;
                entry.next_run_at = None;
                let is_vip = entry.priority == VIP_PRIORITY;
                requeued.push(entry.clone());
                drop(entry);
                if is_vip {
                    lanes.vip.push_back(id);
                } else {
                    lanes.regular.push_back(id);
                }
            }
        }
        self.ready.notify_waiters();
        // Mirrors the job durably as it leaves `Delayed` for `Waiting` so a crash mid-backoff
        // doesn't leave the durable store stuck on its last-mirrored `Delayed`/`Active` state.
        for job in &requeued {
            self.notify_waiting(job).await;
        }
    }

    /// Rehydrates the queue from durably-stored jobs on startup. A job still `Active` when the
    /// process crashed gets no credit for that in-flight attempt outcome, so it is requeued as
    /// `Waiting` rather than resumed mid-flight — the handler re-does the work from scratch next
    /// dispatch, which is safe since reserve/confirm are themselves idempotent-guarded.
    pub async fn rehydrate(&self, jobs: Vec<Job>) {
        let mut lanes = self.lanes.lock().await;
        for mut job in jobs {
            match job.state {
                JobState::Active => {
                    job.state = JobState::Waiting;
                }
                JobState::Delayed => {
                    lanes.delayed.push(job.id);
                    self.jobs.insert(job.id, job);
                    continue;
                }
                _ => {}
            }
            let is_vip = job.priority == VIP_PRIORITY;
            let id = job.id;
            self.jobs.insert(id, job);
            if is_vip {
                lanes.vip.push_back(id);
            } else {
                lanes.regular.push_back(id);
            }
        }
        drop(lanes);
        self.ready.notify_waiters();
    }

    pub fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.get(&id).map(|j| j.clone())
    }

    /// Linear scan, used only by the retrieval API to surface an `attempts` count alongside an
    /// order. Acceptable here since it is read-only observability, never a correctness path.
    pub fn find_by_order(&self, order_id: OrderId) -> Option<Job> {
        self.jobs
            .iter()
            .find(|entry| entry.order_id == order_id)
            .map(|entry| entry.clone())
    }

    async fn notify_waiting(&self, job: &Job) {
        for sub in &self.subscribers {
            sub.on_waiting(job).await;
        }
    }
    async fn notify_delayed(&self, job: &Job) {
        for sub in &self.subscribers {
            sub.on_delayed(job).await;
        }
    }
    async fn notify_active(&self, job: &Job) {
        for sub in &self.subscribers {
            sub.on_active(job).await;
        }
    }
    async fn notify_completed(&self, job: &Job) {
        for sub in &self.subscribers {
            sub.on_completed(job).await;
        }
    }
    async fn notify_failed(&self, job: &Job) {
        for sub in &self.subscribers {
            sub.on_failed(job).await;
        }
    }
    async fn notify_stalled(&self, job: &Job) {
        for sub in &self.subscribers {
            sub.on_stalled(job).await;
        }
    }
}
