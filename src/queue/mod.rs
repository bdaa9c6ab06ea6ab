pub mod events;
pub mod job;
pub mod queue;
pub mod repository;

pub use events::QueueSubscriber;
pub use job::{BackoffPolicy, Job, JobState};
pub use queue::PriorityJobQueue;
pub use repository::QueueRepository;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::QueueConfig;
    use crate::core_types::OrderId;

    use super::job::JobState;
    use super::queue::PriorityJobQueue;

    fn config() -> QueueConfig {
        QueueConfig {
            max_attempts: 5,
            backoff_base: Duration::from_millis(0),
            stall_timeout: Duration::from_secs(30),
            retain_completed: 500,
            retain_failed: 10,
        }
    }

    #[tokio::test]
    async fn vip_dispatches_before_earlier_regular() {
        let queue = PriorityJobQueue::new(&config());
        let regular = queue.enqueue(OrderId::new(), false).await;
        let vip = queue.enqueue(OrderId::new(), true).await;

        let first = queue.dispatch().await.unwrap();
        assert_eq!(first.id, vip);
        let second = queue.dispatch().await.unwrap();
        assert_eq!(second.id, regular);
    }

    #[tokio::test]
    async fn fifo_within_a_priority_class() {
        let queue = PriorityJobQueue::new(&config());
        let a = queue.enqueue(OrderId::new(), false).await;
        let b = queue.enqueue(OrderId::new(), false).await;

        assert_eq!(queue.dispatch().await.unwrap().id, a);
        assert_eq!(queue.dispatch().await.unwrap().id, b);
    }

    #[tokio::test]
    async fn backoff_schedule_doubles_each_attempt() {
        let policy = super::job::BackoffPolicy {
            base: Duration::from_secs(2),
            max_attempts: 5,
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn exhausted_retries_move_straight_to_dead_letter() {
        let queue = PriorityJobQueue::new(&config());
        let id = queue.enqueue(OrderId::new(), false).await;
        for _ in 0..5 {
            queue.dispatch().await.unwrap();
            queue.fail_retryable(id, "transient".into()).await;
            // Force the delayed entry due immediately for the test instead of sleeping real time.
            if let Some(job) = queue.get(id) {
                if job.state == JobState::Delayed {
                    queue.requeue_due_delays_for_test().await;
                }
            }
        }
        let job = queue.get(id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, 5);
    }

    #[tokio::test]
    async fn move_to_failed_bypasses_retries() {
        let queue = PriorityJobQueue::new(&config());
        let id = queue.enqueue(OrderId::new(), false).await;
        queue.dispatch().await.unwrap();
        queue.move_to_failed(id, "stock not found".into()).await;
        let job = queue.get(id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, 1);
    }
}
