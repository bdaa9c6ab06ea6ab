//! Order Intake (C4): validates a submission, opens a PENDING order, and enqueues the
//! fulfillment job. Grounded on the teacher's `gateway/handlers/order.rs::create_order` —
//! validate, generate an id, push onto the shared queue, return immediately without waiting for
//! the work to finish.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::core_types::{AuthenticatedUser, ProductId, StockId};
use crate::error::CoreError;
use crate::order::{Order, OrderSpec, OrderStore};
use crate::queue::PriorityJobQueue;
use crate::stock::StockStore;

pub struct OrderIntake<S, O> {
    stock_store: Arc<S>,
    order_store: Arc<O>,
    queue: Arc<PriorityJobQueue>,
}

impl<S, O> OrderIntake<S, O>
where
    S: StockStore,
    O: OrderStore,
{
    pub fn new(stock_store: Arc<S>, order_store: Arc<O>, queue: Arc<PriorityJobQueue>) -> Self {
        Self {
            stock_store,
            order_store,
            queue,
        }
    }

    /// Validates and admits a new order submission. The order is left PENDING whether or not
    /// enqueueing succeeds — a queue-full error here is surfaced to the caller but does not
    /// un-create the order, matching the spec's stance that intake and dispatch are decoupled.
    pub async fn submit(
        &self,
        user: AuthenticatedUser,
        product_id: ProductId,
        stock_id: StockId,
        quantity: u32,
        price_at_purchase: Decimal,
    ) -> Result<Order, CoreError> {
        if quantity == 0 {
            return Err(CoreError::Validation("quantity must be at least 1".into()));
        }
        if price_at_purchase.is_sign_negative() {
            return Err(CoreError::Validation("price must not be negative".into()));
        }
        // Confirms the stock row exists before admitting the order; the actual reservation
        // still happens under CAS in the worker, this is just a fail-fast on typos.
        self.stock_store.read_stock(stock_id).await?;

        let order = self
            .order_store
            .create_pending(OrderSpec {
                user_id: user.id,
                stock_id,
                product_id,
                quantity,
                price_at_purchase,
                is_vip: user.is_vip,
            })
            .await;

        self.queue.enqueue(order.id, user.is_vip).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::core_types::UserId;
    use crate::order::InMemoryOrderStore;
    use crate::stock::InMemoryStockStore;
    use std::time::Duration;

    fn queue_config() -> QueueConfig {
        QueueConfig {
            max_attempts: 5,
            backoff_base: Duration::from_millis(10),
            stall_timeout: Duration::from_secs(30),
            retain_completed: 500,
            retain_failed: 10,
        }
    }

    #[tokio::test]
    async fn submit_creates_pending_order_and_enqueues() {
        let stock_store = Arc::new(InMemoryStockStore::new());
        let order_store = Arc::new(InMemoryOrderStore::new());
        let queue = Arc::new(PriorityJobQueue::new(&queue_config()));
        let product_id = ProductId::new();
        let stock_id = stock_store.create(product_id, 10).await;

        let intake = OrderIntake::new(stock_store, order_store, queue.clone());
        let user = AuthenticatedUser {
            id: UserId(1),
            is_vip: true,
        };
        let order = intake
            .submit(user, product_id, stock_id, 2, Decimal::new(1000, 2))
            .await
            .unwrap();

        assert_eq!(order.status, crate::order::OrderStatus::Pending);
        let job = queue.dispatch().await.unwrap();
        assert_eq!(job.order_id, order.id);
        assert_eq!(job.priority, crate::config::VIP_PRIORITY);
    }

    #[tokio::test]
    async fn submit_rejects_zero_quantity() {
        let stock_store = Arc::new(InMemoryStockStore::new());
        let order_store = Arc::new(InMemoryOrderStore::new());
        let queue = Arc::new(PriorityJobQueue::new(&queue_config()));
        let product_id = ProductId::new();
        let stock_id = stock_store.create(product_id, 10).await;

        let intake = OrderIntake::new(stock_store, order_store, queue);
        let user = AuthenticatedUser {
            id: UserId(2),
            is_vip: false,
        };
        let err = intake
            .submit(user, product_id, stock_id, 0, Decimal::new(1000, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_rejects_unknown_stock() {
        let stock_store = Arc::new(InMemoryStockStore::new());
        let order_store = Arc::new(InMemoryOrderStore::new());
        let queue = Arc::new(PriorityJobQueue::new(&queue_config()));

        let intake = OrderIntake::new(stock_store, order_store, queue);
        let user = AuthenticatedUser {
            id: UserId(3),
            is_vip: false,
        };
        let err = intake
            .submit(
                user,
                ProductId::new(),
                StockId::new(),
                1,
                Decimal::new(100, 2),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::StockNotFound(_)));
    }
}
