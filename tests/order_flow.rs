//! End-to-end coverage wiring intake, the priority queue, the worker pool, and the order/stock
//! stores together, for the scenarios a single module's unit tests can't exercise on their own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use order_core::config::QueueConfig;
use order_core::core_types::{AuthenticatedUser, OrderId, ProductId, UserId};
use order_core::dlq::DlqObserver;
use order_core::error::CoreError;
use order_core::intake::OrderIntake;
use order_core::order::{InMemoryOrderStore, OrderStatus, OrderStore};
use order_core::queue::{PriorityJobQueue, QueueSubscriber};
use order_core::stock::{InMemoryStockStore, StockStore};
use order_core::worker::{self, NoopPaymentGateway, OrderHandler, PaymentGateway};

fn queue_config() -> QueueConfig {
    QueueConfig {
        max_attempts: 5,
        backoff_base: Duration::from_millis(10),
        stall_timeout: Duration::from_secs(5),
        retain_completed: 500,
        retain_failed: 10,
    }
}

fn user(id: i64, is_vip: bool) -> AuthenticatedUser {
    AuthenticatedUser {
        id: UserId(id),
        is_vip,
    }
}

/// Polls `get_order` until it reaches a terminal status or the deadline passes.
async fn wait_for_terminal(order_store: &InMemoryOrderStore, id: OrderId) -> OrderStatus {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let order = order_store.get_order(id).await.unwrap();
        if order.status.is_terminal() || tokio::time::Instant::now() >= deadline {
            return order.status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Scenario 1 (single happy path): submit one order against ample stock and expect it confirmed
/// with stock decremented by exactly the reserved quantity.
#[tokio::test]
async fn single_happy_path_confirms_and_decrements_stock() {
    let stock_store = Arc::new(InMemoryStockStore::new());
    let order_store = Arc::new(InMemoryOrderStore::new());
    let queue = Arc::new(PriorityJobQueue::new(&queue_config()));
    let product_id = ProductId::new();
    let stock_id = stock_store.create(product_id, 100).await;

    let intake = OrderIntake::new(stock_store.clone(), order_store.clone(), queue.clone());
    let order = intake
        .submit(user(1, false), product_id, stock_id, 5, Decimal::new(9999, 2))
        .await
        .unwrap();

    let handler = Arc::new(OrderHandler::new(
        stock_store.clone(),
        order_store.clone(),
        Arc::new(NoopPaymentGateway) as Arc<dyn PaymentGateway>,
    ));
    let cancel = CancellationToken::new();
    let handles = worker::spawn_pool(1, queue.clone(), handler, Duration::from_secs(5), cancel.clone());

    assert_eq!(wait_for_terminal(&order_store, order.id).await, OrderStatus::Confirmed);
    let snap = stock_store.read_stock(stock_id).await.unwrap();
    assert_eq!(snap.quantity, 95);
    assert_eq!(snap.version, 1);

    cancel.cancel();
    for h in handles {
        let _ = h.await;
    }
}

/// Scenario 2 (concurrent same-stock): ten concurrent orders of 2 units each against a stock of
/// 100 all confirm, and the final quantity reflects every reservation exactly once.
#[tokio::test]
async fn concurrent_orders_on_ample_stock_all_confirm() {
    let stock_store = Arc::new(InMemoryStockStore::new());
    let order_store = Arc::new(InMemoryOrderStore::new());
    let queue = Arc::new(PriorityJobQueue::new(&queue_config()));
    let product_id = ProductId::new();
    let stock_id = stock_store.create(product_id, 100).await;

    let intake = Arc::new(OrderIntake::new(
        stock_store.clone(),
        order_store.clone(),
        queue.clone(),
    ));

    let mut submits = Vec::new();
    for i in 0..10 {
        let intake = intake.clone();
        submits.push(tokio::spawn(async move {
            intake
                .submit(user(i, false), product_id, stock_id, 2, Decimal::new(500, 2))
                .await
                .unwrap()
        }));
    }
    let mut order_ids = Vec::new();
    for s in submits {
        order_ids.push(s.await.unwrap().id);
    }

    let handler = Arc::new(OrderHandler::new(
        stock_store.clone(),
        order_store.clone(),
        Arc::new(NoopPaymentGateway) as Arc<dyn PaymentGateway>,
    ));
    let cancel = CancellationToken::new();
    let handles = worker::spawn_pool(4, queue.clone(), handler, Duration::from_secs(5), cancel.clone());

    for id in &order_ids {
        assert_eq!(wait_for_terminal(&order_store, *id).await, OrderStatus::Confirmed);
    }
    let snap = stock_store.read_stock(stock_id).await.unwrap();
    assert_eq!(snap.quantity, 80);

    cancel.cancel();
    for h in handles {
        let _ = h.await;
    }
}

/// Scenario 3 (depletion): five concurrent orders of 2 units against a stock of 5 can only ever
/// seat two of them; the rest fail business-side with an "Insufficient" reason and stock settles
/// at 1 (not 5 minus all five attempts).
#[tokio::test]
async fn depletion_confirms_exactly_as_many_as_fit() {
    let stock_store = Arc::new(InMemoryStockStore::new());
    let order_store = Arc::new(InMemoryOrderStore::new());
    let queue = Arc::new(PriorityJobQueue::new(&queue_config()));
    let product_id = ProductId::new();
    let stock_id = stock_store.create(product_id, 5).await;

    let intake = Arc::new(OrderIntake::new(
        stock_store.clone(),
        order_store.clone(),
        queue.clone(),
    ));

    let mut submits = Vec::new();
    for i in 0..5 {
        let intake = intake.clone();
        submits.push(tokio::spawn(async move {
            intake
                .submit(user(i, false), product_id, stock_id, 2, Decimal::new(500, 2))
                .await
                .unwrap()
        }));
    }
    let mut order_ids = Vec::new();
    for s in submits {
        order_ids.push(s.await.unwrap().id);
    }

    let handler = Arc::new(OrderHandler::new(
        stock_store.clone(),
        order_store.clone(),
        Arc::new(NoopPaymentGateway) as Arc<dyn PaymentGateway>,
    ));
    let cancel = CancellationToken::new();
    let handles = worker::spawn_pool(5, queue.clone(), handler, Duration::from_secs(5), cancel.clone());

    let mut confirmed = 0;
    let mut failed = 0;
    for id in &order_ids {
        match wait_for_terminal(&order_store, *id).await {
            OrderStatus::Confirmed => confirmed += 1,
            OrderStatus::Failed => {
                failed += 1;
                let order = order_store.get_order(*id).await.unwrap();
                assert!(order.failure_reason.unwrap().contains("insufficient"));
            }
            other => panic!("order left non-terminal: {other:?}"),
        }
    }

    assert_eq!(confirmed, 2);
    assert_eq!(failed, 3);
    let snap = stock_store.read_stock(stock_id).await.unwrap();
    assert_eq!(snap.quantity, 1);

    cancel.cancel();
    for h in handles {
        let _ = h.await;
    }
}

/// A payment gateway that blocks the first capture (the "occupant" job) on a `Notify`, so the
/// test can deterministically hold a single-worker pool busy while more jobs queue up behind it,
/// then release it and observe dispatch order. Every capture (including the occupant's, once
/// released) is recorded in arrival order.
struct GatedPayment {
    occupant: OrderId,
    gate: Arc<Notify>,
    log: Arc<Mutex<Vec<OrderId>>>,
}

#[async_trait]
impl PaymentGateway for GatedPayment {
    async fn capture(&self, order_id: OrderId) -> Result<(), CoreError> {
        if order_id == self.occupant {
            self.gate.notified().await;
        }
        self.log.lock().await.push(order_id);
        Ok(())
    }
}

/// Scenario 4 (VIP priority): with a single-worker pool saturated by an occupant job, enqueuing a
/// regular job and then a VIP job behind it means the VIP job dispatches first once the worker
/// frees up.
#[tokio::test]
async fn vip_job_preempts_an_earlier_regular_job_once_the_worker_frees_up() {
    let stock_store = Arc::new(InMemoryStockStore::new());
    let order_store = Arc::new(InMemoryOrderStore::new());
    let queue = Arc::new(PriorityJobQueue::new(&queue_config()));
    let product_id = ProductId::new();
    let stock_id = stock_store.create(product_id, 100).await;

    let intake = OrderIntake::new(stock_store.clone(), order_store.clone(), queue.clone());

    let occupant = intake
        .submit(user(1, false), product_id, stock_id, 1, Decimal::new(100, 2))
        .await
        .unwrap();

    let gate = Arc::new(Notify::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let payment = Arc::new(GatedPayment {
        occupant: occupant.id,
        gate: gate.clone(),
        log: log.clone(),
    });
    let handler = Arc::new(OrderHandler::new(
        stock_store.clone(),
        order_store.clone(),
        payment as Arc<dyn PaymentGateway>,
    ));
    let cancel = CancellationToken::new();
    let handles = worker::spawn_pool(1, queue.clone(), handler, Duration::from_secs(5), cancel.clone());

    // Give the single worker time to dispatch the occupant and block inside `capture`.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let regular = intake
        .submit(user(2, false), product_id, stock_id, 1, Decimal::new(100, 2))
        .await
        .unwrap();
    let vip = intake
        .submit(user(3, true), product_id, stock_id, 1, Decimal::new(100, 2))
        .await
        .unwrap();

    gate.notify_one();

    assert_eq!(wait_for_terminal(&order_store, regular.id).await, OrderStatus::Confirmed);
    assert_eq!(wait_for_terminal(&order_store, vip.id).await, OrderStatus::Confirmed);

    let order = log.lock().await.clone();
    assert_eq!(order[0], occupant.id);
    assert_eq!(order[1], vip.id, "VIP job should dispatch before the earlier regular job");
    assert_eq!(order[2], regular.id);

    cancel.cancel();
    for h in handles {
        let _ = h.await;
    }
}

/// Scenario 5 (transient retry then success): payment fails on the first attempt only; the order
/// still reaches CONFIRMED, and the final stock decrement reflects exactly one successful
/// reservation (the first reservation was released by compensation between attempts).
#[tokio::test]
async fn transient_failure_then_success_confirms_with_a_single_net_reservation() {
    struct FlakyOnce {
        failed_once: std::sync::atomic::AtomicBool,
    }
    #[async_trait]
    impl PaymentGateway for FlakyOnce {
        async fn capture(&self, _order_id: OrderId) -> Result<(), CoreError> {
            if !self.failed_once.swap(true, std::sync::atomic::Ordering::SeqCst) {
                Err(CoreError::PaymentTimeout)
            } else {
                Ok(())
            }
        }
    }

    let stock_store = Arc::new(InMemoryStockStore::new());
    let order_store = Arc::new(InMemoryOrderStore::new());
    let queue = Arc::new(PriorityJobQueue::new(&queue_config()));
    let product_id = ProductId::new();
    let stock_id = stock_store.create(product_id, 100).await;

    let intake = OrderIntake::new(stock_store.clone(), order_store.clone(), queue.clone());
    let order = intake
        .submit(user(1, false), product_id, stock_id, 3, Decimal::new(100, 2))
        .await
        .unwrap();

    let payment = Arc::new(FlakyOnce {
        failed_once: std::sync::atomic::AtomicBool::new(false),
    });
    let handler = Arc::new(OrderHandler::new(
        stock_store.clone(),
        order_store.clone(),
        payment as Arc<dyn PaymentGateway>,
    ));
    let cancel = CancellationToken::new();
    let handles = worker::spawn_pool(1, queue.clone(), handler, Duration::from_secs(5), cancel.clone());

    assert_eq!(wait_for_terminal(&order_store, order.id).await, OrderStatus::Confirmed);
    let snap = stock_store.read_stock(stock_id).await.unwrap();
    assert_eq!(snap.quantity, 97);

    cancel.cancel();
    for h in handles {
        let _ = h.await;
    }
}

/// Scenario 6 (exhausted retries): payment always fails; after the configured attempt budget the
/// order lands in FAILED with the payment-timeout reason and stock is back to its pre-submission
/// level (the final compensation released it).
#[tokio::test]
async fn permanently_failing_payment_exhausts_retries_and_restores_stock() {
    struct AlwaysTimeout;
    #[async_trait]
    impl PaymentGateway for AlwaysTimeout {
        async fn capture(&self, _order_id: OrderId) -> Result<(), CoreError> {
            Err(CoreError::PaymentTimeout)
        }
    }

    let stock_store = Arc::new(InMemoryStockStore::new());
    let order_store = Arc::new(InMemoryOrderStore::new());
    let mut config = queue_config();
    config.backoff_base = Duration::from_millis(5);
    config.max_attempts = 3;
    // Exhausted retries only reach FAILED through the DLQ observer's `on_failed` hook; without it
    // wired in, this test's own assertion below could never be satisfied.
    let subscribers: Vec<Arc<dyn QueueSubscriber>> =
        vec![Arc::new(DlqObserver::new(order_store.clone()))];
    let queue = Arc::new(PriorityJobQueue::new(&config).with_subscribers(subscribers));
    let product_id = ProductId::new();
    let stock_id = stock_store.create(product_id, 50).await;

    let intake = OrderIntake::new(stock_store.clone(), order_store.clone(), queue.clone());
    let order = intake
        .submit(user(1, false), product_id, stock_id, 4, Decimal::new(100, 2))
        .await
        .unwrap();

    let handler = Arc::new(OrderHandler::new(
        stock_store.clone(),
        order_store.clone(),
        Arc::new(AlwaysTimeout) as Arc<dyn PaymentGateway>,
    ));
    let cancel = CancellationToken::new();
    let handles = worker::spawn_pool(1, queue.clone(), handler, Duration::from_secs(5), cancel.clone());
    let scheduler = tokio::spawn({
        let queue = queue.clone();
        let cancel = cancel.clone();
        async move { queue.run_delay_scheduler(Duration::from_millis(5), cancel).await }
    });

    let status = wait_for_terminal(&order_store, order.id).await;
    assert_eq!(status, OrderStatus::Failed);
    let order = order_store.get_order(order.id).await.unwrap();
    assert!(order.failure_reason.unwrap().contains("payment gateway timeout"));

    let snap = stock_store.read_stock(stock_id).await.unwrap();
    assert_eq!(snap.quantity, 50);

    cancel.cancel();
    scheduler.abort();
    for h in handles {
        let _ = h.await;
    }
}
