//! Order processing core — service entry point.
//!
//! Boots the ambient stack (config, logging, Postgres), rehydrates the in-process stores from
//! the durable mirror, starts the worker pool and delay scheduler, and serves the HTTP gateway
//! until shut down.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use order_core::config::AppConfig;
use order_core::dlq::DlqObserver;
use order_core::gateway;
use order_core::gateway::state::AppState;
use order_core::logging;
use order_core::order::{InMemoryOrderStore, OrderRepository};
use order_core::persistence::Database;
use order_core::queue::{PriorityJobQueue, QueueRepository, QueueSubscriber};
use order_core::stock::{InMemoryStockStore, ProductCatalog, StockRepository};
use order_core::user_auth::UserAuthService;
use order_core::worker::{self, NoopPaymentGateway, OrderHandler, PaymentGateway, SimulatedPaymentGateway};

#[tokio::main]
async fn main() {
    let config = Arc::new(AppConfig::from_env());
    let _log_guard = logging::init_logging(&config);

    tracing::info!("order processing core starting up");

    let pg_db = match Database::connect(&config.database_url).await {
        Ok(db) => {
            if let Err(e) = db.ensure_schema().await {
                tracing::error!(error = %e, "failed to ensure schema, continuing without durability");
                None
            } else {
                Some(Arc::new(db))
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "postgres unavailable at startup, running in-memory only");
            None
        }
    };

    let stock_repo = pg_db.as_ref().map(|db| Arc::new(StockRepository::new(db.pool())));
    let order_repo = pg_db.as_ref().map(|db| Arc::new(OrderRepository::new(db.pool())));
    let queue_repo = pg_db.as_ref().map(|db| Arc::new(QueueRepository::new(db.pool())));
    let user_auth = pg_db
        .as_ref()
        .map(|db| Arc::new(UserAuthService::new(db.pool(), config.jwt_secret.clone())));

    let product_catalog = if let Some(repo) = stock_repo.as_ref() {
        match repo.load_all_products().await {
            Ok(rows) => Arc::new(ProductCatalog::from_rows(rows)),
            Err(e) => {
                tracing::error!(error = %e, "failed to load product catalog");
                Arc::new(ProductCatalog::new())
            }
        }
    } else {
        Arc::new(ProductCatalog::new())
    };

    let stock_store = if let Some(repo) = stock_repo.as_ref() {
        let store = match repo.load_all().await {
            Ok(rows) => InMemoryStockStore::from_rows(rows),
            Err(e) => {
                tracing::error!(error = %e, "failed to load stock snapshot");
                InMemoryStockStore::new()
            }
        };
        Arc::new(store.with_repository(repo.clone()))
    } else {
        Arc::new(InMemoryStockStore::new())
    };

    let order_store = if let Some(repo) = order_repo.as_ref() {
        let store = match repo.load_all().await {
            Ok(rows) => InMemoryOrderStore::from_rows(rows),
            Err(e) => {
                tracing::error!(error = %e, "failed to load order history");
                InMemoryOrderStore::new()
            }
        };
        Arc::new(store.with_repository(repo.clone()))
    } else {
        Arc::new(InMemoryOrderStore::new())
    };

    let mut subscribers: Vec<Arc<dyn QueueSubscriber>> =
        vec![Arc::new(DlqObserver::new(order_store.clone()))];
    if let Some(repo) = queue_repo.as_ref() {
        subscribers.push(repo.clone());
    }
    let queue = Arc::new(PriorityJobQueue::new(&config.queue).with_subscribers(subscribers));
    if let Some(repo) = queue_repo.as_ref() {
        match repo.load_pending().await {
            Ok(jobs) => queue.rehydrate(jobs).await,
            Err(e) => tracing::error!(error = %e, "failed to load pending jobs"),
        }
    }

    let payment: Arc<dyn PaymentGateway> = if config.payment.failure_probability > 0.0 {
        Arc::new(SimulatedPaymentGateway::new(config.payment.clone()))
    } else {
        Arc::new(NoopPaymentGateway)
    };
    let handler = Arc::new(OrderHandler::new(
        stock_store.clone(),
        order_store.clone(),
        payment,
    ));

    let shutdown_token = CancellationToken::new();

    let worker_handles = worker::spawn_pool(
        config.worker_pool_size,
        queue.clone(),
        handler,
        config.queue.stall_timeout,
        shutdown_token.clone(),
    );

    let delay_scheduler = tokio::spawn({
        let queue = queue.clone();
        let cancel = shutdown_token.clone();
        async move { queue.run_delay_scheduler(std::time::Duration::from_secs(1), cancel).await }
    });

    let state = Arc::new(AppState {
        stock_store,
        order_store,
        product_catalog,
        queue: queue.clone(),
        config: config.clone(),
        pg_db,
        stock_repo,
        order_repo,
        user_auth,
    });

    let router = gateway::build_router(state);

    let shutdown_signal = {
        let token = shutdown_token.clone();
        async move {
            let ctrl_c = async { tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c") };
            #[cfg(unix)]
            let terminate = async {
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to install SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {},
                _ = terminate => {},
            }
            tracing::info!("shutdown signal received, draining in-flight work");
            token.cancel();
        }
    };

    if let Err(e) = gateway::serve(config.http_port, router, shutdown_signal).await {
        tracing::error!(error = %e, "gateway exited with error");
    }

    tokio::time::timeout(
        config.shutdown_grace,
        futures::future::join_all(worker_handles),
    )
    .await
    .ok();
    delay_scheduler.abort();

    tracing::info!("order processing core shut down");
}
