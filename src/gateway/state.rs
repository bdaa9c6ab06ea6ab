//! Shared state handed to every axum handler, generalized from the teacher's
//! `Arc<ArrayQueue<OrderAction>>`-plus-optional-Postgres shape down to what this surface
//! actually needs: the three stores C4/C5 share, plus the ambient auth service and config.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::order::{InMemoryOrderStore, OrderRepository};
use crate::persistence::Database;
use crate::queue::PriorityJobQueue;
use crate::stock::{InMemoryStockStore, ProductCatalog, StockRepository};
use crate::user_auth::UserAuthService;

#[derive(Clone)]
pub struct AppState {
    pub stock_store: Arc<InMemoryStockStore>,
    pub order_store: Arc<InMemoryOrderStore>,
    pub product_catalog: Arc<ProductCatalog>,
    pub queue: Arc<PriorityJobQueue>,
    pub config: Arc<AppConfig>,
    /// `None` when no `DATABASE_URL` backing store could be reached at startup; the hot path
    /// keeps serving out of the in-process stores regardless, matching the spec's stance that
    /// the in-process store is the source of truth while the process is alive.
    pub pg_db: Option<Arc<Database>>,
    pub stock_repo: Option<Arc<StockRepository>>,
    pub order_repo: Option<Arc<OrderRepository>>,
    pub user_auth: Option<Arc<UserAuthService>>,
}
