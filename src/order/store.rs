//! Order Store (C2): sticky-terminal status transitions.
//!
//! Grounded on the "terminal is sticky" contract from the spec and on the audit-trail shape of
//! `persistence/orders.rs::insert_order_event` (prev_status / new_status recorded on every
//! transition), adapted from TDengine row-per-event logging to an in-process guard plus a
//! Postgres mirror.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::core_types::{OrderId, UserId};
use crate::error::CoreError;

use super::models::{Order, OrderSpec, OrderStatus};
use super::repository::OrderRepository;

/// Outcome of a terminal-status write, distinguishing "this settled it" from "it was already
/// settled" (a no-op, observable for diagnostics) from "no such order".
#[derive(Debug, PartialEq, Eq)]
pub enum TerminalWrite {
    Applied,
    AlreadyTerminal,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_pending(&self, spec: OrderSpec) -> Order;
    async fn mark_confirmed(&self, id: OrderId) -> Result<TerminalWrite, CoreError>;
    async fn mark_failed(&self, id: OrderId, reason: String) -> Result<TerminalWrite, CoreError>;
    async fn get_order(&self, id: OrderId) -> Result<Order, CoreError>;
    async fn list_orders_by_user(&self, user_id: UserId) -> Vec<Order>;
}

pub struct InMemoryOrderStore {
    orders: DashMap<OrderId, Order>,
    /// Mirrors every creation and terminal transition for restart durability. Best-effort, same
    /// policy as [`crate::stock::InMemoryStockStore`]'s repo field.
    repo: Option<Arc<OrderRepository>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            repo: None,
        }
    }

    pub fn from_rows(rows: Vec<Order>) -> Self {
        let map = DashMap::new();
        for order in rows {
            map.insert(order.id, order);
        }
        Self { orders: map, repo: None }
    }

    pub fn with_repository(mut self, repo: Arc<OrderRepository>) -> Self {
        self.repo = Some(repo);
        self
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_pending(&self, spec: OrderSpec) -> Order {
        let id = OrderId::new();
        let order = Order::new_pending(id, spec);
        self.orders.insert(id, order.clone());
        if let Some(repo) = self.repo.as_ref() {
            if let Err(e) = repo.insert_pending(&order).await {
                tracing::warn!(order_id = %id, error = %e, "failed to mirror new pending order");
            }
        }
        order
    }

    async fn mark_confirmed(&self, id: OrderId) -> Result<TerminalWrite, CoreError> {
        let applied = {
            let mut entry = self.orders.get_mut(&id).ok_or(CoreError::OrderNotFound(id))?;
            if entry.status.is_terminal() {
                return Ok(TerminalWrite::AlreadyTerminal);
            }
            entry.status = OrderStatus::Confirmed;
            entry.updated_at = Utc::now();
            TerminalWrite::Applied
        };
        if let Some(repo) = self.repo.as_ref() {
            if let Err(e) = repo.mirror_terminal(id, OrderStatus::Confirmed, None).await {
                tracing::warn!(order_id = %id, error = %e, "failed to mirror confirmed order");
            }
        }
        Ok(applied)
    }

    async fn mark_failed(&self, id: OrderId, reason: String) -> Result<TerminalWrite, CoreError> {
        let applied = {
            let mut entry = self.orders.get_mut(&id).ok_or(CoreError::OrderNotFound(id))?;
            if entry.status.is_terminal() {
                return Ok(TerminalWrite::AlreadyTerminal);
            }
            entry.status = OrderStatus::Failed;
            entry.failure_reason = Some(reason.clone());
            entry.updated_at = Utc::now();
            TerminalWrite::Applied
        };
        if let Some(repo) = self.repo.as_ref() {
            if let Err(e) = repo
                .mirror_terminal(id, OrderStatus::Failed, Some(reason.as_str()))
                .await
            {
                tracing::warn!(order_id = %id, error = %e, "failed to mirror failed order");
            }
        }
        Ok(applied)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, CoreError> {
        self.orders
            .get(&id)
            .map(|o| o.clone())
            .ok_or(CoreError::OrderNotFound(id))
    }

    async fn list_orders_by_user(&self, user_id: UserId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{ProductId, StockId};
    use rust_decimal::Decimal;

    fn spec(user: i64) -> OrderSpec {
        OrderSpec {
            user_id: UserId(user),
            stock_id: StockId::new(),
            product_id: ProductId::new(),
            quantity: 2,
            price_at_purchase: Decimal::new(999, 2),
            is_vip: false,
        }
    }

    #[tokio::test]
    async fn terminal_status_is_sticky() {
        let store = InMemoryOrderStore::new();
        let order = store.create_pending(spec(1)).await;

        assert_eq!(
            store.mark_confirmed(order.id).await.unwrap(),
            TerminalWrite::Applied
        );
        // Second terminal write is a no-op, not an overwrite.
        assert_eq!(
            store.mark_failed(order.id, "too late".into()).await.unwrap(),
            TerminalWrite::AlreadyTerminal
        );
        let fetched = store.get_order(order.id).await.unwrap();
        assert_eq!(fetched.status, OrderStatus::Confirmed);
        assert!(fetched.failure_reason.is_none());
    }

    #[tokio::test]
    async fn list_orders_by_user_sorted_newest_first() {
        let store = InMemoryOrderStore::new();
        let a = store.create_pending(spec(7)).await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let b = store.create_pending(spec(7)).await;

        let listed = store.list_orders_by_user(UserId(7)).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].id, a.id);
    }

    #[tokio::test]
    async fn distinct_submissions_produce_distinct_orders() {
        let store = InMemoryOrderStore::new();
        let a = store.create_pending(spec(3)).await;
        let b = store.create_pending(spec(3)).await;
        assert_ne!(a.id, b.id);
    }
}
