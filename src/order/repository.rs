//! Durable mirror of the Order Store, adapted from `persistence/orders.rs`'s
//! insert-then-status-update shape (there, TDengine rows-per-event; here, a single Postgres row
//! per order plus an UPDATE on every transition).

use sqlx::PgPool;
use uuid::Uuid;

use crate::core_types::{OrderId, ProductId, StockId, UserId};
use crate::error::CoreError;

use super::models::{Order, OrderStatus};

pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn load_all(&self) -> Result<Vec<Order>, CoreError> {
        let rows = sqlx::query_as::<_, OrderRowSql>(
            "SELECT id, user_id, product_id, stock_id, quantity, price_at_purchase, status, \
                    is_vip, failure_reason, created_at, updated_at \
             FROM orders",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn insert_pending(&self, order: &Order) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO orders \
                (id, user_id, product_id, stock_id, quantity, price_at_purchase, status, \
                 is_vip, failure_reason, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'PENDING', $7, NULL, $8, $8)",
        )
        .bind(order.id.0)
        .bind(order.user_id.0)
        .bind(order.product_id.0)
        .bind(order.stock_id.0)
        .bind(order.quantity as i64)
        .bind(order.price_at_purchase)
        .bind(order.is_vip)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mirror a terminal transition the in-process store already applied. Guarded the same way
    /// on this side: only rows still `PENDING` are updated, so a late-arriving duplicate mirror
    /// write is a no-op rather than clobbering a terminal row.
    pub async fn mirror_terminal(
        &self,
        id: OrderId,
        status: OrderStatus,
        failure_reason: Option<&str>,
    ) -> Result<(), CoreError> {
        let status_str = match status {
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Pending => return Ok(()),
        };
        sqlx::query(
            "UPDATE orders SET status = $1, failure_reason = $2, updated_at = NOW() \
             WHERE id = $3 AND status = 'PENDING'",
        )
        .bind(status_str)
        .bind(failure_reason)
        .bind(id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct OrderRowSql {
    id: Uuid,
    user_id: i64,
    product_id: Uuid,
    stock_id: Uuid,
    quantity: i64,
    price_at_purchase: rust_decimal::Decimal,
    status: String,
    is_vip: bool,
    failure_reason: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<OrderRowSql> for Order {
    fn from(row: OrderRowSql) -> Self {
        let status = match row.status.as_str() {
            "CONFIRMED" => OrderStatus::Confirmed,
            "FAILED" => OrderStatus::Failed,
            _ => OrderStatus::Pending,
        };
        Order {
            id: OrderId(row.id),
            user_id: UserId(row.user_id),
            product_id: ProductId(row.product_id),
            stock_id: StockId(row.stock_id),
            quantity: row.quantity as u32,
            price_at_purchase: row.price_at_purchase,
            status,
            is_vip: row.is_vip,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
