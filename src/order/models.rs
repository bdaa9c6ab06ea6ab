use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::{OrderId, ProductId, StockId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Failed)
    }
}

/// A newly-submitted order's validated intent, before a row exists.
#[derive(Debug, Clone)]
pub struct OrderSpec {
    pub user_id: UserId,
    pub stock_id: StockId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_purchase: Decimal,
    pub is_vip: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub stock_id: StockId,
    pub quantity: u32,
    pub price_at_purchase: Decimal,
    pub status: OrderStatus,
    pub is_vip: bool,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new_pending(id: OrderId, spec: OrderSpec) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id: spec.user_id,
            product_id: spec.product_id,
            stock_id: spec.stock_id,
            quantity: spec.quantity,
            price_at_purchase: spec.price_at_purchase,
            status: OrderStatus::Pending,
            is_vip: spec.is_vip,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}
