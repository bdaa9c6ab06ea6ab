use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{ProductId, StockId};

/// Catalog product. Immutable with respect to order flow — catalog edits are a separate,
/// last-write-wins concern handled by the admin CRUD surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
}

/// A stock record: the thing the order-processing core does optimistic-concurrency mutation on.
///
/// `version` increases by exactly 1 per successful `reserve`/`release`. `(id, version)`
/// uniquely identifies a snapshot in time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub id: StockId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRow {
    pub id: StockId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}
