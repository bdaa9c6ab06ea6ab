//! Durable mirror of the Stock Store. Every successful in-process mutation is written here so
//! state survives a restart; on startup the in-process store is rehydrated from this repository.
//!
//! Grounded on `account/repository.rs`'s plain `PgPool`-taking repository structs and
//! `account/db.rs`'s connection-pool wrapper, generalized from read-mostly asset/symbol lookups
//! to the CAS-shaped `UPDATE ... WHERE version = $v` this store actually needs.

use sqlx::PgPool;
use uuid::Uuid;

use rust_decimal::Decimal;

use crate::core_types::{ProductId, StockId};
use crate::error::CoreError;

use super::models::{Product, StockRow};

pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn load_all(&self) -> Result<Vec<StockRow>, CoreError> {
        let rows = sqlx::query_as::<_, StockRowSql>(
            "SELECT id, product_id, quantity, version, updated_at FROM stocks",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Mirrors a stock row the in-process store already created under `id` — the repository must
    /// never mint its own id here, or the durable row would diverge from the one every in-memory
    /// reference (including any order's `stock_id`) actually points at.
    pub async fn insert(&self, id: StockId, product_id: ProductId, quantity: u32) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO stocks (id, product_id, quantity, version, updated_at) \
             VALUES ($1, $2, $3, 0, NOW())",
        )
        .bind(id.0)
        .bind(product_id.0)
        .bind(quantity as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mirror a CAS result the in-process store already committed. This is a best-effort
    /// durability write, not itself the source of truth while the process is alive — the
    /// in-process `InMemoryStockStore` is.
    pub async fn mirror_mutation(
        &self,
        id: StockId,
        quantity: u32,
        version: u64,
    ) -> Result<(), CoreError> {
        sqlx::query(
            "UPDATE stocks SET quantity = $1, version = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(quantity as i64)
        .bind(version as i64)
        .bind(id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_all_products(&self) -> Result<Vec<Product>, CoreError> {
        let rows = sqlx::query_as::<_, ProductRowSql>(
            "SELECT id, name, description, unit_price FROM products",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn insert_product(&self, product: &Product) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO products (id, name, description, unit_price) VALUES ($1, $2, $3, $4)",
        )
        .bind(product.id.0)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.unit_price)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ProductRowSql {
    id: Uuid,
    name: String,
    description: Option<String>,
    unit_price: Decimal,
}

impl From<ProductRowSql> for Product {
    fn from(row: ProductRowSql) -> Self {
        Product {
            id: ProductId(row.id),
            name: row.name,
            description: row.description,
            unit_price: row.unit_price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StockRowSql {
    id: Uuid,
    product_id: Uuid,
    quantity: i64,
    version: i64,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<StockRowSql> for StockRow {
    fn from(row: StockRowSql) -> Self {
        StockRow {
            id: StockId(row.id),
            product_id: ProductId(row.product_id),
            quantity: row.quantity as u32,
            version: row.version as u64,
            updated_at: row.updated_at,
        }
    }
}
