//! Connection pool management and schema bootstrap for the durability mirror.
//!
//! Consolidates the teacher's two near-duplicate `Database` wrappers (`db/mod.rs` and
//! `account/db.rs`) into one, since this crate only ever needs a single pool shared across the
//! stock/order/job repositories and the auth service. The TDengine-backed market-data
//! persistence this module used to hold (`klines`, `trades`, `tdengine`, ...) has no counterpart
//! here and was not carried forward.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::error::CoreError;

pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        let max_connections = std::env::var("PG_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("postgres connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    pub async fn health_check(&self) -> Result<(), CoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Creates the schema if it does not already exist. Idempotent, safe to call on every
    /// startup instead of relying on an external migration step.
    pub async fn ensure_schema(&self) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_vip BOOLEAN NOT NULL DEFAULT false,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                unit_price NUMERIC NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stocks (
                id UUID PRIMARY KEY,
                product_id UUID NOT NULL REFERENCES products(id),
                quantity BIGINT NOT NULL,
                version BIGINT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id UUID PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id),
                product_id UUID NOT NULL REFERENCES products(id),
                stock_id UUID NOT NULL REFERENCES stocks(id),
                quantity BIGINT NOT NULL,
                price_at_purchase NUMERIC NOT NULL,
                status TEXT NOT NULL,
                is_vip BOOLEAN NOT NULL,
                failure_reason TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id UUID PRIMARY KEY,
                order_id UUID NOT NULL REFERENCES orders(id),
                priority SMALLINT NOT NULL,
                state TEXT NOT NULL,
                attempts INT NOT NULL,
                max_attempts INT NOT NULL,
                last_error TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                next_run_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
