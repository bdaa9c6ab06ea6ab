//! Stock Store (C1): atomic, versioned reservation with bounded retry on lost CAS races.
//!
//! Mirrors the discipline `balance.rs::Balance` uses for funds — private fields, every mutation
//! checked, a version counter bumped on every successful mutation — but exposes it as an
//! explicit compare-and-swap so the "read snapshot, then conditionally write" shape matches what
//! the Postgres-backed repository does with `UPDATE ... WHERE id = $1 AND version = $2`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::core_types::{ProductId, StockId};
use crate::error::CoreError;

use super::models::{StockRow, StockSnapshot};
use super::repository::StockRepository;

/// Outcome of a single compare-and-swap attempt, distinguishing "someone else won the race"
/// (worth retrying) from "this can never succeed" (worth surfacing immediately).
enum CasOutcome {
    Ok(StockSnapshot),
    Insufficient { available: u32 },
    NotFound,
    VersionConflict,
}

const MAX_CAS_RETRIES: u32 = 3;

#[async_trait]
pub trait StockStore: Send + Sync {
    async fn read_stock(&self, id: StockId) -> Result<StockSnapshot, CoreError>;
    async fn reserve(&self, id: StockId, n: u32) -> Result<StockSnapshot, CoreError>;
    async fn release(&self, id: StockId, n: u32) -> Result<StockSnapshot, CoreError>;
    async fn create(&self, product_id: ProductId, quantity: u32) -> StockId;
}

/// In-process store backing the hot path. Per-key exclusivity comes from `DashMap`'s sharded
/// locking: the critical section inside `try_cas` is the only place `quantity`/`version` are
/// ever mutated.
pub struct InMemoryStockStore {
    rows: DashMap<StockId, StockRow>,
    /// Mirrors every successful mutation for restart durability. Best-effort: a mirror write
    /// failure is logged, never propagated — this store remains the source of truth while the
    /// process is alive.
    repo: Option<Arc<StockRepository>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            repo: None,
        }
    }

    /// Rehydrate from the durable repository on startup.
    pub fn from_rows(rows: Vec<StockRow>) -> Self {
        let map = DashMap::new();
        for row in rows {
            map.insert(row.id, row);
        }
        Self { rows: map, repo: None }
    }

    pub fn with_repository(mut self, repo: Arc<StockRepository>) -> Self {
        self.repo = Some(repo);
        self
    }

    /// Admin/browsing lookup, not part of the `StockStore` trait since the hot path never
    /// addresses stock by product.
    pub async fn find_by_product(&self, product_id: ProductId) -> Option<StockSnapshot> {
        self.rows
            .iter()
            .find(|row| row.product_id == product_id)
            .map(|row| StockSnapshot {
                id: row.id,
                product_id: row.product_id,
                quantity: row.quantity,
                version: row.version,
            })
    }

    async fn mirror(&self, id: StockId, snap: &StockSnapshot) {
        if let Some(repo) = self.repo.as_ref() {
            if let Err(e) = repo.mirror_mutation(id, snap.quantity, snap.version).await {
                tracing::warn!(stock_id = %id, error = %e, "failed to mirror stock mutation");
            }
        }
    }

    fn try_cas(&self, id: StockId, n: u32, expected_version: u64) -> CasOutcome {
        let Some(mut entry) = self.rows.get_mut(&id) else {
            return CasOutcome::NotFound;
        };
        if entry.version != expected_version {
            return CasOutcome::VersionConflict;
        }
        if entry.quantity < n {
            return CasOutcome::Insufficient {
                available: entry.quantity,
            };
        }
        entry.quantity -= n;
        entry.version += 1;
        entry.updated_at = Utc::now();
        CasOutcome::Ok(StockSnapshot {
            id: entry.id,
            product_id: entry.product_id,
            quantity: entry.quantity,
            version: entry.version,
        })
    }

    fn try_release(&self, id: StockId, n: u32, expected_version: u64) -> CasOutcome {
        let Some(mut entry) = self.rows.get_mut(&id) else {
            return CasOutcome::NotFound;
        };
        if entry.version != expected_version {
            return CasOutcome::VersionConflict;
        }
        entry.quantity += n;
        entry.version += 1;
        entry.updated_at = Utc::now();
        CasOutcome::Ok(StockSnapshot {
            id: entry.id,
            product_id: entry.product_id,
            quantity: entry.quantity,
            version: entry.version,
        })
    }
}

impl Default for InMemoryStockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn read_stock(&self, id: StockId) -> Result<StockSnapshot, CoreError> {
        self.rows
            .get(&id)
            .map(|row| StockSnapshot {
                id: row.id,
                product_id: row.product_id,
                quantity: row.quantity,
                version: row.version,
            })
            .ok_or(CoreError::StockNotFound(id))
    }

    async fn reserve(&self, id: StockId, n: u32) -> Result<StockSnapshot, CoreError> {
        if n == 0 {
            return Err(CoreError::Validation("reserve quantity must be positive".into()));
        }
        for _ in 0..MAX_CAS_RETRIES {
            let current_version = match self.read_stock(id).await {
                Ok(snap) => snap.version,
                Err(e) => return Err(e),
            };
            match self.try_cas(id, n, current_version) {
                CasOutcome::Ok(snap) => {
                    self.mirror(id, &snap).await;
                    return Ok(snap);
                }
                CasOutcome::NotFound => return Err(CoreError::StockNotFound(id)),
                CasOutcome::Insufficient { available } => {
                    return Err(CoreError::Insufficient {
                        requested: n,
                        available,
                    });
                }
                CasOutcome::VersionConflict => continue,
            }
        }
        Err(CoreError::VersionConflict(id))
    }

    async fn release(&self, id: StockId, n: u32) -> Result<StockSnapshot, CoreError> {
        if n == 0 {
            return Err(CoreError::Validation("release quantity must be positive".into()));
        }
        for _ in 0..MAX_CAS_RETRIES {
            let current_version = match self.read_stock(id).await {
                Ok(snap) => snap.version,
                Err(e) => return Err(e),
            };
            match self.try_release(id, n, current_version) {
                CasOutcome::Ok(snap) => {
                    self.mirror(id, &snap).await;
                    return Ok(snap);
                }
                CasOutcome::NotFound => return Err(CoreError::StockNotFound(id)),
                CasOutcome::VersionConflict => continue,
                CasOutcome::Insufficient { .. } => unreachable!("release never checks quantity"),
            }
        }
        Err(CoreError::VersionConflict(id))
    }

    async fn create(&self, product_id: ProductId, quantity: u32) -> StockId {
        let id = StockId::new();
        self.rows.insert(
            id,
            StockRow {
                id,
                product_id,
                quantity,
                version: 0,
                updated_at: Utc::now(),
            },
        );
        if let Some(repo) = self.repo.as_ref() {
            if let Err(e) = repo.insert(id, product_id, quantity).await {
                tracing::warn!(stock_id = %id, error = %e, "failed to mirror new stock row");
            }
        }
        id
    }
}
