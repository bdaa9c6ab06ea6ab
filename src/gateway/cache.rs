//! TTL-based cache for the catalog-browsing endpoint (§4.8).
//!
//! Uses the `cached` crate for automatic TTL expiration, the same way the teacher cached its
//! config (Assets/Symbols) lookups: admin edits to product/stock metadata become visible within
//! `TTL_SECONDS` without a restart, while the hot order-submission path never goes through this
//! cache at all (it reads `StockStore`/`ProductCatalog` directly, uncached).

use std::sync::Arc;

use cached::proc_macro::cached;

use crate::stock::{InMemoryStockStore, ProductCatalog, StockStore};

use super::types::ProductWithStockResponse;

pub const TTL_SECONDS: u64 = 5;

/// Joins the product catalog with a fresh stock read per product, cached briefly so a burst of
/// browsing traffic does not hammer the in-process stores.
#[cached(
    time = 5,
    key = "String",
    convert = r#"{ "products_with_stock".to_string() }"#,
    result = true,
    sync_writes = true
)]
pub async fn load_products_with_stock_cached(
    catalog: Arc<ProductCatalog>,
    stock_store: Arc<InMemoryStockStore>,
) -> Result<Vec<ProductWithStockResponse>, String> {
    tracing::debug!("[cache] loading products-with-stock");
    let mut out = Vec::new();
    for product in catalog.list() {
        let Some(stock) = stock_store.find_by_product(product.id).await else {
            continue;
        };
        out.push(ProductWithStockResponse {
            product_id: product.id,
            stock_id: stock.id,
            name: product.name,
            description: product.description,
            unit_price: product.unit_price,
            quantity: stock.quantity,
            version: stock.version,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_constant() {
        assert_eq!(TTL_SECONDS, 5);
    }
}
