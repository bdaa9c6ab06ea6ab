//! Product catalog (§4.8): plain last-write-wins metadata, kept separate from the CAS-guarded
//! `quantity`/`version` fields a [`super::store::StockStore`] owns. Admin CRUD writes here never
//! go through the reservation path.

use dashmap::DashMap;

use crate::core_types::ProductId;
use crate::error::CoreError;

use super::models::Product;

pub struct ProductCatalog {
    products: DashMap<ProductId, Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self {
            products: DashMap::new(),
        }
    }

    pub fn from_rows(rows: Vec<Product>) -> Self {
        let map = DashMap::new();
        for p in rows {
            map.insert(p.id, p);
        }
        Self { products: map }
    }

    pub fn insert(&self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn get(&self, id: ProductId) -> Result<Product, CoreError> {
        self.products
            .get(&id)
            .map(|p| p.clone())
            .ok_or_else(|| CoreError::Validation(format!("product {id} not found")))
    }

    pub fn list(&self) -> Vec<Product> {
        self.products.iter().map(|p| p.clone()).collect()
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new()
    }
}
