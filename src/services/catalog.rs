//! Product Catalog Service
//!
//! In-memory stand-in for the host store's product storage; the
//! reminder sweep resolves cart line items against it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::Product;

/// Product store
pub struct CatalogService {
    products: Arc<RwLock<HashMap<u64, Product>>>,
}

impl CatalogService {
    pub fn new() -> Self {
        Self {
            products: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn upsert(&self, product: Product) {
        let mut products = self.products.write().await;
        products.insert(product.id, product);
    }

    pub async fn get(&self, id: u64) -> Option<Product> {
        let products = self.products.read().await;
        products.get(&id).cloned()
    }

    pub async fn remove(&self, id: u64) -> bool {
        let mut products = self.products.write().await;
        products.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        let products = self.products.read().await;
        products.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for CatalogService {
    fn default() -> Self {
        Self::new()
    }
}
