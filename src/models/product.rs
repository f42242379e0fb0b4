//! Catalog Product Models

use serde::{Deserialize, Serialize};

/// A catalog product as the reminder payload needs it. Prices are the
/// host store's display strings (tax and currency formatting are the
/// store's concern, not the plugin's).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Catalog product id
    pub id: u64,
    pub name: String,
    pub description: String,
    pub sku: String,
    /// Current sale display price
    pub price: String,
    /// Regular display price
    pub base_price: String,
    /// Featured image URL, when the product has one
    pub image_url: Option<String>,
}

impl Product {
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: String::new(),
            sku: String::new(),
            price: String::new(),
            base_price: String::new(),
            image_url: None,
        }
    }

    pub fn with_sku(mut self, sku: &str) -> Self {
        self.sku = sku.to_string();
        self
    }

    pub fn with_prices(mut self, price: &str, base_price: &str) -> Self {
        self.price = price.to_string();
        self.base_price = base_price.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_image_url(mut self, url: &str) -> Self {
        self.image_url = Some(url.to_string());
        self
    }
}
