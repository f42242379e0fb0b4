//! Plugin Settings Models

use serde::{Deserialize, Serialize};

/// Minimum value the abandoned cart cutoff can be set to, in minutes.
pub const ABANDONED_CART_MIN_CUTOFF_MINUTES: i64 = 10;

/// Default cart cutoff in minutes.
pub const ABANDONED_CART_DEFAULT_CUTOFF_MINUTES: i64 = 30;

/// Product field kinds the reminder payload grid carries, in payload order.
pub const PRODUCT_FIELDS: [&str; 7] = [
    "product_base_price",
    "product_description",
    "product_image_url",
    "product_name",
    "product_price",
    "product_quantity",
    "product_sku",
];

/// Number of line-item slots in the reminder payload grid. Items past
/// the last slot are summarized with an overflow flag instead.
pub const PRODUCT_FIELD_SLOTS: usize = 10;

/// Smaily API credentials in plaintext form. The options repository
/// stores the password encrypted; this struct only exists in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiCredentials {
    /// Account-specific host prefix, e.g. `demo` for demo.sendsmaily.net
    pub subdomain: String,
    pub username: String,
    pub password: String,
}

impl ApiCredentials {
    pub fn new(subdomain: &str, username: &str, password: &str) -> Self {
        Self {
            subdomain: subdomain.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// All three parts present?
    pub fn is_complete(&self) -> bool {
        !self.subdomain.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Abandoned cart feature state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AbandonedCartStatus {
    /// Whether abandoned cart tracking and reminders run
    pub enabled: bool,
    /// Remote automation workflow triggered for reminders
    pub autoresponder_id: u64,
}

/// Field selection for subscriber synchronization payloads.
/// Store URL, email and language are always synchronized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberSyncFields {
    pub store_url: bool,
    pub user_email: bool,
    pub language: bool,
    pub customer_group: bool,
    pub customer_id: bool,
    pub first_name: bool,
    pub first_registered: bool,
    pub last_name: bool,
    pub nickname: bool,
    pub site_title: bool,
    pub user_dob: bool,
    pub user_gender: bool,
    pub user_phone: bool,
}

impl Default for SubscriberSyncFields {
    fn default() -> Self {
        Self {
            store_url: true,
            user_email: true,
            language: true,
            customer_group: false,
            customer_id: false,
            first_name: false,
            first_registered: false,
            last_name: false,
            nickname: false,
            site_title: false,
            user_dob: false,
            user_gender: false,
            user_phone: false,
        }
    }
}

/// Field selection for abandoned cart reminder payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbandonedCartFields {
    pub store_url: bool,
    pub user_email: bool,
    pub language: bool,
    pub first_name: bool,
    pub last_name: bool,
    pub product_base_price: bool,
    pub product_description: bool,
    pub product_image_url: bool,
    pub product_name: bool,
    pub product_price: bool,
    pub product_quantity: bool,
    pub product_sku: bool,
}

impl Default for AbandonedCartFields {
    fn default() -> Self {
        Self {
            store_url: true,
            user_email: true,
            language: true,
            first_name: false,
            last_name: false,
            product_base_price: false,
            product_description: false,
            product_image_url: false,
            product_name: false,
            product_price: false,
            product_quantity: false,
            product_sku: false,
        }
    }
}

impl AbandonedCartFields {
    /// Enabled product field kinds, in [`PRODUCT_FIELDS`] order.
    pub fn enabled_product_fields(&self) -> Vec<&'static str> {
        let flags = [
            self.product_base_price,
            self.product_description,
            self.product_image_url,
            self.product_name,
            self.product_price,
            self.product_quantity,
            self.product_sku,
        ];

        PRODUCT_FIELDS
            .iter()
            .zip(flags)
            .filter(|(_, enabled)| *enabled)
            .map(|(field, _)| *field)
            .collect()
    }

    /// Any product detail field enabled at all?
    pub fn has_product_fields(&self) -> bool {
        !self.enabled_product_fields().is_empty()
    }
}

/// Site identity used when building payloads outside a request context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Store URL
    pub url: String,
    /// Site title
    pub title: String,
    /// Site default two-letter language code
    pub language: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost".to_string(),
            title: "RustPress".to_string(),
            language: "en".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn new(url: &str, title: &str, language: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            language: language.to_string(),
        }
    }
}
