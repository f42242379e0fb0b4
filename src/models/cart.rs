//! Abandoned Cart Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host platform customer id. One cart record per customer.
pub type CustomerId = u64;

/// Current version of the cart content record format.
pub const CART_CONTENT_VERSION: u32 = 1;

/// Cart lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    /// Customer is still shopping
    #[default]
    Open,
    /// Cart aged past the cutoff without changes
    Abandoned,
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// One line item in a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Catalog product id
    pub product_id: u64,
    /// Quantity of the product in the cart
    pub quantity: u32,
}

impl CartItem {
    pub fn new(product_id: u64, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Versioned cart contents. Replaces the opaque serialized blob the
/// legacy storage used, so old rows can be migrated by version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartContent {
    /// Record format version
    pub version: u32,
    /// Line items
    pub items: Vec<CartItem>,
}

impl CartContent {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self {
            version: CART_CONTENT_VERSION,
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Persisted abandoned-cart row, one per customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartRecord {
    /// Owning customer (primary key)
    pub customer_id: CustomerId,
    /// Last time cart contents changed
    pub cart_updated: DateTime<Utc>,
    /// Cart contents
    pub cart_content: CartContent,
    /// Current status
    pub cart_status: CartStatus,
    /// When the record transitioned to abandoned
    pub cart_abandoned_time: Option<DateTime<Utc>>,
    /// Whether a reminder was dispatched
    pub mail_sent: Option<bool>,
    /// When the reminder was dispatched
    pub mail_sent_time: Option<DateTime<Utc>>,
}

impl CartRecord {
    pub fn new(customer_id: CustomerId, items: Vec<CartItem>) -> Self {
        Self {
            customer_id,
            cart_updated: Utc::now(),
            cart_content: CartContent::new(items),
            cart_status: CartStatus::Open,
            cart_abandoned_time: None,
            mail_sent: None,
            mail_sent_time: None,
        }
    }

    /// Apply a cart-content change. Refreshes contents and the update
    /// timestamp; the status is left as is, an abandoned cart never
    /// transitions back to open.
    pub fn touch(&mut self, items: Vec<CartItem>) {
        self.cart_content = CartContent::new(items);
        self.cart_updated = Utc::now();
    }

    /// Transition the record to abandoned, stamping the sweep time.
    pub fn mark_abandoned(&mut self, at: DateTime<Utc>) {
        if self.cart_status == CartStatus::Open {
            self.cart_status = CartStatus::Abandoned;
            self.cart_abandoned_time = Some(at);
        }
    }

    /// Latch the reminder flag. A record with `mail_sent` set is never
    /// sent another reminder.
    pub fn mark_mail_sent(&mut self, at: DateTime<Utc>) {
        self.mail_sent = Some(true);
        self.mail_sent_time = Some(at);
    }

    /// Abandoned and still waiting for its reminder?
    pub fn is_reminder_pending(&self) -> bool {
        self.cart_status == CartStatus::Abandoned && self.mail_sent.is_none()
    }
}
