//! Cart Table Service
//!
//! Durable record of "does this logged-in customer currently have a
//! non-empty cart, and since when". Writes are per customer id; the
//! calling hook context discards results, so failures are best effort.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::models::{CartItem, CartRecord, CartStatus, CustomerId};

/// Window within which a duplicate cart-updated trigger (same customer,
/// same contents) is suppressed. Multiple page-load hooks can fire in
/// the same request cycle.
const UPSERT_DEBOUNCE_SECS: i64 = 1;

/// Result of a cart upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartUpdate {
    /// First non-empty change created a record
    Inserted,
    /// Contents and timestamp refreshed
    Updated,
    /// Cart emptied, record removed
    Deleted,
    /// Duplicate trigger inside the idempotency window
    Suppressed,
    /// Empty cart with no existing record
    Ignored,
}

/// Cart table service
pub struct CartService {
    records: Arc<RwLock<HashMap<CustomerId, CartRecord>>>,
}

impl CartService {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Apply a cart-content change for a customer.
    ///
    /// No record and a non-empty cart inserts an open record; an
    /// existing record and a non-empty cart refreshes contents and
    /// `cart_updated`; an existing record and an empty cart deletes the
    /// record. Duplicate triggers within the idempotency window are
    /// suppressed; emptying is never suppressed.
    pub async fn upsert_cart(&self, customer_id: CustomerId, items: Vec<CartItem>) -> CartUpdate {
        let mut records = self.records.write().await;

        match records.get_mut(&customer_id) {
            None => {
                if items.is_empty() {
                    return CartUpdate::Ignored;
                }
                records.insert(customer_id, CartRecord::new(customer_id, items));
                CartUpdate::Inserted
            }
            Some(record) => {
                if items.is_empty() {
                    records.remove(&customer_id);
                    return CartUpdate::Deleted;
                }

                let window = Duration::seconds(UPSERT_DEBOUNCE_SECS);
                if record.cart_content.items == items && Utc::now() - record.cart_updated <= window
                {
                    return CartUpdate::Suppressed;
                }

                record.touch(items);
                CartUpdate::Updated
            }
        }
    }

    /// Remove a customer's record after checkout. No-op when absent.
    pub async fn delete_cart(&self, customer_id: CustomerId) -> bool {
        let mut records = self.records.write().await;
        records.remove(&customer_id).is_some()
    }

    pub async fn get(&self, customer_id: CustomerId) -> Option<CartRecord> {
        let records = self.records.read().await;
        records.get(&customer_id).cloned()
    }

    /// Reload a persisted row, e.g. when activating with existing data.
    pub async fn restore(&self, record: CartRecord) {
        let mut records = self.records.write().await;
        records.insert(record.customer_id, record);
    }

    /// Flip every open cart last updated before `limit` to abandoned,
    /// stamping `cart_abandoned_time` with `now`. Returns the number of
    /// records flipped.
    pub async fn abandon_older_than(&self, limit: DateTime<Utc>, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().await;
        let mut flipped = 0;

        for record in records.values_mut() {
            if record.cart_status == CartStatus::Open
                && record.mail_sent.is_none()
                && record.cart_updated < limit
            {
                record.mark_abandoned(now);
                flipped += 1;
            }
        }

        flipped
    }

    /// Abandoned carts still waiting for their reminder.
    pub async fn pending_reminders(&self) -> Vec<CartRecord> {
        let records = self.records.read().await;
        records
            .values()
            .filter(|record| record.is_reminder_pending())
            .cloned()
            .collect()
    }

    /// Latch the reminder flag for a customer's record.
    pub async fn mark_mail_sent(&self, customer_id: CustomerId, at: DateTime<Utc>) -> bool {
        let mut records = self.records.write().await;
        match records.get_mut(&customer_id) {
            Some(record) => {
                record.mark_mail_sent(at);
                true
            }
            None => false,
        }
    }

    /// Number of tracked carts.
    pub async fn len(&self) -> usize {
        let records = self.records.read().await;
        records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for CartService {
    fn default() -> Self {
        Self::new()
    }
}
