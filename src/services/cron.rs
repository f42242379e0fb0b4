//! Cart Lifecycle Jobs
//!
//! The two scheduler-driven sweeps over the cart table: aging open
//! carts into abandoned status, and dispatching reminder triggers for
//! abandoned carts through the Smaily API. Failures are logged and
//! never propagate; the next scheduled run is the only retry.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::models::{CartContent, CartRecord, StoreUser, PRODUCT_FIELDS, PRODUCT_FIELD_SLOTS};
use crate::services::client::{AddressPayload, SmailyApi};
use crate::services::{CartService, CatalogService, OptionsService, UserService};

/// Outcome of one reminder sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderSweepReport {
    /// Reminders dispatched and latched
    pub sent: usize,
    /// Requests that failed and will be retried next sweep
    pub failed: usize,
    /// Records skipped (owner missing or without email)
    pub skipped: usize,
}

/// Cart lifecycle job runner.
pub struct CronService {
    options: Arc<OptionsService>,
    carts: Arc<CartService>,
    users: Arc<UserService>,
    catalog: Arc<CatalogService>,
    api: Arc<dyn SmailyApi>,
}

impl CronService {
    pub fn new(
        options: Arc<OptionsService>,
        carts: Arc<CartService>,
        users: Arc<UserService>,
        catalog: Arc<CatalogService>,
        api: Arc<dyn SmailyApi>,
    ) -> Self {
        Self {
            options,
            carts,
            users,
            catalog,
            api,
        }
    }

    /// Flip open carts older than the cutoff to abandoned. Returns the
    /// number of carts flipped; zero when the feature is disabled.
    pub async fn abandon_sweep(&self) -> usize {
        if !self.options.cart_status().await.enabled {
            return 0;
        }

        let cutoff = Duration::minutes(self.options.cart_cutoff_minutes().await);
        let now = Utc::now();
        let flipped = self.carts.abandon_older_than(now - cutoff, now).await;

        if flipped > 0 {
            tracing::info!(flipped, "marked carts abandoned");
        }

        flipped
    }

    /// Dispatch a reminder for every abandoned cart that has not had
    /// one. A dispatched request latches `mail_sent` even when the
    /// remote reports a data-validation subcode; a failed request
    /// leaves the record unmarked for the next sweep. There is no
    /// attempt cap.
    pub async fn reminder_sweep(&self) -> ReminderSweepReport {
        let status = self.options.cart_status().await;
        if !status.enabled {
            return ReminderSweepReport::default();
        }

        let fields = self.options.cart_fields().await;
        let mut report = ReminderSweepReport::default();

        for record in self.carts.pending_reminders().await {
            let user = match self.users.get(record.customer_id).await {
                Some(user) if !user.email.is_empty() => user,
                _ => {
                    report.skipped += 1;
                    continue;
                }
            };

            let mut payload = self.prepare_user_data(&user, &fields);
            payload.extend(self.prepare_products_data(&record.cart_content, &fields).await);

            match self
                .api
                .trigger_automation(status.autoresponder_id, vec![payload], false)
                .await
            {
                Ok(outcome) => {
                    if !outcome.is_success() {
                        tracing::warn!(
                            customer_id = record.customer_id,
                            code = outcome.code,
                            "reminder accepted with non-success subcode"
                        );
                    }
                    self.carts.mark_mail_sent(record.customer_id, Utc::now()).await;
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::error!(
                        customer_id = record.customer_id,
                        error = %e,
                        "failed to send abandoned cart reminder"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Address fields of a reminder payload, per the field selection.
    fn prepare_user_data(&self, user: &StoreUser, fields: &crate::models::AbandonedCartFields) -> AddressPayload {
        let site = self.options.site();
        let mut addresses = AddressPayload::new();

        // A contact flagged this way can receive abandoned cart emails
        // without being on the marketing list.
        addresses.insert("is_abandoned_cart".to_string(), "true".to_string());

        if fields.store_url {
            addresses.insert("store".to_string(), site.url.clone());
        }
        if fields.user_email {
            addresses.insert("email".to_string(), user.email.clone());
        }
        if fields.language {
            let language = user
                .language
                .clone()
                .unwrap_or_else(|| site.language.clone());
            addresses.insert("language".to_string(), language);
        }
        if fields.first_name {
            addresses.insert("first_name".to_string(), user.first_name.clone());
        }
        if fields.last_name {
            addresses.insert("last_name".to_string(), user.last_name.clone());
        }

        addresses
    }

    /// Product fields of a reminder payload: a fixed grid of every
    /// product field kind across ten slots, pre-filled empty so the
    /// legacy API always updates all of them, then filled from the cart
    /// up to the slot limit.
    async fn prepare_products_data(
        &self,
        content: &CartContent,
        fields: &crate::models::AbandonedCartFields,
    ) -> AddressPayload {
        let mut products = AddressPayload::new();

        for field in PRODUCT_FIELDS {
            for slot in 1..=PRODUCT_FIELD_SLOTS {
                products.insert(format!("{field}_{slot}"), String::new());
            }
        }

        let selected = fields.enabled_product_fields();
        if selected.is_empty() {
            return products;
        }

        let mut slot = 0;
        for item in &content.items {
            // Line items whose product left the catalog are skipped.
            let Some(product) = self.catalog.get(item.product_id).await else {
                continue;
            };

            slot += 1;
            if slot > PRODUCT_FIELD_SLOTS {
                products.insert("over_10_products".to_string(), "true".to_string());
                break;
            }

            for field in &selected {
                let value = match *field {
                    "product_name" => product.name.clone(),
                    "product_description" => product.description.clone(),
                    "product_sku" => product.sku.clone(),
                    "product_quantity" => item.quantity.to_string(),
                    "product_price" => product.price.clone(),
                    "product_base_price" => product.base_price.clone(),
                    "product_image_url" => match &product.image_url {
                        Some(url) if !url.is_empty() => url.clone(),
                        _ => continue,
                    },
                    _ => continue,
                };

                products.insert(format!("{field}_{slot}"), escape_html(&value));
            }
        }

        products
    }

    /// Full reminder payload for a single record.
    pub async fn build_reminder_payload(
        &self,
        user: &StoreUser,
        record: &CartRecord,
    ) -> AddressPayload {
        let fields = self.options.cart_fields().await;
        let mut payload = self.prepare_user_data(user, &fields);
        payload.extend(self.prepare_products_data(&record.cart_content, &fields).await);
        payload
    }
}

/// Escape the HTML-special characters in a payload value. Only `&`,
/// `<`, `>`, `"` and `'` are rewritten; everything else passes through
/// untouched so product names and descriptions arrive readable.
fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
