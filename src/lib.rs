//! Smaily Connect - Email Marketing Integration for RustPress
//!
//! Smaily Connect links a RustPress store to the Smaily marketing API:
//!
//! - **Credential Store**: API credentials with the password encrypted at rest
//! - **Abandoned Carts**: per-customer cart tracking with an open/abandoned lifecycle
//! - **Reminder Emails**: scheduled sweeps that trigger a Smaily automation workflow
//! - **Subscriber Sync**: daily reconciliation against the remote unsubscribe list
//! - **Settings**: credential validation and typed plugin configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smaily_connect::{Capabilities, CypherKeys, SiteConfig, SmailyConnectPlugin};
//!
//! #[tokio::main]
//! async fn main() {
//!     let keys = CypherKeys::new(&secure_auth_key, &auth_key);
//!     let site = SiteConfig::new("https://shop.example.com", "Example Shop", "en");
//!     let plugin = SmailyConnectPlugin::new(&keys, site, Capabilities { woocommerce: true })
//!         .expect("usable auth keys");
//!
//!     // Register the scheduled jobs
//!     plugin.activate().await;
//! }
//! ```
//!
//! ## Dispatching Host Events
//!
//! ```rust,ignore
//! use smaily_connect::{HookEvent, RequestContext, ScheduledJob};
//!
//! async fn on_cart_change(plugin: &smaily_connect::SmailyConnectPlugin) {
//!     let context = RequestContext::for_customer(17);
//!     plugin.handle_event(HookEvent::CartUpdated { context, items }).await;
//!
//!     // Scheduler tick, normally driven by the host cron
//!     plugin.handle_event(HookEvent::ScheduledTick(ScheduledJob::AbandonedCartStatus)).await;
//! }
//! ```

pub mod handlers;
pub mod models;
pub mod plugin;
pub mod services;

// Re-exports
pub use models::{
    AbandonedCartFields, AbandonedCartStatus, ApiCredentials, CartContent, CartItem, CartRecord,
    CartStatus, CustomerId, Gender, Product, SiteConfig, StoreUser, SubscriberSyncFields,
};

pub use services::cart::CartUpdate;
pub use services::client::{
    AddressPayload, ApiOutcome, Autoresponder, ClientError, Contact, RESPONSE_CODE_SUCCESS,
};
pub use services::cypher::CypherError;
pub use services::{
    CartService, CatalogService, CronService, Cypher, CypherKeys, OptionsService, SmailyApi,
    SmailyClient, SubscriberSyncService, UserService,
};

pub use handlers::SettingsHandler;

pub use plugin::{
    plugin_info, Capabilities, HookEvent, HookOutcome, PluginInfo, RequestContext, ScheduledJob,
    SmailyConnectPlugin,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the plugin
pub fn init(
    keys: &CypherKeys,
    site: SiteConfig,
    capabilities: Capabilities,
) -> Result<SmailyConnectPlugin, CypherError> {
    SmailyConnectPlugin::new(keys, site, capabilities)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    fn test_keys() -> CypherKeys {
        CypherKeys::new("secure-auth-key-for-tests", "auth-key-0123456789abcdef")
    }

    fn test_cypher() -> Cypher {
        Cypher::new(&test_keys()).unwrap()
    }

    fn test_options() -> Arc<OptionsService> {
        Arc::new(OptionsService::new(test_cypher(), SiteConfig::default()))
    }

    fn aged_record(customer_id: CustomerId, items: Vec<CartItem>, minutes: i64) -> CartRecord {
        let mut record = CartRecord::new(customer_id, items);
        record.cart_updated = Utc::now() - Duration::minutes(minutes);
        record
    }

    fn abandoned_record(customer_id: CustomerId, items: Vec<CartItem>) -> CartRecord {
        let mut record = aged_record(customer_id, items, 60);
        record.mark_abandoned(Utc::now());
        record
    }

    /// Scripted stand-in for the remote API.
    #[derive(Default)]
    struct MockApi {
        /// Queued trigger results; an empty queue answers success
        trigger_results: Mutex<VecDeque<Result<ApiOutcome, ClientError>>>,
        /// Every trigger call, with the autoresponder and its addresses
        triggered: Mutex<Vec<(u64, Vec<AddressPayload>)>>,
        /// Every batched subscriber push
        updated: Mutex<Vec<Vec<AddressPayload>>>,
        unsubscribers: Mutex<Vec<Contact>>,
        fail_unsubscribers: AtomicBool,
        fail_update: AtomicBool,
    }

    impl MockApi {
        fn queue_trigger_result(&self, result: Result<ApiOutcome, ClientError>) {
            self.trigger_results.lock().unwrap().push_back(result);
        }

        fn set_unsubscribers(&self, emails: &[&str]) {
            let contacts = emails
                .iter()
                .map(|email| Contact {
                    email: email.to_string(),
                })
                .collect();
            *self.unsubscribers.lock().unwrap() = contacts;
        }

        fn trigger_count(&self) -> usize {
            self.triggered.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SmailyApi for MockApi {
        async fn list_autoresponders(&self) -> Result<Vec<Autoresponder>, ClientError> {
            Ok(vec![Autoresponder {
                id: 42,
                title: "Cart reminder".to_string(),
            }])
        }

        async fn trigger_automation(
            &self,
            autoresponder_id: u64,
            addresses: Vec<AddressPayload>,
            _force_opt_in: bool,
        ) -> Result<ApiOutcome, ClientError> {
            self.triggered
                .lock()
                .unwrap()
                .push((autoresponder_id, addresses));

            self.trigger_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(ApiOutcome {
                    code: RESPONSE_CODE_SUCCESS,
                    message: None,
                }))
        }

        async fn list_unsubscribers(&self) -> Result<Vec<Contact>, ClientError> {
            if self.fail_unsubscribers.load(Ordering::SeqCst) {
                return Err(ClientError::Http { status: 500 });
            }
            Ok(self.unsubscribers.lock().unwrap().clone())
        }

        async fn update_subscribers(
            &self,
            subscribers: Vec<AddressPayload>,
        ) -> Result<ApiOutcome, ClientError> {
            if self.fail_update.load(Ordering::SeqCst) {
                return Err(ClientError::Http { status: 500 });
            }
            self.updated.lock().unwrap().push(subscribers);
            Ok(ApiOutcome {
                code: RESPONSE_CODE_SUCCESS,
                message: None,
            })
        }
    }

    struct CartRig {
        options: Arc<OptionsService>,
        carts: Arc<CartService>,
        users: Arc<UserService>,
        catalog: Arc<CatalogService>,
        api: Arc<MockApi>,
        cron: CronService,
    }

    async fn cart_rig() -> CartRig {
        let options = test_options();
        options
            .set_cart_status(AbandonedCartStatus {
                enabled: true,
                autoresponder_id: 42,
            })
            .await
            .unwrap();

        let carts = Arc::new(CartService::new());
        let users = Arc::new(UserService::new());
        let catalog = Arc::new(CatalogService::new());
        let api = Arc::new(MockApi::default());
        let cron = CronService::new(
            Arc::clone(&options),
            Arc::clone(&carts),
            Arc::clone(&users),
            Arc::clone(&catalog),
            Arc::clone(&api) as Arc<dyn SmailyApi>,
        );

        CartRig {
            options,
            carts,
            users,
            catalog,
            api,
            cron,
        }
    }

    struct SyncRig {
        users: Arc<UserService>,
        api: Arc<MockApi>,
        sync: SubscriberSyncService,
    }

    async fn sync_rig(enabled: bool) -> SyncRig {
        let options = test_options();
        options.set_subscriber_sync_enabled(enabled).await;

        let users = Arc::new(UserService::new());
        let api = Arc::new(MockApi::default());
        let sync = SubscriberSyncService::new(
            options,
            Arc::clone(&users),
            Arc::clone(&api) as Arc<dyn SmailyApi>,
        );

        SyncRig { users, api, sync }
    }

    // Cart table

    #[tokio::test]
    async fn test_upsert_inserts_open_record() {
        let carts = CartService::new();

        let update = carts.upsert_cart(7, vec![CartItem::new(1, 2)]).await;
        assert_eq!(update, CartUpdate::Inserted);

        let record = carts.get(7).await.unwrap();
        assert_eq!(record.cart_status, CartStatus::Open);
        assert_eq!(record.cart_content.items, vec![CartItem::new(1, 2)]);
        assert!(record.cart_abandoned_time.is_none());
        assert!(record.mail_sent.is_none());
        assert_eq!(carts.len().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_record_per_customer() {
        let carts = CartService::new();
        carts.upsert_cart(7, vec![CartItem::new(1, 1)]).await;
        let update = carts
            .upsert_cart(7, vec![CartItem::new(1, 1), CartItem::new(2, 3)])
            .await;

        assert_eq!(update, CartUpdate::Updated);
        assert_eq!(carts.len().await, 1);
        assert_eq!(carts.get(7).await.unwrap().cart_content.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_suppresses_duplicate_trigger() {
        let carts = CartService::new();
        let items = vec![CartItem::new(1, 1)];

        carts.upsert_cart(7, items.clone()).await;
        // Second page-load hook in the same request cycle.
        assert_eq!(carts.upsert_cart(7, items).await, CartUpdate::Suppressed);
        // A genuine change is not suppressed.
        assert_eq!(
            carts.upsert_cart(7, vec![CartItem::new(2, 1)]).await,
            CartUpdate::Updated
        );
    }

    #[tokio::test]
    async fn test_emptying_cart_deletes_record() {
        let carts = CartService::new();
        carts.upsert_cart(7, vec![CartItem::new(1, 1)]).await;

        assert_eq!(carts.upsert_cart(7, vec![]).await, CartUpdate::Deleted);
        assert!(carts.get(7).await.is_none());

        // Empty cart with no record does nothing.
        assert_eq!(carts.upsert_cart(7, vec![]).await, CartUpdate::Ignored);
    }

    #[tokio::test]
    async fn test_delete_cart_is_idempotent() {
        let carts = CartService::new();
        carts.upsert_cart(7, vec![CartItem::new(1, 1)]).await;

        assert!(carts.delete_cart(7).await);
        assert!(!carts.delete_cart(7).await);
        assert!(carts.is_empty().await);
    }

    #[tokio::test]
    async fn test_abandoned_cart_never_reopens() {
        let carts = CartService::new();
        carts.restore(abandoned_record(7, vec![CartItem::new(1, 1)])).await;

        carts.upsert_cart(7, vec![CartItem::new(2, 5)]).await;

        let record = carts.get(7).await.unwrap();
        assert_eq!(record.cart_status, CartStatus::Abandoned);
        assert_eq!(record.cart_content.items, vec![CartItem::new(2, 5)]);
    }

    #[test]
    fn test_cart_status_display() {
        assert_eq!(CartStatus::Open.to_string(), "open");
        assert_eq!(CartStatus::Abandoned.to_string(), "abandoned");
    }

    // Abandon sweep

    #[tokio::test]
    async fn test_abandon_sweep_flips_stale_carts() {
        let rig = cart_rig().await;

        // Cutoff defaults to 30 minutes.
        rig.carts
            .restore(aged_record(1, vec![CartItem::new(1, 1)], 45))
            .await;
        rig.carts
            .restore(aged_record(2, vec![CartItem::new(1, 1)], 20))
            .await;

        let before = Utc::now();
        assert_eq!(rig.cron.abandon_sweep().await, 1);

        let stale = rig.carts.get(1).await.unwrap();
        assert_eq!(stale.cart_status, CartStatus::Abandoned);
        assert!(stale.cart_abandoned_time.unwrap() >= before);

        let fresh = rig.carts.get(2).await.unwrap();
        assert_eq!(fresh.cart_status, CartStatus::Open);
        assert!(fresh.cart_abandoned_time.is_none());
    }

    #[tokio::test]
    async fn test_abandon_sweep_noop_when_disabled() {
        let rig = cart_rig().await;
        rig.options
            .set_cart_status(AbandonedCartStatus::default())
            .await
            .unwrap();

        rig.carts
            .restore(aged_record(1, vec![CartItem::new(1, 1)], 45))
            .await;

        assert_eq!(rig.cron.abandon_sweep().await, 0);
        assert_eq!(rig.carts.get(1).await.unwrap().cart_status, CartStatus::Open);
    }

    // Reminder sweep

    #[tokio::test]
    async fn test_reminder_sent_at_most_once() {
        let rig = cart_rig().await;
        rig.users.upsert(StoreUser::new(7, "mari@example.com")).await;
        rig.carts
            .restore(abandoned_record(7, vec![CartItem::new(1, 1)]))
            .await;

        let report = rig.cron.reminder_sweep().await;
        assert_eq!(report.sent, 1);
        assert_eq!(rig.api.trigger_count(), 1);

        let record = rig.carts.get(7).await.unwrap();
        assert_eq!(record.mail_sent, Some(true));
        assert!(record.mail_sent_time.is_some());

        // Latched records are not re-sent.
        let report = rig.cron.reminder_sweep().await;
        assert_eq!(report.sent, 0);
        assert_eq!(rig.api.trigger_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_reminder_retried_next_sweep() {
        let rig = cart_rig().await;
        rig.users.upsert(StoreUser::new(7, "mari@example.com")).await;
        rig.carts
            .restore(abandoned_record(7, vec![CartItem::new(1, 1)]))
            .await;

        rig.api
            .queue_trigger_result(Err(ClientError::Http { status: 500 }));

        let report = rig.cron.reminder_sweep().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 0);
        assert!(rig.carts.get(7).await.unwrap().mail_sent.is_none());

        // The next sweep succeeds and latches the record.
        let report = rig.cron.reminder_sweep().await;
        assert_eq!(report.sent, 1);
        assert_eq!(rig.carts.get(7).await.unwrap().mail_sent, Some(true));
    }

    #[tokio::test]
    async fn test_validation_subcode_still_latches_reminder() {
        let rig = cart_rig().await;
        rig.users.upsert(StoreUser::new(7, "mari@example.com")).await;
        rig.carts
            .restore(abandoned_record(7, vec![CartItem::new(1, 1)]))
            .await;

        // Dispatched but the remote reports an invalid-data subcode.
        rig.api.queue_trigger_result(Ok(ApiOutcome {
            code: 204,
            message: Some("invalid data".to_string()),
        }));

        let report = rig.cron.reminder_sweep().await;
        assert_eq!(report.sent, 1);
        assert_eq!(rig.carts.get(7).await.unwrap().mail_sent, Some(true));
    }

    #[tokio::test]
    async fn test_reminder_skips_record_without_user() {
        let rig = cart_rig().await;
        rig.carts
            .restore(abandoned_record(9, vec![CartItem::new(1, 1)]))
            .await;

        let report = rig.cron.reminder_sweep().await;
        assert_eq!(report.skipped, 1);
        assert_eq!(rig.api.trigger_count(), 0);
        // The record stays pending in case the user reappears.
        assert!(rig.carts.get(9).await.unwrap().mail_sent.is_none());
    }

    #[tokio::test]
    async fn test_reminder_uses_configured_autoresponder() {
        let rig = cart_rig().await;
        rig.users.upsert(StoreUser::new(7, "mari@example.com")).await;
        rig.carts
            .restore(abandoned_record(7, vec![CartItem::new(1, 1)]))
            .await;

        rig.cron.reminder_sweep().await;

        let triggered = rig.api.triggered.lock().unwrap();
        let (autoresponder_id, addresses) = &triggered[0];
        assert_eq!(*autoresponder_id, 42);
        assert_eq!(addresses.len(), 1);
        assert_eq!(
            addresses[0].get("is_abandoned_cart"),
            Some(&"true".to_string())
        );
        assert_eq!(
            addresses[0].get("email"),
            Some(&"mari@example.com".to_string())
        );
    }

    // Reminder payload

    #[tokio::test]
    async fn test_payload_fills_slots_and_pads_the_rest() {
        let rig = cart_rig().await;
        rig.options
            .set_cart_fields(AbandonedCartFields {
                product_name: true,
                ..AbandonedCartFields::default()
            })
            .await;

        for (id, name) in [(1, "Alpha"), (2, "Beta"), (3, "Gamma")] {
            rig.catalog.upsert(Product::new(id, name)).await;
        }

        let user = StoreUser::new(7, "mari@example.com");
        let record = abandoned_record(
            7,
            vec![CartItem::new(1, 1), CartItem::new(2, 2), CartItem::new(3, 1)],
        );

        let payload = rig.cron.build_reminder_payload(&user, &record).await;

        assert_eq!(payload.get("product_name_1"), Some(&"Alpha".to_string()));
        assert_eq!(payload.get("product_name_2"), Some(&"Beta".to_string()));
        assert_eq!(payload.get("product_name_3"), Some(&"Gamma".to_string()));
        for slot in 4..=10 {
            assert_eq!(payload.get(&format!("product_name_{slot}")), Some(&String::new()));
        }
        assert!(!payload.contains_key("over_10_products"));
    }

    #[tokio::test]
    async fn test_payload_flags_overflow_past_ten_items() {
        let rig = cart_rig().await;
        rig.options
            .set_cart_fields(AbandonedCartFields {
                product_name: true,
                ..AbandonedCartFields::default()
            })
            .await;

        let mut items = Vec::new();
        for id in 1..=12u64 {
            rig.catalog
                .upsert(Product::new(id, &format!("Product {id}")))
                .await;
            items.push(CartItem::new(id, 1));
        }

        let user = StoreUser::new(7, "mari@example.com");
        let record = abandoned_record(7, items);
        let payload = rig.cron.build_reminder_payload(&user, &record).await;

        assert_eq!(payload.get("over_10_products"), Some(&"true".to_string()));
        assert_eq!(
            payload.get("product_name_10"),
            Some(&"Product 10".to_string())
        );
        assert!(!payload.contains_key("product_name_11"));
    }

    #[tokio::test]
    async fn test_payload_skips_items_missing_from_catalog() {
        let rig = cart_rig().await;
        rig.options
            .set_cart_fields(AbandonedCartFields {
                product_name: true,
                product_quantity: true,
                ..AbandonedCartFields::default()
            })
            .await;

        // Product 1 was removed from the catalog, product 2 remains.
        rig.catalog.upsert(Product::new(2, "Beta")).await;

        let user = StoreUser::new(7, "mari@example.com");
        let record = abandoned_record(7, vec![CartItem::new(1, 1), CartItem::new(2, 4)]);
        let payload = rig.cron.build_reminder_payload(&user, &record).await;

        // The surviving item fills the first slot.
        assert_eq!(payload.get("product_name_1"), Some(&"Beta".to_string()));
        assert_eq!(payload.get("product_quantity_1"), Some(&"4".to_string()));
        assert_eq!(payload.get("product_name_2"), Some(&String::new()));
    }

    #[tokio::test]
    async fn test_payload_escapes_only_html_special_characters() {
        let rig = cart_rig().await;
        rig.options
            .set_cart_fields(AbandonedCartFields {
                product_name: true,
                product_description: true,
                ..AbandonedCartFields::default()
            })
            .await;

        rig.catalog
            .upsert(
                Product::new(1, "B&B \"Deluxe\" <Kit>")
                    .with_description("Mari's pick, 10 pieces"),
            )
            .await;

        let user = StoreUser::new(7, "mari@example.com");
        let record = abandoned_record(7, vec![CartItem::new(1, 1)]);
        let payload = rig.cron.build_reminder_payload(&user, &record).await;

        assert_eq!(
            payload.get("product_name_1"),
            Some(&"B&amp;B &quot;Deluxe&quot; &lt;Kit&gt;".to_string())
        );
        // Spaces, commas and digits pass through unchanged.
        assert_eq!(
            payload.get("product_description_1"),
            Some(&"Mari&#039;s pick, 10 pieces".to_string())
        );
    }

    #[tokio::test]
    async fn test_payload_language_falls_back_to_site() {
        let rig = cart_rig().await;

        let user = StoreUser::new(7, "mari@example.com");
        let record = abandoned_record(7, vec![CartItem::new(1, 1)]);
        let payload = rig.cron.build_reminder_payload(&user, &record).await;
        assert_eq!(payload.get("language"), Some(&"en".to_string()));

        let localized = StoreUser::new(8, "juri@example.com").with_language("et");
        let payload = rig.cron.build_reminder_payload(&localized, &record).await;
        assert_eq!(payload.get("language"), Some(&"et".to_string()));
    }

    // Subscriber sync

    #[tokio::test]
    async fn test_sync_clears_unsubscribers_before_push() {
        let rig = sync_rig(true).await;
        rig.users
            .upsert(StoreUser::new(1, "gone@example.com").subscribed())
            .await;
        rig.users
            .upsert(StoreUser::new(2, "stay@example.com").subscribed())
            .await;
        rig.users.upsert(StoreUser::new(3, "never@example.com")).await;

        // Remote list addresses match case-insensitively.
        rig.api.set_unsubscribers(&["GONE@example.com"]);

        let report = rig.sync.sync_subscribers().await;
        assert_eq!(report.unsubscribed, 1);
        assert_eq!(report.pushed, 1);
        assert!(!rig.users.get(1).await.unwrap().newsletter);

        let updated = rig.api.updated.lock().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].len(), 1);
        assert_eq!(
            updated[0][0].get("email"),
            Some(&"stay@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_sync_skipped_when_disabled() {
        let rig = sync_rig(false).await;
        rig.users
            .upsert(StoreUser::new(1, "mari@example.com").subscribed())
            .await;

        let report = rig.sync.sync_subscribers().await;
        assert!(report.skipped);
        assert!(rig.api.updated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_push_reports_nothing_pushed() {
        let rig = sync_rig(true).await;
        rig.users
            .upsert(StoreUser::new(1, "mari@example.com").subscribed())
            .await;
        rig.api.fail_update.store(true, Ordering::SeqCst);

        let report = rig.sync.sync_subscribers().await;
        assert_eq!(report.pushed, 0);
        assert!(rig.api.updated.lock().unwrap().is_empty());
        // The user stays subscribed for the next run.
        assert!(rig.users.get(1).await.unwrap().newsletter);
    }

    #[tokio::test]
    async fn test_sync_aborts_when_unsubscriber_pull_fails() {
        let rig = sync_rig(true).await;
        rig.users
            .upsert(StoreUser::new(1, "mari@example.com").subscribed())
            .await;
        rig.api.fail_unsubscribers.store(true, Ordering::SeqCst);

        let report = rig.sync.sync_subscribers().await;
        assert_eq!(report.pushed, 0);
        // No push phase after a failed pull.
        assert!(rig.api.updated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_payload_field_selection() {
        let rig = sync_rig(true).await;

        let mut user = StoreUser::new(5, "mari@example.com")
            .with_name("Mari", "Maasikas")
            .subscribed();
        user.registered = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        user.role = Some("customer".to_string());

        let fields = SubscriberSyncFields {
            customer_group: true,
            customer_id: true,
            first_registered: true,
            first_name: true,
            last_name: true,
            ..SubscriberSyncFields::default()
        };

        let payload = rig.sync.build_subscriber_payload(&user, &fields);
        assert_eq!(payload.get("email"), Some(&"mari@example.com".to_string()));
        assert_eq!(payload.get("store"), Some(&"http://localhost".to_string()));
        assert_eq!(payload.get("language"), Some(&"en".to_string()));
        assert_eq!(payload.get("customer_group"), Some(&"customer".to_string()));
        assert_eq!(payload.get("customer_id"), Some(&"5".to_string()));
        assert_eq!(
            payload.get("first_registered"),
            Some(&"2024-05-01 12:30:00".to_string())
        );
        assert_eq!(payload.get("first_name"), Some(&"Mari".to_string()));
        assert_eq!(payload.get("last_name"), Some(&"Maasikas".to_string()));
        // Disabled and empty fields are not sent.
        assert!(!payload.contains_key("site_title"));
        assert!(!payload.contains_key("nickname"));
    }

    // Credential encryption

    #[test]
    fn test_cypher_round_trip() {
        let cypher = test_cypher();
        let encrypted = cypher.encrypt("s3cret-password");

        assert_ne!(encrypted, "s3cret-password");
        assert_eq!(cypher.decrypt(&encrypted), "s3cret-password");
    }

    #[test]
    fn test_tampered_cyphertext_decrypts_empty() {
        let cypher = test_cypher();
        let encrypted = cypher.encrypt("s3cret-password");

        let mut bytes = encrypted.into_bytes();
        let i = bytes.len() / 2;
        bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(cypher.decrypt(&tampered), "");
        assert_eq!(cypher.decrypt("not base64 at all"), "");
        assert_eq!(cypher.decrypt(""), "");
    }

    #[test]
    fn test_decrypt_with_different_keys_yields_empty() {
        let encrypted = test_cypher().encrypt("s3cret-password");

        let other = Cypher::new(&CypherKeys::new(
            "another-secure-key",
            "another-auth-key-16-bytes",
        ))
        .unwrap();
        assert_eq!(other.decrypt(&encrypted), "");
    }

    #[test]
    fn test_cypher_rejects_unusable_keys() {
        assert!(Cypher::new(&CypherKeys::new("", "auth-key-0123456789abcdef")).is_err());
        assert!(Cypher::new(&CypherKeys::new("secure", "short")).is_err());
    }

    // Options

    #[tokio::test]
    async fn test_credentials_stored_encrypted() {
        let options = test_options();
        options
            .set_credentials(ApiCredentials::new("demo", "mari", "s3cret"))
            .await;

        assert!(options.has_credentials().await);
        let credentials = options.api_credentials().await;
        assert_eq!(credentials.subdomain, "demo");
        assert_eq!(credentials.password, "s3cret");

        options.delete_all().await;
        assert!(!options.has_credentials().await);
    }

    #[tokio::test]
    async fn test_cutoff_clamps_to_minimum() {
        let options = test_options();
        assert_eq!(options.cart_cutoff_minutes().await, 30);

        options.set_cart_cutoff_minutes(5).await;
        assert_eq!(options.cart_cutoff_minutes().await, 10);

        options.set_cart_cutoff_minutes(45).await;
        assert_eq!(options.cart_cutoff_minutes().await, 45);
    }

    #[tokio::test]
    async fn test_enabling_cart_requires_autoresponder() {
        let options = test_options();

        let result = options
            .set_cart_status(AbandonedCartStatus {
                enabled: true,
                autoresponder_id: 0,
            })
            .await;
        assert!(result.is_err());
        assert!(!options.cart_status().await.enabled);

        options
            .set_cart_status(AbandonedCartStatus {
                enabled: true,
                autoresponder_id: 42,
            })
            .await
            .unwrap();
        assert!(options.cart_status().await.enabled);
    }

    // Settings handler

    #[test]
    fn test_subdomain_normalization() {
        let handler = SettingsHandler::new(test_options());

        assert_eq!(handler.normalize_subdomain("demo"), "demo");
        assert_eq!(
            handler.normalize_subdomain("https://demo.sendsmaily.net"),
            "demo"
        );
        assert_eq!(handler.normalize_subdomain("demo.sendsmaily.net"), "demo");
        assert_eq!(handler.normalize_subdomain("my-store"), "mystore");
        // A bare apex domain has no subdomain to extract.
        assert_eq!(handler.normalize_subdomain("https://sendsmaily.net"), "");
    }

    #[tokio::test]
    async fn test_save_credentials_requires_all_fields() {
        let handler = SettingsHandler::new(test_options());

        let result = handler
            .save_credentials(handlers::CredentialsForm {
                subdomain: "  ".to_string(),
                username: "mari".to_string(),
                password: "s3cret".to_string(),
            })
            .await;
        assert!(result.is_err());
    }

    // API client

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            SmailyClient::endpoint_url("demo", "workflows"),
            "https://demo.sendsmaily.net/api/workflows.php"
        );
    }

    #[test]
    fn test_outcome_success_code() {
        let ok = ApiOutcome {
            code: RESPONSE_CODE_SUCCESS,
            message: None,
        };
        let failed = ApiOutcome {
            code: 204,
            message: Some("invalid data".to_string()),
        };
        assert!(ok.is_success());
        assert!(!failed.is_success());
    }

    // Plugin

    fn test_plugin(woocommerce: bool) -> SmailyConnectPlugin {
        SmailyConnectPlugin::new(
            &test_keys(),
            SiteConfig::default(),
            Capabilities { woocommerce },
        )
        .unwrap()
    }

    #[test]
    fn test_plugin_creation() {
        let plugin = test_plugin(true);
        assert_eq!(plugin.name(), "Smaily Connect");
        assert_eq!(plugin.version(), VERSION);
    }

    #[test]
    fn test_plugin_info() {
        let info = plugin_info();
        assert_eq!(info.name, "Smaily Connect");
        assert!(info.hooks.contains(&"cart.updated"));
        assert!(info.routes.contains(&"/admin/smaily-connect"));
    }

    #[tokio::test]
    async fn test_cart_hook_guards() {
        let plugin = test_plugin(true);
        let items = vec![CartItem::new(1, 1)];

        let outcome = plugin
            .handle_event(HookEvent::CartUpdated {
                context: RequestContext::anonymous(),
                items: items.clone(),
            })
            .await;
        assert!(matches!(outcome, HookOutcome::Skipped));

        let outcome = plugin
            .handle_event(HookEvent::CartUpdated {
                context: RequestContext::for_customer(5).admin(),
                items: items.clone(),
            })
            .await;
        assert!(matches!(outcome, HookOutcome::Skipped));

        let outcome = plugin
            .handle_event(HookEvent::CartUpdated {
                context: RequestContext::for_customer(5).asset(),
                items: items.clone(),
            })
            .await;
        assert!(matches!(outcome, HookOutcome::Skipped));

        let outcome = plugin
            .handle_event(HookEvent::CartUpdated {
                context: RequestContext::for_customer(5),
                items,
            })
            .await;
        assert!(matches!(
            outcome,
            HookOutcome::CartChange(CartUpdate::Inserted)
        ));
    }

    #[tokio::test]
    async fn test_order_placed_removes_cart() {
        let plugin = test_plugin(true);
        plugin
            .handle_event(HookEvent::CartUpdated {
                context: RequestContext::for_customer(5),
                items: vec![CartItem::new(1, 1)],
            })
            .await;

        let outcome = plugin
            .handle_event(HookEvent::OrderPlaced { customer_id: 5 })
            .await;
        assert!(matches!(outcome, HookOutcome::CartRemoved(true)));
        assert!(plugin.carts().get(5).await.is_none());
    }

    #[tokio::test]
    async fn test_cart_hooks_need_store_capability() {
        let plugin = test_plugin(false);

        let outcome = plugin
            .handle_event(HookEvent::CartUpdated {
                context: RequestContext::for_customer(5),
                items: vec![CartItem::new(1, 1)],
            })
            .await;
        assert!(matches!(outcome, HookOutcome::Skipped));

        plugin.activate().await;
        assert_eq!(
            plugin.scheduled_jobs().await,
            vec![ScheduledJob::SubscriberSync]
        );
    }

    #[tokio::test]
    async fn test_activation_registers_all_jobs() {
        let plugin = test_plugin(true);

        plugin.activate().await;
        assert_eq!(plugin.scheduled_jobs().await.len(), 3);

        plugin.deactivate().await;
        assert!(plugin.scheduled_jobs().await.is_empty());
    }

    #[test]
    fn test_job_intervals() {
        assert_eq!(
            ScheduledJob::AbandonedCartStatus.interval(),
            chrono::Duration::minutes(15)
        );
        assert_eq!(
            ScheduledJob::SubscriberSync.interval(),
            chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_asset_request_detection() {
        assert!(plugin::is_asset_request("/favicon.ico"));
        assert!(plugin::is_asset_request("/apple-touch-icon.png"));
        assert!(!plugin::is_asset_request("/shop/cart"));
    }

    #[tokio::test]
    async fn test_scheduled_tick_dispatch() {
        let plugin = test_plugin(true);

        // Cart features disabled, sweeps do nothing.
        let outcome = plugin
            .handle_event(HookEvent::ScheduledTick(ScheduledJob::AbandonedCartStatus))
            .await;
        assert!(matches!(outcome, HookOutcome::AbandonSweep(0)));

        let outcome = plugin
            .handle_event(HookEvent::ScheduledTick(ScheduledJob::SubscriberSync))
            .await;
        match outcome {
            HookOutcome::SubscriberSync(report) => assert!(report.skipped),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
