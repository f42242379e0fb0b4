//! Subscriber Synchronization Job
//!
//! Daily reconciliation between the local newsletter flags and the
//! remote list: pull the remote unsubscribers and clear matching local
//! flags, then push every locally subscribed user in one batched call.
//! Any error short-circuits the rest of the job; there is no partial
//! retry or backoff.

use std::sync::Arc;

use crate::models::{StoreUser, SubscriberSyncFields};
use crate::services::client::{AddressPayload, SmailyApi};
use crate::services::{OptionsService, UserService};

/// Outcome of one synchronization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Job skipped because the feature flag is off
    pub skipped: bool,
    /// Local users whose newsletter flag was cleared
    pub unsubscribed: usize,
    /// Subscribers delivered in the push (zero when the push fails)
    pub pushed: usize,
}

/// Subscriber synchronization job runner.
pub struct SubscriberSyncService {
    options: Arc<OptionsService>,
    users: Arc<UserService>,
    api: Arc<dyn SmailyApi>,
}

impl SubscriberSyncService {
    pub fn new(
        options: Arc<OptionsService>,
        users: Arc<UserService>,
        api: Arc<dyn SmailyApi>,
    ) -> Self {
        Self {
            options,
            users,
            api,
        }
    }

    /// Run both phases of the synchronization.
    pub async fn sync_subscribers(&self) -> SyncReport {
        if !self.options.subscriber_sync_enabled().await {
            return SyncReport {
                skipped: true,
                ..SyncReport::default()
            };
        }

        let mut report = SyncReport::default();

        // Phase 1: clear local flags for remote unsubscribers. Runs to
        // completion before any push so an unsubscribed contact is
        // never pushed back.
        let unsubscribers = match self.api.list_unsubscribers().await {
            Ok(unsubscribers) => unsubscribers,
            Err(e) => {
                tracing::error!(error = %e, "unable to retrieve unsubscribed contacts");
                return report;
            }
        };

        for contact in unsubscribers {
            if contact.email.is_empty() {
                continue;
            }
            if let Some(user) = self.users.find_by_email(&contact.email).await {
                if self.users.set_newsletter(user.id, false).await {
                    report.unsubscribed += 1;
                }
            }
        }

        // Phase 2: push the full subscriber list in one batched call.
        let subscribers = self.users.subscribed().await;
        if subscribers.is_empty() {
            tracing::info!("no subscribers for synchronization");
            return report;
        }

        let fields = self.options.subscriber_sync_fields().await;
        let list: Vec<AddressPayload> = subscribers
            .iter()
            .map(|user| self.build_subscriber_payload(user, &fields))
            .collect();
        let count = list.len();

        match self.api.update_subscribers(list).await {
            Ok(outcome) => {
                if !outcome.is_success() {
                    tracing::error!(code = outcome.code, "unable to send subscribers to Smaily");
                }
                report.pushed = count;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to send subscribers to Smaily");
            }
        }

        report
    }

    /// Field-selected payload for one subscriber. Empty values are
    /// omitted rather than sent as blanks.
    pub fn build_subscriber_payload(
        &self,
        user: &StoreUser,
        fields: &SubscriberSyncFields,
    ) -> AddressPayload {
        let site = self.options.site();
        let mut payload = AddressPayload::new();

        if fields.user_email {
            payload.insert("email".to_string(), user.email.clone());
        }
        if fields.store_url {
            payload.insert("store".to_string(), site.url.clone());
        }
        if fields.language {
            let language = user
                .language
                .clone()
                .unwrap_or_else(|| site.language.clone());
            if !language.is_empty() {
                payload.insert("language".to_string(), language);
            }
        }
        if fields.customer_group {
            if let Some(role) = user.role.as_deref().filter(|r| !r.is_empty()) {
                payload.insert("customer_group".to_string(), role.to_string());
            }
        }
        if fields.customer_id {
            payload.insert("customer_id".to_string(), user.id.to_string());
        }
        if fields.first_registered {
            payload.insert(
                "first_registered".to_string(),
                user.registered.format("%Y-%m-%d %H:%M:%S").to_string(),
            );
        }
        if fields.user_dob {
            if let Some(birthday) = user.birthday {
                payload.insert("birthday".to_string(), birthday.format("%Y-%m-%d").to_string());
            }
        }
        if fields.user_gender {
            if let Some(gender) = user.gender {
                payload.insert("user_gender".to_string(), gender.label().to_string());
            }
        }
        if fields.site_title && !site.title.is_empty() {
            payload.insert("site_title".to_string(), site.title.clone());
        }
        if fields.first_name && !user.first_name.is_empty() {
            payload.insert("first_name".to_string(), user.first_name.clone());
        }
        if fields.last_name && !user.last_name.is_empty() {
            payload.insert("last_name".to_string(), user.last_name.clone());
        }
        if fields.nickname {
            if let Some(nickname) = user.nickname.as_deref().filter(|n| !n.is_empty()) {
                payload.insert("nickname".to_string(), nickname.to_string());
            }
        }
        if fields.user_phone {
            if let Some(phone) = user.phone.as_deref().filter(|p| !p.is_empty()) {
                payload.insert("user_phone".to_string(), phone.to_string());
            }
        }

        payload
    }
}
