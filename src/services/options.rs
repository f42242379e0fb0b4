//! Options Service
//!
//! Explicit configuration repository for the plugin. Replaces the host
//! platform's stringly-keyed option storage with typed getters and
//! setters; the API password is encrypted at rest.

use tokio::sync::RwLock;

use crate::models::{
    AbandonedCartFields, AbandonedCartStatus, ApiCredentials, SiteConfig, SubscriberSyncFields,
    ABANDONED_CART_DEFAULT_CUTOFF_MINUTES, ABANDONED_CART_MIN_CUTOFF_MINUTES,
};
use crate::services::cypher::Cypher;

/// Options error
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("an autoresponder must be selected before enabling abandoned cart")]
    MissingAutoresponder,
}

/// Credentials as persisted: password encrypted.
#[derive(Debug, Clone, Default)]
struct StoredCredentials {
    subdomain: String,
    username: String,
    password: String,
}

#[derive(Debug, Default)]
struct OptionsState {
    credentials: StoredCredentials,
    subscriber_sync_enabled: bool,
    subscriber_sync_fields: Option<SubscriberSyncFields>,
    cart_status: AbandonedCartStatus,
    cart_cutoff_minutes: Option<i64>,
    cart_fields: Option<AbandonedCartFields>,
}

/// Typed settings repository.
pub struct OptionsService {
    state: RwLock<OptionsState>,
    cypher: Cypher,
    site: SiteConfig,
}

impl OptionsService {
    pub fn new(cypher: Cypher, site: SiteConfig) -> Self {
        Self {
            state: RwLock::new(OptionsState::default()),
            cypher,
            site,
        }
    }

    /// Site identity (url, title, default language).
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Persist API credentials, encrypting the password.
    pub async fn set_credentials(&self, credentials: ApiCredentials) {
        let mut state = self.state.write().await;
        state.credentials = StoredCredentials {
            subdomain: credentials.subdomain,
            username: credentials.username,
            password: self.cypher.encrypt(&credentials.password),
        };
    }

    /// API credentials with the password decrypted. A corrupted stored
    /// password decrypts to an empty string.
    pub async fn api_credentials(&self) -> ApiCredentials {
        let state = self.state.read().await;
        ApiCredentials {
            subdomain: state.credentials.subdomain.clone(),
            username: state.credentials.username.clone(),
            password: self.cypher.decrypt(&state.credentials.password),
        }
    }

    /// Has the user saved a complete set of credentials?
    pub async fn has_credentials(&self) -> bool {
        self.api_credentials().await.is_complete()
    }

    pub async fn subdomain(&self) -> String {
        let state = self.state.read().await;
        state.credentials.subdomain.clone()
    }

    pub async fn set_subscriber_sync_enabled(&self, enabled: bool) {
        let mut state = self.state.write().await;
        state.subscriber_sync_enabled = enabled;
    }

    pub async fn subscriber_sync_enabled(&self) -> bool {
        let state = self.state.read().await;
        state.subscriber_sync_enabled
    }

    pub async fn set_subscriber_sync_fields(&self, fields: SubscriberSyncFields) {
        let mut state = self.state.write().await;
        state.subscriber_sync_fields = Some(fields);
    }

    pub async fn subscriber_sync_fields(&self) -> SubscriberSyncFields {
        let state = self.state.read().await;
        state.subscriber_sync_fields.clone().unwrap_or_default()
    }

    /// Enable or disable abandoned cart tracking. Enabling requires a
    /// selected autoresponder.
    pub async fn set_cart_status(&self, status: AbandonedCartStatus) -> Result<(), OptionsError> {
        if status.enabled && status.autoresponder_id == 0 {
            return Err(OptionsError::MissingAutoresponder);
        }

        let mut state = self.state.write().await;
        state.cart_status = status;
        Ok(())
    }

    pub async fn cart_status(&self) -> AbandonedCartStatus {
        let state = self.state.read().await;
        state.cart_status
    }

    /// Set the abandoned cart cutoff. Values below the minimum clamp to it.
    pub async fn set_cart_cutoff_minutes(&self, minutes: i64) {
        let minutes = if minutes < ABANDONED_CART_MIN_CUTOFF_MINUTES {
            tracing::warn!(
                minutes,
                minimum = ABANDONED_CART_MIN_CUTOFF_MINUTES,
                "cart cutoff below minimum, clamping"
            );
            ABANDONED_CART_MIN_CUTOFF_MINUTES
        } else {
            minutes
        };

        let mut state = self.state.write().await;
        state.cart_cutoff_minutes = Some(minutes);
    }

    pub async fn cart_cutoff_minutes(&self) -> i64 {
        let state = self.state.read().await;
        state
            .cart_cutoff_minutes
            .unwrap_or(ABANDONED_CART_DEFAULT_CUTOFF_MINUTES)
    }

    pub async fn set_cart_fields(&self, fields: AbandonedCartFields) {
        let mut state = self.state.write().await;
        state.cart_fields = Some(fields);
    }

    pub async fn cart_fields(&self) -> AbandonedCartFields {
        let state = self.state.read().await;
        state.cart_fields.clone().unwrap_or_default()
    }

    /// Reset every stored option (uninstall path).
    pub async fn delete_all(&self) {
        let mut state = self.state.write().await;
        *state = OptionsState::default();
    }
}
