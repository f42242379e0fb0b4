//! Settings Handler
//!
//! Admin-facing settings operations. This is the one place remote-call
//! failures surface to the user, as typed settings errors instead of a
//! log line.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{AbandonedCartStatus, ApiCredentials};
use crate::services::client::{ClientError, SmailyApi};
use crate::services::options::OptionsError;
use crate::services::{OptionsService, SmailyClient};

/// Path of the plugin settings screen under the site URL.
const SETTINGS_PATH: &str = "/admin/smaily-connect";

/// Settings error, rendered as an on-screen message.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("please enter {0}")]
    MissingField(&'static str),
    #[error("credential check failed: {0}")]
    Validation(#[from] ClientError),
    #[error(transparent)]
    Options(#[from] OptionsError),
}

/// Submitted credentials form
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsForm {
    pub subdomain: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigurationResponse {
    pub subdomain: String,
    pub settings_url: String,
}

/// Autoresponder select option for admin blocks
#[derive(Debug, Serialize)]
pub struct AutoresponderOption {
    pub value: String,
    pub label: String,
}

/// Settings handler
pub struct SettingsHandler {
    options: Arc<OptionsService>,
    subdomain_re: Regex,
}

impl SettingsHandler {
    pub fn new(options: Arc<OptionsService>) -> Self {
        Self {
            options,
            // Compiled from a literal, cannot fail.
            subdomain_re: Regex::new("[^a-zA-Z0-9]+").expect("valid pattern"),
        }
    }

    /// Validate and persist API credentials. The credentials are
    /// checked against the remote API before saving.
    pub async fn save_credentials(&self, form: CredentialsForm) -> Result<(), SettingsError> {
        let subdomain = self.normalize_subdomain(form.subdomain.trim());
        let username = form.username.trim().to_string();
        let password = form.password.trim().to_string();

        if subdomain.is_empty() {
            return Err(SettingsError::MissingField("subdomain"));
        }
        if username.is_empty() {
            return Err(SettingsError::MissingField("username"));
        }
        if password.is_empty() {
            return Err(SettingsError::MissingField("password"));
        }

        let credentials = ApiCredentials::new(&subdomain, &username, &password);

        // Any authenticated call works as a validation probe.
        SmailyClient::with_credentials(credentials.clone())
            .list_autoresponders()
            .await?;

        self.options.set_credentials(credentials).await;
        Ok(())
    }

    /// Update the abandoned cart settings in one step.
    pub async fn save_abandoned_cart(
        &self,
        status: AbandonedCartStatus,
        cutoff_minutes: i64,
    ) -> Result<(), SettingsError> {
        self.options.set_cart_status(status).await?;
        self.options.set_cart_cutoff_minutes(cutoff_minutes).await;
        Ok(())
    }

    /// Plugin configuration for admin blocks.
    pub async fn configuration(&self) -> ConfigurationResponse {
        ConfigurationResponse {
            subdomain: self.options.subdomain().await,
            settings_url: format!(
                "{}{}",
                self.options.site().url.trim_end_matches('/'),
                SETTINGS_PATH
            ),
        }
    }

    /// Autoresponder select options, fetched with the saved credentials.
    pub async fn autoresponder_options(&self) -> Result<Vec<AutoresponderOption>, SettingsError> {
        let client = SmailyClient::with_credentials(self.options.api_credentials().await);

        let autoresponders = client.list_autoresponders().await?;
        Ok(autoresponders
            .into_iter()
            .map(|a| AutoresponderOption {
                value: a.id.to_string(),
                label: a.title,
            })
            .collect())
    }

    /// Reduce a messy subdomain input to the bare host prefix. Accepts
    /// a full URL (`https://demo.sendsmaily.net`), a bare host
    /// (`demo.sendsmaily.net`) or the prefix itself, and strips
    /// everything but alphanumerics from the result.
    pub fn normalize_subdomain(&self, input: &str) -> String {
        let mut subdomain = input.to_string();

        if let Ok(url) = Url::parse(input) {
            if let Some(host) = url.host_str() {
                let parts: Vec<&str> = host.split('.').collect();
                subdomain = if parts.len() >= 3 {
                    parts[0].to_string()
                } else {
                    String::new()
                };
            }
        } else if input.ends_with(".sendsmaily.net") {
            subdomain = input
                .split('.')
                .next()
                .unwrap_or_default()
                .to_string();
        }

        self.subdomain_re.replace_all(&subdomain, "").to_string()
    }
}
