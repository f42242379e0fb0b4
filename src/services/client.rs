//! Smaily API Client
//!
//! Thin Basic-Auth wrapper over the Smaily legacy REST endpoints at
//! `https://{subdomain}.sendsmaily.net/api/{endpoint}.php`. No retry,
//! no circuit breaking; timeouts are the HTTP client's defaults.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::models::ApiCredentials;
use crate::services::OptionsService;

/// Remote body code signaling success.
pub const RESPONSE_CODE_SUCCESS: i64 = 101;

/// A single payload of subscriber or reminder fields.
pub type AddressPayload = BTreeMap<String, String>;

/// Client error. Remote-API subcodes are not errors at this layer; they
/// travel back to the caller inside [`ApiOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },
    #[error("failed to decode response body: {0}")]
    Decode(String),
    #[error("API credentials are not configured")]
    MissingCredentials,
}

/// Outcome of a POST call: the remote body's numeric code and message.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiOutcome {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiOutcome {
    pub fn is_success(&self) -> bool {
        self.code == RESPONSE_CODE_SUCCESS
    }
}

/// A remote automation workflow usable as an autoresponder.
#[derive(Debug, Clone, Deserialize)]
pub struct Autoresponder {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub title: String,
}

/// A contact on the remote unsubscribe list.
#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub email: String,
}

/// The Smaily API surface the scheduled jobs depend on.
#[async_trait]
pub trait SmailyApi: Send + Sync {
    /// List automation workflows triggered by form submission.
    async fn list_autoresponders(&self) -> Result<Vec<Autoresponder>, ClientError>;

    /// Trigger an automation workflow for the given addresses.
    async fn trigger_automation(
        &self,
        autoresponder_id: u64,
        addresses: Vec<AddressPayload>,
        force_opt_in: bool,
    ) -> Result<ApiOutcome, ClientError>;

    /// List contacts on the unsubscribed list.
    async fn list_unsubscribers(&self) -> Result<Vec<Contact>, ClientError>;

    /// Push the full subscriber list in one batched call.
    async fn update_subscribers(
        &self,
        subscribers: Vec<AddressPayload>,
    ) -> Result<ApiOutcome, ClientError>;
}

enum CredentialSource {
    /// Fixed credentials, used when validating unsaved admin input.
    Static(ApiCredentials),
    /// Read from the options repository per request, so credential
    /// changes apply to the next call.
    Options(Arc<OptionsService>),
}

/// HTTP implementation of [`SmailyApi`].
pub struct SmailyClient {
    http: reqwest::Client,
    credentials: CredentialSource,
}

impl SmailyClient {
    /// Client bound to fixed credentials.
    pub fn with_credentials(credentials: ApiCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials: CredentialSource::Static(credentials),
        }
    }

    /// Client reading saved credentials from the options repository.
    pub fn from_options(options: Arc<OptionsService>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials: CredentialSource::Options(options),
        }
    }

    async fn credentials(&self) -> Result<ApiCredentials, ClientError> {
        let credentials = match &self.credentials {
            CredentialSource::Static(credentials) => credentials.clone(),
            CredentialSource::Options(options) => options.api_credentials().await,
        };

        if !credentials.is_complete() {
            return Err(ClientError::MissingCredentials);
        }

        Ok(credentials)
    }

    pub(crate) fn endpoint_url(subdomain: &str, endpoint: &str) -> String {
        format!("https://{subdomain}.sendsmaily.net/api/{endpoint}.php")
    }

    fn user_agent() -> String {
        format!("smaily-connect/{}", env!("CARGO_PKG_VERSION"))
    }

    async fn get(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, ClientError> {
        let credentials = self.credentials().await?;

        let response = self
            .http
            .get(Self::endpoint_url(&credentials.subdomain, endpoint))
            .query(query)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header(reqwest::header::USER_AGENT, Self::user_agent())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn post(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<ApiOutcome, ClientError> {
        let credentials = self.credentials().await?;

        let response = self
            .http
            .post(Self::endpoint_url(&credentials.subdomain, endpoint))
            .json(body)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header(reqwest::header::USER_AGENT, Self::user_agent())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SmailyApi for SmailyClient {
    async fn list_autoresponders(&self) -> Result<Vec<Autoresponder>, ClientError> {
        let body = self
            .get("workflows", &[("trigger_type", "form_submitted")])
            .await?;

        let workflows: Vec<Autoresponder> =
            serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;

        // Entries without an id or title are unusable as options.
        Ok(workflows
            .into_iter()
            .filter(|w| w.id != 0 && !w.title.is_empty())
            .collect())
    }

    async fn trigger_automation(
        &self,
        autoresponder_id: u64,
        addresses: Vec<AddressPayload>,
        force_opt_in: bool,
    ) -> Result<ApiOutcome, ClientError> {
        self.post(
            "autoresponder",
            &json!({
                "autoresponder": autoresponder_id,
                "addresses": addresses,
                "force_opt_in": force_opt_in,
            }),
        )
        .await
    }

    async fn list_unsubscribers(&self) -> Result<Vec<Contact>, ClientError> {
        let body = self.get("contact", &[("list", "2"), ("fields", "")]).await?;

        serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn update_subscribers(
        &self,
        subscribers: Vec<AddressPayload>,
    ) -> Result<ApiOutcome, ClientError> {
        self.post("contact", &serde_json::to_value(subscribers).unwrap_or_default())
            .await
    }
}
