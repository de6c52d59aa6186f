//! Payment-provider onboarding status and setup.
//!
//! The storefront backend brokers the actual payment-provider (Stripe
//! Connect) protocol; the dashboard only asks for current status and, when
//! setup is incomplete, for an onboarding redirect URL.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use clementine_core::{StoreId, UserId};

use crate::config::ApiConfig;

/// Errors from payment-setup calls.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("API error: status {0}")]
    Api(u16),

    /// Response body could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Payment-provider account status for a store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSetupStatus {
    /// Whether a provider account is connected at all.
    pub connected: bool,
    /// Whether the connected account can accept charges.
    pub charges_enabled: bool,
    /// Provider-side account id, once connected.
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Payment-setup collaborator.
#[async_trait]
pub trait PaymentSetupProvider: Send + Sync {
    /// Fetch the current payment-setup status for the store.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] when the backend cannot be consulted.
    async fn check_status(&self, store_id: &StoreId) -> Result<PaymentSetupStatus, PaymentError>;

    /// Begin provider onboarding; returns the URL to redirect the owner to.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] when the backend cannot be consulted or the
    /// returned redirect is not a valid URL.
    async fn start_onboarding(
        &self,
        store_id: &StoreId,
        user_id: &UserId,
    ) -> Result<Url, PaymentError>;
}

#[derive(Debug, Deserialize)]
struct OnboardingResponse {
    url: String,
}

/// [`PaymentSetupProvider`] backed by the storefront backend's REST API.
#[derive(Clone)]
pub struct HttpPaymentSetupProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentSetupProvider {
    /// Create a payments client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let value = format!("Bearer {}", api_key.expose_secret());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value)
                    .map_err(|e| PaymentError::Parse(format!("Invalid API key format: {e}")))?,
            );
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl PaymentSetupProvider for HttpPaymentSetupProvider {
    async fn check_status(&self, store_id: &StoreId) -> Result<PaymentSetupStatus, PaymentError> {
        let url = format!("{}/stores/{}/payments/status", self.base_url, store_id);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::Api(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }

    async fn start_onboarding(
        &self,
        store_id: &StoreId,
        user_id: &UserId,
    ) -> Result<Url, PaymentError> {
        let url = format!("{}/stores/{}/payments/onboarding", self.base_url, store_id);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "userId": user_id }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::Api(status.as_u16()));
        }

        let body: OnboardingResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;
        Url::parse(&body.url).map_err(|e| PaymentError::Parse(format!("bad redirect URL: {e}")))
    }
}
