//! Store ownership verification.
//!
//! After the credential provider authenticates a user, the backend is asked
//! whether that user may manage *this* store. The verifier is reachable over
//! the network, so the session must decide what an unreachable verifier
//! means: [`VerifierFailurePolicy`] makes that an explicit configuration
//! choice instead of an accidental fallback branch.

use std::str::FromStr;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use clementine_core::{StoreId, UserId};

use crate::config::ApiConfig;

/// Errors from an ownership check.
///
/// An `Ok(false)` answer is an explicit denial; these errors all mean the
/// question went unanswered.
#[derive(Debug, Error)]
pub enum VerifierError {
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

/// Answers "may this user manage this store".
#[async_trait]
pub trait OwnershipVerifier: Send + Sync {
    /// Check ownership of `store_id` by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError`] when the verifier could not be consulted;
    /// the session applies its [`VerifierFailurePolicy`] in that case.
    async fn is_owner(&self, user_id: &UserId, store_id: &StoreId) -> Result<bool, VerifierError>;
}

/// What an unanswerable ownership check means for access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifierFailurePolicy {
    /// Deny access when the verifier cannot be reached. The safe default.
    #[default]
    FailClosed,
    /// Grant access when the verifier cannot be reached. Matches the
    /// historical dashboard behavior; use only where a transient backend
    /// fault locking owners out is worse than briefly over-granting.
    FailOpen,
}

impl FromStr for VerifierFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail-closed" => Ok(Self::FailClosed),
            "fail-open" => Ok(Self::FailOpen),
            other => Err(format!(
                "unknown verifier policy '{other}' (expected 'fail-closed' or 'fail-open')"
            )),
        }
    }
}

impl std::fmt::Display for VerifierFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailClosed => write!(f, "fail-closed"),
            Self::FailOpen => write!(f, "fail-open"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwnershipResponse {
    #[serde(rename = "isOwner")]
    is_owner: bool,
}

/// [`OwnershipVerifier`] backed by the storefront backend's REST API.
#[derive(Clone)]
pub struct HttpOwnershipVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOwnershipVerifier {
    /// Create a verifier client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, VerifierError> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let value = format!("Bearer {}", api_key.expose_secret());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value)
                    .map_err(|e| VerifierError::Parse(format!("Invalid API key format: {e}")))?,
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
impl OwnershipVerifier for HttpOwnershipVerifier {
    async fn is_owner(&self, user_id: &UserId, store_id: &StoreId) -> Result<bool, VerifierError> {
        let url = format!(
            "{}/stores/{}/owners/{}",
            self.base_url,
            store_id.as_str(),
            user_id.as_str()
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        // 404 is an explicit "no such ownership", not a transport fault.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(VerifierError::Api(status.as_u16()));
        }

        let body: OwnershipResponse = response
            .json()
            .await
            .map_err(|e| VerifierError::Parse(e.to_string()))?;
        Ok(body.is_owner)
    }
}
