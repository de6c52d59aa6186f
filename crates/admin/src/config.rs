//! Dashboard configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CLEMENTINE_STORE_ID` - Store/tenant id this dashboard manages
//! - `CLEMENTINE_API_BASE_URL` - Base URL of the storefront backend
//!   (ownership and payment-setup endpoints)
//!
//! ## Optional
//! - `CLEMENTINE_API_KEY` - Bearer token for backend calls (min entropy
//!   enforced; placeholder values rejected)
//! - `CLEMENTINE_VERIFIER_POLICY` - `fail-closed` (default) or `fail-open`;
//!   what an unreachable ownership verifier means for access
//! - `CLEMENTINE_SESSION_FILE` - Path for the persisted session record

use std::collections::HashMap;
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

use clementine_core::StoreId;

use crate::services::ownership::VerifierFailurePolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront backend API connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL for ownership and payment-setup endpoints.
    pub base_url: String,
    /// Bearer token for backend calls, when the backend requires one.
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Dashboard application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Store this dashboard instance manages.
    pub store_id: StoreId,
    /// Storefront backend API settings.
    pub api: ApiConfig,
    /// Policy for unanswerable ownership checks.
    pub verifier_policy: VerifierFailurePolicy,
    /// Where the session record is persisted, if anywhere.
    pub session_file: Option<PathBuf>,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the API key fails validation (placeholder detection, entropy
    /// check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let store_id = StoreId::new(get_required_env("CLEMENTINE_STORE_ID")?);
        let base_url = get_required_env("CLEMENTINE_API_BASE_URL")?;

        let api_key = match get_optional_env("CLEMENTINE_API_KEY") {
            Some(key) => {
                validate_secret_strength(&key, "CLEMENTINE_API_KEY")?;
                Some(SecretString::from(key))
            }
            None => None,
        };

        let verifier_policy = match get_optional_env("CLEMENTINE_VERIFIER_POLICY") {
            Some(raw) => raw.parse().map_err(|e: String| {
                ConfigError::InvalidEnvVar("CLEMENTINE_VERIFIER_POLICY".to_string(), e)
            })?,
            None => VerifierFailurePolicy::default(),
        };

        let session_file = get_optional_env("CLEMENTINE_SESSION_FILE").map(PathBuf::from);

        Ok(Self {
            store_id,
            api: ApiConfig { base_url, api_key },
            verifier_policy,
            session_file,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    // Sole test touching the CLEMENTINE_* variables, so no cross-test races.
    #[test]
    #[allow(unsafe_code)]
    fn test_from_env_roundtrip() {
        unsafe {
            std::env::set_var("CLEMENTINE_STORE_ID", "store1");
            std::env::set_var("CLEMENTINE_API_BASE_URL", "https://api.example.com");
            std::env::set_var("CLEMENTINE_VERIFIER_POLICY", "fail-open");
            std::env::remove_var("CLEMENTINE_API_KEY");
            std::env::remove_var("CLEMENTINE_SESSION_FILE");
        }

        let config = AdminConfig::from_env().unwrap();
        assert_eq!(config.store_id, StoreId::new("store1"));
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert!(config.api.api_key.is_none());
        assert_eq!(config.verifier_policy, VerifierFailurePolicy::FailOpen);
        assert!(config.session_file.is_none());

        // Policy defaults to fail-closed when unset.
        unsafe { std::env::remove_var("CLEMENTINE_VERIFIER_POLICY") };
        let config = AdminConfig::from_env().unwrap();
        assert_eq!(config.verifier_policy, VerifierFailurePolicy::FailClosed);

        unsafe { std::env::set_var("CLEMENTINE_VERIFIER_POLICY", "wide-open") };
        assert!(matches!(
            AdminConfig::from_env(),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));

        unsafe {
            std::env::remove_var("CLEMENTINE_VERIFIER_POLICY");
            std::env::remove_var("CLEMENTINE_STORE_ID");
        }
        assert!(matches!(
            AdminConfig::from_env(),
            Err(ConfigError::MissingEnvVar(_))
        ));

        unsafe { std::env::remove_var("CLEMENTINE_API_BASE_URL") };
    }

    #[test]
    fn test_api_config_debug_redacts_key() {
        let config = ApiConfig {
            base_url: "https://api.example.com".to_string(),
            api_key: Some(SecretString::from("aB3$xY9!mK2@nL5#")),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("https://api.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("aB3$xY9!mK2@nL5#"));
    }
}
