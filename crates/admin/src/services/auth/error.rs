//! Sign-in error types.
//!
//! [`SignInError`] variants carry the user-facing message as their `Display`
//! impl; the dashboard renders them verbatim. Nothing here exposes whether an
//! account exists - credential failures all collapse into the same message.

use thiserror::Error;

/// Errors from the credential provider collaborator.
///
/// Mirrors the provider's documented failure codes plus a transport bucket.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// Email/password pair was rejected.
    #[error("invalid credential")]
    InvalidCredential,

    /// The provider considers the email malformed.
    #[error("invalid email")]
    InvalidEmail,

    /// The provider is already throttling this caller.
    #[error("rate limited by provider")]
    RateLimited,

    /// Transport or provider-internal failure.
    #[error("provider unreachable: {0}")]
    Network(String),
}

/// Why a sign-in attempt did not produce an authenticated session.
///
/// The session stays in the `Login` state for every variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignInError {
    /// The identifier is locked out; retry after the given minutes.
    #[error("Too many failed attempts. Try again in {minutes} minute(s).")]
    LockedOut {
        /// Ceiling minutes until the lockout expires.
        minutes: i64,
    },

    /// An attack signature was found in the raw input. Deliberately generic:
    /// the prober learns nothing about which pattern fired.
    #[error("Invalid input")]
    InvalidInput,

    /// The email is not structurally valid.
    #[error("Invalid email format")]
    InvalidEmail,

    /// Provider rejected the credentials.
    #[error("Invalid email or password. {attempts_left} attempt(s) remaining.")]
    InvalidCredential {
        /// Attempts remaining before lockout.
        attempts_left: u32,
    },

    /// The credential provider could not be reached.
    #[error("Sign-in is temporarily unavailable. Please try again.")]
    ProviderUnavailable,
}
