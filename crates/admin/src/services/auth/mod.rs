//! Dashboard authentication and authorization state machine.
//!
//! The session starts in [`AuthState::Loading`] and settles into one of the
//! other states:
//!
//! ```text
//! Loading -> Error                      (credential provider init failed)
//! Loading -> Login                      (no signed-in user)
//! Loading -> Authenticated | NotOwner   (live provider session)
//! Login   -> Authenticated | NotOwner   (sign-in + ownership check)
//! Authenticated | NotOwner -> Login     (sign-out, local or provider-side)
//! ```
//!
//! Sign-in consults the rate limiter and the attack-pattern gate before any
//! credentials reach the provider. After provider success, the ownership
//! verifier decides between `Authenticated` and `NotOwner`; an unanswerable
//! verifier is resolved by the configured
//! [`VerifierFailurePolicy`](crate::services::ownership::VerifierFailurePolicy).
//!
//! `Error` is terminal for the session; recovery is a full dashboard reload.

mod error;

pub use error::{CredentialError, SignInError};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use clementine_core::{Email, StoreId, UserId};

use crate::models::SessionRecord;
use crate::security::rate_limit::RateLimiter;
use crate::security::sanitize::{detect_attack, sanitize_email};
use crate::services::ownership::{OwnershipVerifier, VerifierFailurePolicy};
use crate::services::payments::PaymentSetupProvider;
use crate::services::session_store::SessionStore;

/// Handle for an authenticated user, as issued by the credential provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Provider-issued opaque user id.
    pub id: UserId,
    /// Email the user signed in with.
    pub email: String,
}

/// Authentication/authorization state of the dashboard session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Credential provider still initializing.
    Loading,
    /// Provider initialization failed; terminal until reload.
    Error,
    /// No authenticated user.
    Login,
    /// Authenticated but not authorized for this store.
    NotOwner {
        /// The authenticated user.
        user: AuthUser,
    },
    /// Authenticated and authorized; full dashboard access.
    Authenticated {
        /// The authenticated user.
        user: AuthUser,
    },
}

impl AuthState {
    /// Whether this state grants dashboard access.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// The authenticated user, when there is one.
    #[must_use]
    pub const fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::Authenticated { user } | Self::NotOwner { user } => Some(user),
            _ => None,
        }
    }
}

/// Credential provider collaborator (the third-party auth service).
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Initialize the provider and subscribe to its auth-state changes.
    /// Called once per session.
    ///
    /// The receiver's current value is the signed-in user at initialization
    /// time. The provider updates it on every sign-in and sign-out, including
    /// ones it initiates itself (token expiry, sign-out from another client).
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the provider itself fails to
    /// initialize; the session becomes terminal [`AuthState::Error`].
    async fn initialize(&self) -> Result<watch::Receiver<Option<AuthUser>>, CredentialError>;

    /// Authenticate with an email/password pair.
    ///
    /// # Errors
    ///
    /// Returns the provider's failure code as a [`CredentialError`].
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, CredentialError>;

    /// End the provider-side session.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] on transport failure; the local session
    /// is torn down regardless.
    async fn sign_out(&self) -> Result<(), CredentialError>;
}

/// The dashboard authentication session.
///
/// Owns the [`AuthState`] exclusively; the rendering layer observes it
/// read-only through [`AuthSession::subscribe`]. Concurrent duplicate
/// submissions are not serialized here - callers should disable the submit
/// control while an operation is in flight - but a generation counter
/// guarantees that a superseded in-flight operation can no longer change
/// state when it eventually resolves.
pub struct AuthSession {
    store_id: StoreId,
    policy: VerifierFailurePolicy,
    credentials: Arc<dyn CredentialProvider>,
    verifier: Arc<dyn OwnershipVerifier>,
    payments: Arc<dyn PaymentSetupProvider>,
    sessions: Arc<dyn SessionStore>,
    rate_limiter: RateLimiter,
    state: watch::Sender<AuthState>,
    generation: AtomicU64,
    auth_changes: Mutex<Option<watch::Receiver<Option<AuthUser>>>>,
}

impl AuthSession {
    /// Create a session for the given store.
    ///
    /// The session starts in [`AuthState::Loading`]; call
    /// [`initialize`](Self::initialize) next.
    #[must_use]
    pub fn new(
        store_id: StoreId,
        policy: VerifierFailurePolicy,
        credentials: Arc<dyn CredentialProvider>,
        verifier: Arc<dyn OwnershipVerifier>,
        payments: Arc<dyn PaymentSetupProvider>,
        sessions: Arc<dyn SessionStore>,
        rate_limiter: RateLimiter,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self {
            store_id,
            policy,
            credentials,
            verifier,
            payments,
            sessions,
            rate_limiter,
            state,
            generation: AtomicU64::new(0),
            auth_changes: Mutex::new(None),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes (read-only observation).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The rate-limit identifier for this store's login form.
    fn rate_key(&self) -> String {
        format!("login_{}", self.store_id)
    }

    fn set_state(&self, state: AuthState) {
        self.state.send_replace(state);
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// Initialize the credential provider and settle the initial state.
    ///
    /// Provider failure is terminal ([`AuthState::Error`]). A live provider
    /// session re-runs the ownership check rather than trusting the
    /// persisted record. Keeps the provider's auth-change subscription for
    /// [`watch_provider_changes`](Self::watch_provider_changes).
    pub async fn initialize(&self) -> AuthState {
        let generation = self.next_generation();

        let state = match self.credentials.initialize().await {
            Err(err) => {
                tracing::error!(error = %err, "credential provider failed to initialize");
                AuthState::Error
            }
            Ok(changes) => {
                let current = changes.borrow().clone();
                *self
                    .auth_changes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(changes);
                match current {
                    None => {
                        // A stale persisted identity without a provider
                        // session is just noise; clear it.
                        if self.sessions.load().is_some() {
                            self.sessions.clear();
                        }
                        AuthState::Login
                    }
                    Some(user) => {
                        tracing::info!(user_id = %user.id, "restoring provider session");
                        self.resolve_ownership(user, generation).await
                    }
                }
            }
        };

        if self.is_stale(generation) {
            tracing::debug!("discarding stale initialize result");
            return self.state();
        }
        self.set_state(state.clone());
        state
    }

    /// Fold provider-initiated auth changes into the session state.
    ///
    /// Runs until the provider drops its side of the subscription; call it
    /// once after [`initialize`](Self::initialize), typically from a spawned
    /// task. Changes this session caused itself (its own sign-in/sign-out)
    /// are already reflected in the state and are skipped.
    pub async fn watch_provider_changes(&self) {
        let receiver = self
            .auth_changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut receiver) = receiver else {
            return;
        };
        while receiver.changed().await.is_ok() {
            let change = receiver.borrow_and_update().clone();
            self.apply_provider_change(change).await;
        }
    }

    /// Apply one provider-side auth change.
    async fn apply_provider_change(&self, change: Option<AuthUser>) {
        match change {
            Some(user) => {
                // Our own sign-in already resolved this user; don't repeat
                // the ownership check and its side effects.
                if self.state().user() == Some(&user) {
                    return;
                }
                tracing::info!(user_id = %user.id, "provider reported a new session");
                let generation = self.next_generation();
                let state = self.resolve_ownership(user, generation).await;
                if self.is_stale(generation) {
                    return;
                }
                self.set_state(state);
            }
            None => {
                if !matches!(
                    self.state(),
                    AuthState::Authenticated { .. } | AuthState::NotOwner { .. }
                ) {
                    return;
                }
                tracing::info!("provider ended the session");
                self.next_generation();
                self.sessions.clear();
                self.set_state(AuthState::Login);
            }
        }
    }

    /// Attempt a sign-in.
    ///
    /// On success the returned state is also published to subscribers. The
    /// session stays in `Login` for every error.
    ///
    /// # Errors
    ///
    /// Returns a [`SignInError`] whose `Display` is the user-facing message.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthState, SignInError> {
        let generation = self.next_generation();
        let key = self.rate_key();

        if !self.rate_limiter.can_attempt(&key) {
            return Err(SignInError::LockedOut {
                minutes: self.rate_limiter.remaining_minutes(&key),
            });
        }

        // The gate runs on raw input; hostile credentials never reach the
        // provider.
        if detect_attack(email) || detect_attack(password) {
            self.rate_limiter.record_attempt(&key, false);
            return Err(SignInError::InvalidInput);
        }

        let sanitized = sanitize_email(email);
        let Ok(parsed) = Email::parse(&sanitized) else {
            self.rate_limiter.record_attempt(&key, false);
            return Err(SignInError::InvalidEmail);
        };

        match self.credentials.sign_in(parsed.as_str(), password).await {
            Ok(user) => {
                self.rate_limiter.record_attempt(&key, true);
                let state = self.resolve_ownership(user, generation).await;
                if self.is_stale(generation) {
                    tracing::debug!("discarding stale sign-in result");
                    return Ok(self.state());
                }
                self.set_state(state.clone());
                Ok(state)
            }
            Err(err) => Err(self.map_sign_in_failure(&key, &err)),
        }
    }

    /// Map a provider failure to a user-facing error, updating the limiter.
    fn map_sign_in_failure(&self, key: &str, err: &CredentialError) -> SignInError {
        match err {
            CredentialError::RateLimited => {
                // The provider is already throttling us; mirror it locally.
                self.rate_limiter.force_lockout(key);
                SignInError::LockedOut {
                    minutes: self.rate_limiter.remaining_minutes(key),
                }
            }
            CredentialError::InvalidEmail => {
                self.rate_limiter.record_attempt(key, false);
                SignInError::InvalidEmail
            }
            CredentialError::InvalidCredential => {
                self.rate_limiter.record_attempt(key, false);
                let attempts_left = self.rate_limiter.attempts_left(key);
                if attempts_left == 0 {
                    SignInError::LockedOut {
                        minutes: self.rate_limiter.remaining_minutes(key),
                    }
                } else {
                    SignInError::InvalidCredential { attempts_left }
                }
            }
            CredentialError::Network(detail) => {
                tracing::warn!(detail = %detail, "credential provider unreachable during sign-in");
                self.rate_limiter.record_attempt(key, false);
                SignInError::ProviderUnavailable
            }
        }
    }

    /// Decide between `Authenticated` and `NotOwner` for a signed-in user.
    ///
    /// Re-checks the generation once the verifier answers: a superseded
    /// operation must not persist a session record or touch payments, only
    /// report the state that superseded it.
    async fn resolve_ownership(&self, user: AuthUser, generation: u64) -> AuthState {
        let verdict = self.verifier.is_owner(&user.id, &self.store_id).await;
        if self.is_stale(generation) {
            tracing::debug!("superseded before ownership resolution; skipping side effects");
            return self.state();
        }
        match verdict {
            Ok(true) => self.enter_authenticated(user).await,
            Ok(false) => {
                tracing::info!(user_id = %user.id, store_id = %self.store_id, "ownership denied");
                AuthState::NotOwner { user }
            }
            Err(err) => {
                tracing::error!(error = %err, policy = %self.policy, "ownership check failed");
                match self.policy {
                    VerifierFailurePolicy::FailOpen => {
                        tracing::warn!("granting access despite verifier failure (fail-open)");
                        self.enter_authenticated(user).await
                    }
                    VerifierFailurePolicy::FailClosed => AuthState::NotOwner { user },
                }
            }
        }
    }

    /// Side effects of entering the authenticated state: persist the session
    /// identity and kick off a payment-setup status check.
    async fn enter_authenticated(&self, user: AuthUser) -> AuthState {
        self.sessions.save(&SessionRecord {
            user_id: user.id.clone(),
            store_id: self.store_id.clone(),
        });

        // Status is informational at this point; a failed check must not
        // block access to the dashboard.
        match self.payments.check_status(&self.store_id).await {
            Ok(status) => tracing::info!(
                connected = status.connected,
                charges_enabled = status.charges_enabled,
                "payment setup status"
            ),
            Err(err) => tracing::warn!(error = %err, "payment setup status check failed"),
        }

        AuthState::Authenticated { user }
    }

    /// Sign out and return to `Login`.
    ///
    /// Provider-side failures are logged, not surfaced: the local session is
    /// torn down either way.
    pub async fn sign_out(&self) -> AuthState {
        self.next_generation();

        if let Err(err) = self.credentials.sign_out().await {
            tracing::warn!(error = %err, "provider sign-out failed, clearing local session anyway");
        }
        self.sessions.clear();
        self.set_state(AuthState::Login);
        AuthState::Login
    }
}
