//! Shared in-memory mock collaborators for Clementine integration tests.
//!
//! These stand in for the external services the admin dashboard talks to:
//! the credential provider, the ownership verifier, the payment-setup
//! backend, and the product store. They are deterministic and scriptable so
//! scenario tests can drive the full authentication and product flows
//! without any network.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;

use clementine_admin::models::Product;
use clementine_admin::services::auth::{AuthUser, CredentialError, CredentialProvider};
use clementine_admin::services::ownership::{OwnershipVerifier, VerifierError};
use clementine_admin::services::payments::{PaymentError, PaymentSetupProvider, PaymentSetupStatus};
use clementine_admin::services::products::{ProductStore, StoreError};
use clementine_core::{ProductId, StoreId, UserId};

/// Scriptable credential provider.
///
/// Knows a set of email/password accounts; everything else fails with
/// `InvalidCredential`. Can also be told to report an already-signed-in user
/// or to fail initialization, and can end the provider-side session as token
/// expiry would.
pub struct ScriptedCredentials {
    accounts: Mutex<HashMap<(String, String), AuthUser>>,
    auth_tx: watch::Sender<Option<AuthUser>>,
    init_fails: bool,
    throttled: bool,
    sign_in_calls: AtomicU32,
}

impl Default for ScriptedCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCredentials {
    /// Empty provider: every sign-in fails.
    #[must_use]
    pub fn new() -> Self {
        let (auth_tx, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            auth_tx,
            init_fails: false,
            throttled: false,
            sign_in_calls: AtomicU32::new(0),
        }
    }

    /// Register an account the provider will accept.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str, user: AuthUser) -> Self {
        self.accounts
            .lock()
            .expect("mock lock")
            .insert((email.to_owned(), password.to_owned()), user);
        self
    }

    /// Report `user` as already signed in at initialization.
    #[must_use]
    pub fn with_current_user(self, user: AuthUser) -> Self {
        self.auth_tx.send_replace(Some(user));
        self
    }

    /// Fail initialization, as a broken provider SDK would.
    #[must_use]
    pub fn with_failing_init(mut self) -> Self {
        self.init_fails = true;
        self
    }

    /// Answer every sign-in with the provider's own throttle error.
    #[must_use]
    pub fn with_throttle(mut self) -> Self {
        self.throttled = true;
        self
    }

    /// How many sign-in calls actually reached the provider.
    pub fn sign_in_calls(&self) -> u32 {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    /// End the provider-side session, as token expiry or a sign-out from
    /// another client would. Subscribers see the change.
    pub fn end_session(&self) {
        self.auth_tx.send_replace(None);
    }
}

#[async_trait]
impl CredentialProvider for ScriptedCredentials {
    async fn initialize(&self) -> Result<watch::Receiver<Option<AuthUser>>, CredentialError> {
        if self.init_fails {
            return Err(CredentialError::Network("init failed".to_owned()));
        }
        Ok(self.auth_tx.subscribe())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, CredentialError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if self.throttled {
            return Err(CredentialError::RateLimited);
        }
        let user = self
            .accounts
            .lock()
            .expect("mock lock")
            .get(&(email.to_owned(), password.to_owned()))
            .cloned()
            .ok_or(CredentialError::InvalidCredential)?;
        self.auth_tx.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), CredentialError> {
        self.auth_tx.send_replace(None);
        Ok(())
    }
}

/// Scriptable ownership verifier with a set of (user, store) owner pairs.
#[derive(Default)]
pub struct ScriptedVerifier {
    owners: Mutex<HashSet<(UserId, StoreId)>>,
    unreachable: bool,
}

impl ScriptedVerifier {
    /// Verifier that denies everyone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `user` as an owner of `store`.
    #[must_use]
    pub fn with_owner(self, user: UserId, store: StoreId) -> Self {
        self.owners.lock().expect("mock lock").insert((user, store));
        self
    }

    /// Make every call fail as a backend outage would.
    #[must_use]
    pub fn with_outage(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

#[async_trait]
impl OwnershipVerifier for ScriptedVerifier {
    async fn is_owner(&self, user_id: &UserId, store_id: &StoreId) -> Result<bool, VerifierError> {
        if self.unreachable {
            return Err(VerifierError::Api(503));
        }
        Ok(self
            .owners
            .lock()
            .expect("mock lock")
            .contains(&(user_id.clone(), store_id.clone())))
    }
}

/// Payment-setup provider that records how often it was consulted.
pub struct RecordingPayments {
    status: PaymentSetupStatus,
    status_calls: AtomicU32,
}

impl RecordingPayments {
    /// Provider reporting a fully connected account.
    #[must_use]
    pub fn connected() -> Self {
        Self {
            status: PaymentSetupStatus {
                connected: true,
                charges_enabled: true,
                account_id: Some("acct_test".to_owned()),
            },
            status_calls: AtomicU32::new(0),
        }
    }

    /// Provider reporting no account yet.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            status: PaymentSetupStatus {
                connected: false,
                charges_enabled: false,
                account_id: None,
            },
            status_calls: AtomicU32::new(0),
        }
    }

    /// How many status checks were made.
    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentSetupProvider for RecordingPayments {
    async fn check_status(&self, _store_id: &StoreId) -> Result<PaymentSetupStatus, PaymentError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.status.clone())
    }

    async fn start_onboarding(
        &self,
        store_id: &StoreId,
        _user_id: &UserId,
    ) -> Result<url::Url, PaymentError> {
        url::Url::parse(&format!("https://onboard.example.com/{store_id}"))
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

/// In-memory product store.
#[derive(Default)]
pub struct MemoryProductStore {
    items: Mutex<Vec<(ProductId, Product)>>,
    next_id: AtomicU32,
}

impl MemoryProductStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn add(&self, product: &Product) -> Result<ProductId, StoreError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = ProductId::new(format!("prod_{n}"));
        self.items
            .lock()
            .expect("mock lock")
            .push((id.clone(), product.clone()));
        Ok(id)
    }

    async fn update(&self, id: &ProductId, product: &Product) -> Result<(), StoreError> {
        let mut items = self.items.lock().expect("mock lock");
        let slot = items
            .iter_mut()
            .find(|(item_id, _)| item_id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        slot.1 = product.clone();
        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> Result<(), StoreError> {
        let mut items = self.items.lock().expect("mock lock");
        let before = items.len();
        items.retain(|(item_id, _)| item_id != id);
        if items.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(ProductId, Product)>, StoreError> {
        Ok(self.items.lock().expect("mock lock").clone())
    }
}
