//! Clementine Admin - store-owner dashboard security and session layer.
//!
//! This crate is the trust boundary between the dashboard UI and the external
//! services it talks to. It owns:
//!
//! - Input sanitization and attack-pattern detection ([`security::sanitize`])
//! - Login rate limiting with lockout ([`security::rate_limit`])
//! - The authentication/authorization state machine ([`services::auth`])
//! - Product form validation before persistence ([`models::product`])
//!
//! The dashboard's rendering layer, the credential provider's internals, and
//! the payment provider's onboarding protocol all live elsewhere; this crate
//! exposes trait seams for them ([`services::auth::CredentialProvider`],
//! [`services::ownership::OwnershipVerifier`],
//! [`services::products::ProductStore`],
//! [`services::payments::PaymentSetupProvider`]).
//!
//! # Security
//!
//! Sanitization here is best-effort cleanup for display; attack detection is
//! a deny-by-pattern gate. Neither is a substitute for parameterized queries
//! and output encoding at the backend, which remains the real trust boundary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod models;
pub mod security;
pub mod services;
pub mod telemetry;
