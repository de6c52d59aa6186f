//! Client-side security primitives for the dashboard.
//!
//! Two distinct layers, always applied together:
//!
//! - [`sanitize`] - allow-by-transformation: best-effort cleanup of untrusted
//!   input for display and storage.
//! - [`sanitize::detect_attack`] - deny-by-pattern: rejects the whole
//!   submission when the raw input looks hostile, even if sanitization would
//!   have cleaned it up.
//!
//! [`rate_limit`] throttles repeated failed login attempts per identifier.

pub mod rate_limit;
pub mod sanitize;
