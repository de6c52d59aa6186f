//! Dashboard services and external collaborator seams.
//!
//! Each external service the dashboard depends on is a trait here, with the
//! HTTP implementation alongside where the outbound call is this crate's own
//! responsibility. Tests inject in-memory implementations.

pub mod auth;
pub mod ownership;
pub mod payments;
pub mod products;
pub mod session_store;
