//! Domain models for the admin dashboard.

pub mod product;
pub mod session;

pub use product::{Product, ProductDraft, ProductRejection};
pub use session::{SessionRecord, session_keys};
