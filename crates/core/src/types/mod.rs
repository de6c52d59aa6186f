//! Newtype wrappers for domain values.
//!
//! These types exist so that an opaque provider-issued user id can never be
//! confused with a store id, and so that a price that reached the product
//! store is known to be positive.

mod email;
mod id;
mod price;

pub use email::{Email, EmailError};
pub use id::{ProductId, StoreId, UserId};
pub use price::{Price, PriceError};
