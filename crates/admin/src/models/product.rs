//! Product form types and validation.
//!
//! A [`ProductDraft`] is exactly what the form submitted: raw strings.
//! [`ProductDraft::validate`] sanitizes every field, runs attack detection on
//! the raw values, checks business rules, and only then produces a
//! [`Product`] fit for the product store.

use serde::{Deserialize, Serialize};

use clementine_core::Price;

use crate::security::sanitize::{
    detect_attack, sanitize_category, sanitize_description, sanitize_name, sanitize_price,
    sanitize_text, sanitize_url,
};

/// Raw product form input, untrusted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductDraft {
    /// Display name (required).
    pub name: String,
    /// Rich-text description; limited markup permitted.
    pub description: String,
    /// Price as typed into the form.
    pub price: String,
    /// Image URL.
    pub image: String,
    /// Category name.
    pub category: String,
    /// Whether the product is currently in stock.
    pub in_stock: bool,
    /// Optional external checkout link; must be http(s) when present.
    pub external_payment_url: String,
    /// Opaque id of the uploaded image file, when images are hosted remotely.
    pub drive_file_id: String,
}

/// Why a draft was rejected.
///
/// The `Display` impl is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductRejection {
    /// An attack signature was found in a raw field.
    #[error("Invalid input")]
    InvalidInput,
    /// The name sanitized to an empty string.
    #[error("Product name is required")]
    NameRequired,
    /// The price is not a positive number.
    #[error("Price must be a number greater than zero")]
    InvalidPrice,
    /// A payment URL was supplied but failed the URL policy.
    #[error("Payment link must be a valid http(s) URL")]
    InvalidPaymentUrl,
}

/// A validated product, ready for the product store.
///
/// Only constructible through [`ProductDraft::validate`], so every field has
/// been through the sanitizer and the price is known positive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// Sanitized display name, non-empty.
    pub name: String,
    /// Sanitized description.
    pub description: String,
    /// Validated positive price.
    pub price: Price,
    /// Sanitized image URL (empty when the draft's URL failed the policy).
    pub image: String,
    /// Sanitized category.
    pub category: String,
    /// Whether the product is currently in stock.
    pub in_stock: bool,
    /// Sanitized external checkout link, or empty.
    pub external_payment_url: String,
    /// Sanitized file id.
    pub drive_file_id: String,
}

impl ProductDraft {
    /// Validate the draft into a [`Product`].
    ///
    /// Attack detection runs against the *raw* name, description, and
    /// category - a field that sanitizes clean but arrived hostile still
    /// rejects the whole submission.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductRejection`] describing the first rule violated.
    pub fn validate(&self) -> Result<Product, ProductRejection> {
        if detect_attack(&self.name)
            || detect_attack(&self.description)
            || detect_attack(&self.category)
        {
            tracing::warn!("product draft rejected: attack signature in raw input");
            return Err(ProductRejection::InvalidInput);
        }

        let name = sanitize_name(&self.name);
        if name.is_empty() {
            return Err(ProductRejection::NameRequired);
        }

        // A leading minus is a negative price, not noise for the sanitizer
        // to strip into a positive one.
        if self.price.trim().starts_with('-') {
            return Err(ProductRejection::InvalidPrice);
        }
        let price = Price::parse(&sanitize_price(&self.price))
            .map_err(|_| ProductRejection::InvalidPrice)?;

        let external_payment_url = sanitize_url(&self.external_payment_url);
        if !self.external_payment_url.trim().is_empty() && external_payment_url.is_empty() {
            return Err(ProductRejection::InvalidPaymentUrl);
        }

        Ok(Product {
            name,
            description: sanitize_description(&self.description),
            price,
            image: sanitize_url(&self.image),
            category: sanitize_category(&self.category),
            in_stock: self.in_stock,
            external_payment_url,
            drive_file_id: sanitize_text(&self.drive_file_id),
        })
    }
}
