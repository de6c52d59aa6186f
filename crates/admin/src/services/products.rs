//! Product persistence seam and the service that guards it.
//!
//! The product store itself (database, backend API) is out of scope here;
//! [`ProductService`] exists so that nothing reaches [`ProductStore`] without
//! first passing [`crate::models::ProductDraft::validate`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use clementine_core::ProductId;

use crate::models::{Product, ProductDraft, ProductRejection};

/// Errors from the product store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the operation.
    #[error("Product store unavailable: {0}")]
    Unavailable(String),

    /// No product with the given id.
    #[error("Product not found: {0}")]
    NotFound(ProductId),
}

/// CRUD collaborator for persisted products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Persist a new product, returning its assigned id.
    async fn add(&self, product: &Product) -> Result<ProductId, StoreError>;

    /// Replace an existing product.
    async fn update(&self, id: &ProductId, product: &Product) -> Result<(), StoreError>;

    /// Delete a product.
    async fn delete(&self, id: &ProductId) -> Result<(), StoreError>;

    /// List all products with their ids.
    async fn list(&self) -> Result<Vec<(ProductId, Product)>, StoreError>;
}

/// Errors from [`ProductService`] operations.
#[derive(Debug, Error)]
pub enum ProductServiceError {
    /// The draft failed validation; the message is user-facing.
    #[error("{0}")]
    Rejected(#[from] ProductRejection),

    /// The store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validating front door for the product store.
pub struct ProductService {
    store: Arc<dyn ProductStore>,
}

impl ProductService {
    /// Create a service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    /// Validate a draft and persist it as a new product.
    ///
    /// # Errors
    ///
    /// Returns [`ProductServiceError::Rejected`] when validation fails, or
    /// [`ProductServiceError::Store`] when persistence fails.
    pub async fn create(&self, draft: &ProductDraft) -> Result<ProductId, ProductServiceError> {
        let product = draft.validate()?;
        let id = self.store.add(&product).await?;
        tracing::info!(%id, name = %product.name, "product created");
        Ok(id)
    }

    /// Validate a draft and persist it over an existing product.
    ///
    /// # Errors
    ///
    /// Returns [`ProductServiceError::Rejected`] when validation fails, or
    /// [`ProductServiceError::Store`] when persistence fails.
    pub async fn update(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<(), ProductServiceError> {
        let product = draft.validate()?;
        self.store.update(id, &product).await?;
        tracing::info!(%id, "product updated");
        Ok(())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns [`ProductServiceError::Store`] when the store fails.
    pub async fn remove(&self, id: &ProductId) -> Result<(), ProductServiceError> {
        self.store.delete(id).await?;
        tracing::info!(%id, "product deleted");
        Ok(())
    }

    /// List all products.
    ///
    /// # Errors
    ///
    /// Returns [`ProductServiceError::Store`] when the store fails.
    pub async fn list(&self) -> Result<Vec<(ProductId, Product)>, ProductServiceError> {
        Ok(self.store.list().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store recording what actually got persisted.
    #[derive(Default)]
    struct MemoryStore {
        items: Mutex<Vec<(ProductId, Product)>>,
        next_id: Mutex<u32>,
    }

    #[async_trait]
    impl ProductStore for MemoryStore {
        async fn add(&self, product: &Product) -> Result<ProductId, StoreError> {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            let id = ProductId::new(format!("prod_{next_id}"));
            self.items
                .lock()
                .unwrap()
                .push((id.clone(), product.clone()));
            Ok(id)
        }

        async fn update(&self, id: &ProductId, product: &Product) -> Result<(), StoreError> {
            let mut items = self.items.lock().unwrap();
            let slot = items
                .iter_mut()
                .find(|(item_id, _)| item_id == id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            slot.1 = product.clone();
            Ok(())
        }

        async fn delete(&self, id: &ProductId) -> Result<(), StoreError> {
            let mut items = self.items.lock().unwrap();
            let before = items.len();
            items.retain(|(item_id, _)| item_id != id);
            if items.len() == before {
                return Err(StoreError::NotFound(id.clone()));
            }
            Ok(())
        }

        async fn list(&self) -> Result<Vec<(ProductId, Product)>, StoreError> {
            Ok(self.items.lock().unwrap().clone())
        }
    }

    fn valid_draft() -> ProductDraft {
        ProductDraft {
            name: "Canvas Tote".to_owned(),
            price: "24.00".to_owned(),
            category: "bags".to_owned(),
            in_stock: true,
            ..ProductDraft::default()
        }
    }

    #[tokio::test]
    async fn test_create_persists_sanitized_product() {
        let store = Arc::new(MemoryStore::default());
        let service = ProductService::new(store.clone());

        let id = service.create(&valid_draft()).await.unwrap();
        let items = service.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].0, id);
        assert_eq!(items[0].1.name, "Canvas Tote");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_draft_without_touching_store() {
        let store = Arc::new(MemoryStore::default());
        let service = ProductService::new(store.clone());

        let mut draft = valid_draft();
        draft.price = "-5".to_owned();
        let err = service.create(&draft).await.unwrap_err();
        assert!(matches!(
            err,
            ProductServiceError::Rejected(ProductRejection::InvalidPrice)
        ));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let store = Arc::new(MemoryStore::default());
        let service = ProductService::new(store);

        let id = service.create(&valid_draft()).await.unwrap();

        let mut draft = valid_draft();
        draft.name = "Canvas Tote XL".to_owned();
        service.update(&id, &draft).await.unwrap();
        let items = service.list().await.unwrap();
        assert_eq!(items[0].1.name, "Canvas Tote XL");

        service.remove(&id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_product_errors() {
        let store = Arc::new(MemoryStore::default());
        let service = ProductService::new(store);

        let err = service.remove(&ProductId::new("prod_missing")).await;
        assert!(matches!(
            err,
            Err(ProductServiceError::Store(StoreError::NotFound(_)))
        ));
    }
}
