//! Catalog read model.
//!
//! The catalog belongs to an external store; this engine only looks up
//! current price and stock.

use tracing::debug;

use cartwright_core::validation::validate_id;
use cartwright_core::{CoreError, ProductSnapshot};
use cartwright_db::Database;

use crate::error::ServiceResult;

/// Read-only access to products.
#[derive(Debug, Clone)]
pub struct CatalogReader {
    db: Database,
}

impl CatalogReader {
    pub fn new(db: Database) -> Self {
        CatalogReader { db }
    }

    /// Current price and available stock of a product.
    pub async fn fetch_product(&self, product_id: &str) -> ServiceResult<ProductSnapshot> {
        validate_id("product id", product_id)?;
        debug!(product_id = %product_id, "Fetching product");

        let mut session = self.db.session().await?;
        let product = session
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        Ok(product.snapshot())
    }
}
