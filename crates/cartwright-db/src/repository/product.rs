//! # Product Repository
//!
//! Catalog reads plus the one catalog write this engine performs: the
//! checkout stock decrement.
//!
//! ## Stock Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                    │
//! │  SET qty_available = qty_available - :qty                           │
//! │  WHERE id = :id AND qty_available >= :qty                           │
//! │                                                                     │
//! │  rows_affected = 1  → decremented                                   │
//! │  rows_affected = 0  → not enough stock (or product gone)            │
//! │                                                                     │
//! │  Delta update guarded in the WHERE clause: never reads a value     │
//! │  and writes it back, and never goes below zero.                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cartwright_core::{Product, StockLevel};

/// Repository for product database operations.
#[derive(Debug)]
pub struct ProductRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductRepository<'c> {
    /// Creates a new ProductRepository on a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductRepository { conn }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Product>> {
        debug!(id = %id, "Fetching product");

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, title, price_cents, qty_available, category_id,
                   created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(product)
    }

    /// Reads stock for `ids` one row at a time, in ascending id order.
    ///
    /// Missing products are simply absent from the result.
    pub async fn stock_levels(&mut self, ids: &[String]) -> DbResult<Vec<StockLevel>> {
        let mut ordered: Vec<&String> = ids.iter().collect();
        ordered.sort();
        ordered.dedup();

        let mut levels = Vec::with_capacity(ordered.len());
        for id in ordered {
            let qty: Option<i64> =
                sqlx::query_scalar("SELECT qty_available FROM products WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&mut *self.conn)
                    .await?;

            debug!(id = %id, qty_available = ?qty, "Read stock");

            if let Some(qty_available) = qty {
                levels.push(StockLevel {
                    product_id: id.clone(),
                    qty_available,
                });
            }
        }

        Ok(levels)
    }

    /// Decrements stock by `qty` if at least `qty` units are available.
    ///
    /// ## Returns
    /// * `Ok(true)` - Stock decremented
    /// * `Ok(false)` - Insufficient stock or unknown product; nothing written
    pub async fn decrement_stock(&mut self, id: &str, qty: i64) -> DbResult<bool> {
        debug!(id = %id, qty = qty, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET qty_available = qty_available - ?2,
                updated_at = ?3
            WHERE id = ?1 AND qty_available >= ?2
            "#,
        )
        .bind(id)
        .bind(qty)
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Inserts a new product (catalog seeding).
    pub async fn insert(&mut self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, title = %product.title, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, title, price_cents, qty_available, category_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.title)
        .bind(product.price_cents)
        .bind(product.qty_available)
        .bind(&product.category_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Changes the catalog price. Existing cart and order lines keep
    /// their snapshots.
    pub async fn update_price(&mut self, id: &str, price_cents: i64) -> DbResult<()> {
        debug!(id = %id, price_cents = price_cents, "Updating price");

        let result = sqlx::query("UPDATE products SET price_cents = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(price_cents)
            .bind(Utc::now())
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts catalog products (for diagnostics and seeding).
    pub async fn count(&mut self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    pub(crate) fn sample_product(id: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            title: format!("Product {id}"),
            price_cents,
            qty_available: stock,
            category_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded(products: &[Product]) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = db.begin().await.unwrap();
        for p in products {
            uow.products().insert(p).await.unwrap();
        }
        uow.commit().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = seeded(&[sample_product("p-1", 1299, 7)]).await;
        let mut session = db.session().await.unwrap();

        let product = session.products().get_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(product.price_cents, 1299);
        assert_eq!(product.qty_available, 7);
        assert!(session.products().get_by_id("nope").await.unwrap().is_none());
        assert_eq!(session.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stock_levels_sorted_and_skips_missing() {
        let db = seeded(&[sample_product("p-b", 100, 2), sample_product("p-a", 100, 9)]).await;
        let mut session = db.session().await.unwrap();

        let ids = vec!["p-b".to_string(), "gone".to_string(), "p-a".to_string()];
        let levels = session.products().stock_levels(&ids).await.unwrap();

        let got: Vec<(&str, i64)> = levels
            .iter()
            .map(|l| (l.product_id.as_str(), l.qty_available))
            .collect();
        assert_eq!(got, vec![("p-a", 9), ("p-b", 2)]);
    }

    #[tokio::test]
    async fn test_decrement_stock_guarded() {
        let db = seeded(&[sample_product("p-1", 100, 3)]).await;
        let mut uow = db.begin().await.unwrap();

        assert!(uow.products().decrement_stock("p-1", 2).await.unwrap());
        assert!(!uow.products().decrement_stock("p-1", 2).await.unwrap());
        assert!(!uow.products().decrement_stock("missing", 1).await.unwrap());
        uow.commit().await.unwrap();

        let mut session = db.session().await.unwrap();
        let product = session.products().get_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(product.qty_available, 1);
    }

    #[tokio::test]
    async fn test_update_price() {
        let db = seeded(&[sample_product("p-1", 1000, 1)]).await;
        let mut uow = db.begin().await.unwrap();

        uow.products().update_price("p-1", 1200).await.unwrap();
        assert!(matches!(
            uow.products().update_price("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
        uow.commit().await.unwrap();
    }
}
