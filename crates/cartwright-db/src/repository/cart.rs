//! # Cart Repository
//!
//! Carts and cart lines.
//!
//! ## Cart Creation Race
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two first-time adds from the same user:                               │
//! │                                                                         │
//! │  ❌ SELECT cart → none → INSERT cart       (both insert: two carts)    │
//! │                                                                         │
//! │  ✅ INSERT ... ON CONFLICT(user_id) DO NOTHING                          │
//! │     SELECT ... WHERE user_id = ?                                        │
//! │     UNIQUE(user_id) makes the insert a no-op for the loser; both       │
//! │     then read the same row.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{FromRow, Row, SqliteConnection};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cartwright_core::{Cart, CartLine, CartLineView, ProductSnapshot};

const LINE_COLUMNS: &str =
    "cl.id, cl.cart_id, cl.product_id, cl.quantity, cl.unit_price_cents, cl.created_at, cl.updated_at";

/// A cart line together with the user who owns its cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedCartLine {
    pub line: CartLine,
    pub user_id: String,
}

/// Repository for cart database operations.
#[derive(Debug)]
pub struct CartRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CartRepository<'c> {
    /// Creates a new CartRepository on a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CartRepository { conn }
    }

    /// Finds the user's cart, if one was ever created.
    pub async fn find_by_user(&mut self, user_id: &str) -> DbResult<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(cart)
    }

    /// Returns the user's cart, creating it if absent. Atomic per user.
    pub async fn get_or_create(&mut self, user_id: &str) -> DbResult<Cart> {
        let now = Utc::now();

        let inserted = sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(now)
        .execute(&mut *self.conn)
        .await?
        .rows_affected();

        if inserted == 1 {
            debug!(user_id = %user_id, "Created cart");
        }

        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", user_id))
    }

    /// Bumps the cart's `updated_at`.
    pub async fn touch(&mut self, cart_id: &str) -> DbResult<()> {
        sqlx::query("UPDATE carts SET updated_at = ?2 WHERE id = ?1")
            .bind(cart_id)
            .bind(Utc::now())
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lines
    // -------------------------------------------------------------------------

    /// Finds the line for `product_id` in a cart.
    pub async fn find_line_for_product(
        &mut self,
        cart_id: &str,
        product_id: &str,
    ) -> DbResult<Option<CartLine>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM cart_lines cl WHERE cl.cart_id = ?1 AND cl.product_id = ?2"
        );
        let line = sqlx::query_as::<_, CartLine>(&sql)
            .bind(cart_id)
            .bind(product_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(line)
    }

    /// Finds a line by id together with its cart's owner.
    pub async fn find_line_with_owner(&mut self, line_id: &str) -> DbResult<Option<OwnedCartLine>> {
        let sql = format!(
            r#"
            SELECT {LINE_COLUMNS}, c.user_id
            FROM cart_lines cl
            INNER JOIN carts c ON c.id = cl.cart_id
            WHERE cl.id = ?1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(line_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(OwnedCartLine {
            line: CartLine::from_row(&row)?,
            user_id: row.try_get("user_id")?,
        }))
    }

    /// Inserts a new line.
    pub async fn insert_line(&mut self, line: &CartLine) -> DbResult<()> {
        debug!(cart_id = %line.cart_id, product_id = %line.product_id, quantity = line.quantity, "Inserting cart line");

        sqlx::query(
            r#"
            INSERT INTO cart_lines (
                id, cart_id, product_id, quantity, unit_price_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&line.id)
        .bind(&line.cart_id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.created_at)
        .bind(line.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Sets a line's quantity. The unit price snapshot is untouched.
    pub async fn update_line_quantity(&mut self, line_id: &str, quantity: i64) -> DbResult<()> {
        debug!(line_id = %line_id, quantity = quantity, "Updating cart line quantity");

        let result = sqlx::query("UPDATE cart_lines SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(line_id)
            .bind(quantity)
            .bind(Utc::now())
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CartLine", line_id));
        }

        Ok(())
    }

    /// Deletes a line. Returns false if it did not exist.
    pub async fn delete_line(&mut self, line_id: &str) -> DbResult<bool> {
        debug!(line_id = %line_id, "Deleting cart line");

        let result = sqlx::query("DELETE FROM cart_lines WHERE id = ?1")
            .bind(line_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Lines of a cart in insertion order.
    pub async fn list_lines(&mut self, cart_id: &str) -> DbResult<Vec<CartLine>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM cart_lines cl WHERE cl.cart_id = ?1 ORDER BY cl.created_at, cl.id"
        );
        let lines = sqlx::query_as::<_, CartLine>(&sql)
            .bind(cart_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(lines)
    }

    /// Lines of a cart joined with their live product, in insertion order.
    pub async fn list_line_views(&mut self, cart_id: &str) -> DbResult<Vec<CartLineView>> {
        let sql = format!(
            r#"
            SELECT {LINE_COLUMNS},
                   p.title AS product_title,
                   p.price_cents AS product_price_cents,
                   p.qty_available AS product_qty_available
            FROM cart_lines cl
            INNER JOIN products p ON p.id = cl.product_id
            WHERE cl.cart_id = ?1
            ORDER BY cl.created_at, cl.id
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(cart_id)
            .fetch_all(&mut *self.conn)
            .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let line = CartLine::from_row(&row)?;
            let product = ProductSnapshot {
                id: line.product_id.clone(),
                title: row.try_get("product_title")?,
                price_cents: row.try_get("product_price_cents")?,
                qty_available: row.try_get("product_qty_available")?,
            };
            views.push(CartLineView { line, product });
        }

        Ok(views)
    }

    /// Deletes every line of a cart. The cart row stays.
    pub async fn clear_lines(&mut self, cart_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE cart_id = ?1")
            .bind(cart_id)
            .execute(&mut *self.conn)
            .await?;

        debug!(cart_id = %cart_id, removed = result.rows_affected(), "Cleared cart lines");
        Ok(result.rows_affected())
    }

    /// Number of carts owned by `user_id` (0 or 1).
    pub async fn count_for_user(&mut self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carts WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}

/// Generates a new cart line ID.
pub fn generate_line_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::tests::sample_product;
    use crate::{Database, DbConfig};

    fn new_line(cart_id: &str, product_id: &str, qty: i64, price: i64) -> CartLine {
        let now = Utc::now();
        CartLine {
            id: generate_line_id(),
            cart_id: cart_id.to_string(),
            product_id: product_id.to_string(),
            quantity: qty,
            unit_price_cents: price,
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = db.begin().await.unwrap();
        uow.products().insert(&sample_product("p-1", 1000, 5)).await.unwrap();
        uow.products().insert(&sample_product("p-2", 250, 5)).await.unwrap();
        uow.commit().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let db = setup().await;
        let mut uow = db.begin().await.unwrap();

        let first = uow.carts().get_or_create("user-1").await.unwrap();
        let second = uow.carts().get_or_create("user-1").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(uow.carts().count_for_user("user-1").await.unwrap(), 1);
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_line_lifecycle() {
        let db = setup().await;
        let mut uow = db.begin().await.unwrap();
        let cart = uow.carts().get_or_create("user-1").await.unwrap();

        let line = new_line(&cart.id, "p-1", 2, 1000);
        uow.carts().insert_line(&line).await.unwrap();

        let found = uow
            .carts()
            .find_line_for_product(&cart.id, "p-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.quantity, 2);

        uow.carts().update_line_quantity(&line.id, 4).await.unwrap();
        let owned = uow.carts().find_line_with_owner(&line.id).await.unwrap().unwrap();
        assert_eq!(owned.user_id, "user-1");
        assert_eq!(owned.line.quantity, 4);
        assert_eq!(owned.line.unit_price_cents, 1000);

        assert!(uow.carts().delete_line(&line.id).await.unwrap());
        assert!(!uow.carts().delete_line(&line.id).await.unwrap());
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_product_line_rejected() {
        let db = setup().await;
        let mut uow = db.begin().await.unwrap();
        let cart = uow.carts().get_or_create("user-1").await.unwrap();

        uow.carts().insert_line(&new_line(&cart.id, "p-1", 1, 1000)).await.unwrap();
        let err = uow
            .carts()
            .insert_line(&new_line(&cart.id, "p-1", 1, 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_views_and_clear() {
        let db = setup().await;
        let mut uow = db.begin().await.unwrap();
        let cart = uow.carts().get_or_create("user-1").await.unwrap();
        uow.carts().insert_line(&new_line(&cart.id, "p-1", 1, 900)).await.unwrap();
        uow.carts().insert_line(&new_line(&cart.id, "p-2", 3, 250)).await.unwrap();

        let views = uow.carts().list_line_views(&cart.id).await.unwrap();
        assert_eq!(views.len(), 2);
        let p1 = views.iter().find(|v| v.line.product_id == "p-1").unwrap();
        // Snapshot on the line, live price on the product.
        assert_eq!(p1.line.unit_price_cents, 900);
        assert_eq!(p1.product.price_cents, 1000);

        assert_eq!(uow.carts().clear_lines(&cart.id).await.unwrap(), 2);
        assert!(uow.carts().list_lines(&cart.id).await.unwrap().is_empty());
        assert!(uow.carts().find_by_user("user-1").await.unwrap().is_some());
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_by_schema() {
        let db = setup().await;
        let mut uow = db.begin().await.unwrap();
        let cart = uow.carts().get_or_create("user-1").await.unwrap();

        let err = uow
            .carts()
            .insert_line(&new_line(&cart.id, "p-1", 0, 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
        uow.rollback().await.unwrap();
    }
}
