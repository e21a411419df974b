//! # Order Repository
//!
//! Orders and their lines. Rows are written once, by checkout.

use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use cartwright_core::{Order, OrderLine};

const ORDER_COLUMNS: &str = r#"
    id, user_id, total_cents, status,
    shipping_name, shipping_email, shipping_phone, shipping_address,
    created_at, updated_at
"#;

/// Repository for order database operations.
#[derive(Debug)]
pub struct OrderRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> OrderRepository<'c> {
    /// Creates a new OrderRepository on a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        OrderRepository { conn }
    }

    /// Inserts the order header.
    pub async fn insert(&mut self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, user_id = %order.user_id, total_cents = order.total_cents, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, total_cents, status,
                shipping_name, shipping_email, shipping_phone, shipping_address,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.total_cents)
        .bind(order.status)
        .bind(&order.shipping_name)
        .bind(&order.shipping_email)
        .bind(&order.shipping_phone)
        .bind(&order.shipping_address)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Inserts one order line.
    pub async fn insert_line(&mut self, line: &OrderLine) -> DbResult<()> {
        debug!(order_id = %line.order_id, product_id = %line.product_id, quantity = line.quantity, "Inserting order line");

        sqlx::query(
            r#"
            INSERT INTO order_lines (
                id, order_id, product_id, quantity, unit_price_cents,
                line_total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&line.id)
        .bind(&line.order_id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.line_total_cents)
        .bind(line.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets an order by ID, regardless of owner.
    pub async fn get(&mut self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(order)
    }

    /// Lines of an order in insertion order.
    pub async fn lines(&mut self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents,
                   line_total_cents, created_at
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(lines)
    }

    /// A user's orders, newest first.
    pub async fn list_for_user(&mut self, user_id: &str, limit: u32, offset: u64) -> DbResult<Vec<Order>> {
        debug!(user_id = %user_id, limit = limit, offset = offset, "Listing orders");

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .bind(i64::from(limit))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(orders)
    }

    /// Number of orders a user has.
    pub async fn count_for_user(&mut self, user_id: &str) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// Generates a new order ID.
pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new order line ID.
pub fn generate_order_line_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use cartwright_core::OrderStatus;
    use chrono::{Duration, Utc};

    fn order(id: &str, user_id: &str, minutes_ago: i64) -> Order {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        Order {
            id: id.to_string(),
            user_id: user_id.to_string(),
            total_cents: 2000,
            status: OrderStatus::Placed,
            shipping_name: "Jane".to_string(),
            shipping_email: "jane@example.com".to_string(),
            shipping_phone: None,
            shipping_address: "1 Loop Rd".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = db.begin().await.unwrap();

        uow.orders().insert(&order("o-1", "user-1", 0)).await.unwrap();
        uow.orders()
            .insert_line(&OrderLine {
                id: generate_order_id(),
                order_id: "o-1".to_string(),
                product_id: "p-1".to_string(),
                quantity: 2,
                unit_price_cents: 1000,
                line_total_cents: 2000,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let mut session = db.session().await.unwrap();
        let stored = session.orders().get("o-1").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Placed);
        assert_eq!(stored.total_cents, 2000);

        let lines = session.orders().lines("o-1").await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_price_cents, 1000);
    }

    #[tokio::test]
    async fn test_list_for_user_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = db.begin().await.unwrap();
        uow.orders().insert(&order("old", "user-1", 30)).await.unwrap();
        uow.orders().insert(&order("new", "user-1", 1)).await.unwrap();
        uow.orders().insert(&order("other", "user-2", 5)).await.unwrap();
        uow.commit().await.unwrap();

        let mut session = db.session().await.unwrap();
        let page = session.orders().list_for_user("user-1", 10, 0).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        let second = session.orders().list_for_user("user-1", 1, 1).await.unwrap();
        assert_eq!(second[0].id, "old");
        assert_eq!(session.orders().count_for_user("user-1").await.unwrap(), 2);
        assert_eq!(session.orders().count_for_user("nobody").await.unwrap(), 0);
    }
}
