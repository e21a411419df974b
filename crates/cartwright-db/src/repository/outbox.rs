//! # Order Outbox Repository
//!
//! The transactional outbox for order confirmations.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout UnitOfWork                                                   │
//! │  ├── INSERT orders, order_lines                                        │
//! │  ├── UPDATE products (stock)                                           │
//! │  ├── DELETE cart_lines                                                 │
//! │  └── INSERT order_outbox ('order.placed', payload)                     │
//! │  COMMIT ← the outbox row exists iff the order exists                   │
//! │                                                                         │
//! │  OutboxRelay (later, any process)                                      │
//! │  ├── SELECT pending (delivered_at IS NULL, attempts < max)             │
//! │  ├── notify                                                            │
//! │  └── delivered → mark_delivered | failed → mark_failed (attempts+1)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cartwright_core::OutboxEntry;

/// Repository for order outbox operations.
#[derive(Debug)]
pub struct OutboxRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> OutboxRepository<'c> {
    /// Creates a new OutboxRepository on a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        OutboxRepository { conn }
    }

    /// Queues an event for an order.
    pub async fn enqueue(&mut self, event_type: &str, order_id: &str, payload: &str) -> DbResult<OutboxEntry> {
        debug!(event_type = %event_type, order_id = %order_id, "Queuing outbox entry");

        let entry = OutboxEntry {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            order_id: order_id.to_string(),
            payload: payload.to_string(),
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            delivered_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO order_outbox (
                id, event_type, order_id, payload,
                attempts, last_error, created_at, attempted_at, delivered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.event_type)
        .bind(&entry.order_id)
        .bind(&entry.payload)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.delivered_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(entry)
    }

    /// Undelivered entries below `max_attempts`, oldest first.
    pub async fn get_pending(&mut self, limit: u32, max_attempts: u32) -> DbResult<Vec<OutboxEntry>> {
        let entries = sqlx::query_as::<_, OutboxEntry>(
            r#"
            SELECT id, event_type, order_id, payload, attempts, last_error,
                   created_at, attempted_at, delivered_at
            FROM order_outbox
            WHERE delivered_at IS NULL AND attempts < ?2
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .bind(i64::from(max_attempts))
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(entries)
    }

    /// Entries for one order (any state).
    pub async fn for_order(&mut self, order_id: &str) -> DbResult<Vec<OutboxEntry>> {
        let entries = sqlx::query_as::<_, OutboxEntry>(
            r#"
            SELECT id, event_type, order_id, payload, attempts, last_error,
                   created_at, attempted_at, delivered_at
            FROM order_outbox
            WHERE order_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(entries)
    }

    /// Marks an entry as delivered.
    pub async fn mark_delivered(&mut self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE order_outbox SET delivered_at = ?2, attempted_at = ?2, attempts = attempts + 1 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OutboxEntry", id));
        }

        Ok(())
    }

    /// Records a failed delivery attempt.
    pub async fn mark_failed(&mut self, id: &str, error: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE order_outbox SET attempts = attempts + 1, last_error = ?2, attempted_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OutboxEntry", id));
        }

        Ok(())
    }

    /// Counts undelivered entries.
    pub async fn count_pending(&mut self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM order_outbox WHERE delivered_at IS NULL")
                .fetch_one(&mut *self.conn)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
