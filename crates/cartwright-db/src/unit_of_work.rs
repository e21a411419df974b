//! # Unit of Work
//!
//! Explicit, scoped database handles.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  db.begin()                                                            │
//! │     │  acquire pooled connection                                       │
//! │     │  BEGIN IMMEDIATE  ← takes the writer lock before the first read │
//! │     ▼                                                                   │
//! │  UnitOfWork ── uow.products() / carts() / orders() / outbox()          │
//! │     │                                                                   │
//! │     ├── commit()    COMMIT    → connection back to pool                │
//! │     ├── rollback()  ROLLBACK  → connection back to pool                │
//! │     └── dropped while open    → connection detached and closed,       │
//! │                                  SQLite discards the transaction       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! With the writer lock held from `BEGIN IMMEDIATE`, two units of work never
//! interleave their check-then-write sequences. The second one waits for the
//! lock (bounded by the busy timeout) and then reads the first one's
//! committed state.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, error, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{CartRepository, OrderRepository, OutboxRepository, ProductRepository};

// =============================================================================
// UnitOfWork
// =============================================================================

/// A write transaction on one pooled connection.
///
/// Must be finished with [`commit`](Self::commit) or
/// [`rollback`](Self::rollback). Dropping it unfinished never returns a
/// connection with an open transaction to the pool.
#[derive(Debug)]
pub struct UnitOfWork {
    /// Only taken in `Drop`.
    conn: Option<PoolConnection<Sqlite>>,
    open: bool,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let conn = pool.acquire().await?;

        // Guard first: if this future is dropped while BEGIN waits for the
        // writer lock, the worker may still start the transaction, so the
        // connection must be closed rather than pooled.
        let mut uow = UnitOfWork {
            conn: Some(conn),
            open: true,
        };

        if let Err(e) = sqlx::query("BEGIN IMMEDIATE").execute(uow.conn()).await {
            // SQLite reports BUSY before opening anything; the connection is clean.
            uow.open = false;
            return Err(DbError::TransactionFailed(format!("begin: {e}")));
        }

        debug!("Unit of work started");
        Ok(uow)
    }

    fn conn(&mut self) -> &mut SqliteConnection {
        match self.conn.as_deref_mut() {
            Some(conn) => conn,
            None => unreachable!("connection is only taken on drop"),
        }
    }

    /// Makes every write of this unit visible.
    ///
    /// On failure the transaction is discarded when `self` drops.
    pub async fn commit(mut self) -> DbResult<()> {
        sqlx::query("COMMIT")
            .execute(self.conn())
            .await
            .map_err(|e| DbError::TransactionFailed(format!("commit: {e}")))?;

        self.open = false;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Discards every write of this unit.
    pub async fn rollback(mut self) -> DbResult<()> {
        match sqlx::query("ROLLBACK").execute(self.conn()).await {
            Ok(_) => {
                self.open = false;
                debug!("Unit of work rolled back");
                Ok(())
            }
            Err(e) => {
                // Still open: Drop closes the connection instead.
                error!(error = %e, "Rollback failed");
                Err(DbError::TransactionFailed(format!("rollback: {e}")))
            }
        }
    }

    pub fn products(&mut self) -> ProductRepository<'_> {
        ProductRepository::new(self.conn())
    }

    pub fn carts(&mut self) -> CartRepository<'_> {
        CartRepository::new(self.conn())
    }

    pub fn orders(&mut self) -> OrderRepository<'_> {
        OrderRepository::new(self.conn())
    }

    pub fn outbox(&mut self) -> OutboxRepository<'_> {
        OutboxRepository::new(self.conn())
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if let Some(conn) = self.conn.take() {
            warn!("Unit of work dropped while open; closing its connection");
            drop(conn.detach());
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// A pooled connection for reads outside any write transaction.
///
/// Each statement sees the latest committed state. Released to the pool on drop.
#[derive(Debug)]
pub struct Session {
    conn: PoolConnection<Sqlite>,
}

impl Session {
    pub(crate) async fn acquire(pool: &SqlitePool) -> DbResult<Self> {
        let conn = pool.acquire().await?;
        Ok(Session { conn })
    }

    pub fn products(&mut self) -> ProductRepository<'_> {
        ProductRepository::new(&mut self.conn)
    }

    pub fn carts(&mut self) -> CartRepository<'_> {
        CartRepository::new(&mut self.conn)
    }

    pub fn orders(&mut self) -> OrderRepository<'_> {
        OrderRepository::new(&mut self.conn)
    }

    pub fn outbox(&mut self) -> OutboxRepository<'_> {
        OutboxRepository::new(&mut self.conn)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::repository::product::tests::sample_product;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        uow.products().insert(&sample_product("p-1", 1000, 5)).await.unwrap();
        uow.commit().await.unwrap();

        let mut session = db.session().await.unwrap();
        assert!(session.products().get_by_id("p-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        uow.products().insert(&sample_product("p-1", 1000, 5)).await.unwrap();
        uow.carts().get_or_create("user-1").await.unwrap();
        uow.rollback().await.unwrap();

        let mut session = db.session().await.unwrap();
        assert!(session.products().get_by_id("p-1").await.unwrap().is_none());
        assert!(session.carts().find_by_user("user-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connection_reusable_after_rollback() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let uow = db.begin().await.unwrap();
        uow.rollback().await.unwrap();

        // Single-connection pool: a leaked transaction would make this fail.
        let mut uow = db.begin().await.unwrap();
        uow.products().insert(&sample_product("p-2", 500, 1)).await.unwrap();
        uow.commit().await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_begin_does_not_poison_pool() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("uow.db"))
            .max_connections(4)
            .lock_timeout(Duration::from_secs(5));
        let db = Database::new(config).await.unwrap();

        let holder = db.begin().await.unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(200), db.begin()).await;
        assert!(waited.is_err());
        holder.rollback().await.unwrap();

        for i in 0..6 {
            let mut uow = tokio::time::timeout(Duration::from_secs(2), db.begin())
                .await
                .unwrap()
                .unwrap();
            uow.products()
                .insert(&sample_product(&format!("p-{i}"), 100, 1))
                .await
                .unwrap();
            uow.commit().await.unwrap();
        }

        let mut session = db.session().await.unwrap();
        assert_eq!(session.products().count().await.unwrap(), 6);
    }
}
