//! Shared fixtures for integration tests.
//!
//! Every environment is a file-backed database in its own temp dir, so the
//! pool can hand out several connections at once.

#![allow(dead_code)]

use chrono::Utc;
use tempfile::TempDir;

use cartwright_core::{Product, ShippingInfo};
use cartwright_service::config::AppConfig;
use cartwright_service::Cartwright;

pub struct TestEnv {
    pub engine: Cartwright,
    pub config: AppConfig,
    // Dropped last: removes the database file.
    _dir: TempDir,
}

pub async fn env() -> TestEnv {
    env_with(|_| {}).await
}

pub async fn env_with(customize: impl FnOnce(&mut AppConfig)) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();

    let mut config = AppConfig::default();
    config.database.path = dir.path().join("cartwright.db");
    config.database.max_connections = 4;
    config.database.min_connections = 0;
    config.database.lock_timeout_ms = 10_000;
    customize(&mut config);
    config.validate().unwrap();

    let engine = Cartwright::connect(&config).await.unwrap();
    TestEnv {
        engine,
        config,
        _dir: dir,
    }
}

impl TestEnv {
    pub async fn add_product(&self, id: &str, price_cents: i64, stock: i64) {
        let now = Utc::now();
        let mut uow = self.engine.db.begin().await.unwrap();
        uow.products()
            .insert(&Product {
                id: id.to_string(),
                title: format!("Product {id}"),
                price_cents,
                qty_available: stock,
                category_id: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();
    }

    /// Catalog-side stock change, outside the engine.
    pub async fn set_stock(&self, id: &str, stock: i64) {
        sqlx::query("UPDATE products SET qty_available = ?1 WHERE id = ?2")
            .bind(stock)
            .bind(id)
            .execute(self.engine.db.pool())
            .await
            .unwrap();
    }

    pub async fn stock(&self, id: &str) -> i64 {
        let mut session = self.engine.db.session().await.unwrap();
        session.products().get_by_id(id).await.unwrap().unwrap().qty_available
    }

    pub async fn order_count(&self, user_id: &str) -> u64 {
        let mut session = self.engine.db.session().await.unwrap();
        session.orders().count_for_user(user_id).await.unwrap()
    }
}

pub fn shipping() -> ShippingInfo {
    ShippingInfo {
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: None,
        address: "1 Loop Rd, Springfield".to_string(),
    }
}
