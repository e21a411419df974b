//! # cartwright-service: Cart Manager and Checkout Engine
//!
//! The operations callers use. Each one takes a trusted user id from the
//! surrounding auth layer and returns a [`ServiceResult`].
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CatalogReader    fetch_product                                        │
//! │  CartManager      get_cart, add_item, update_item, remove_item,        │
//! │                   checkout_preview                                      │
//! │  CheckoutEngine   place_order  (one UnitOfWork, all or nothing)        │
//! │  OrderQueries     list_orders, get_order                               │
//! │  OutboxRelay      relay_pending → OrderNotifier                        │
//! │                                                                         │
//! │  Every mutation:                                                        │
//! │    db.begin() ─► work ─┬─ Ok  ─► commit                                │
//! │                        └─ Err ─► rollback, error returned as-is        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let config = AppConfig::load(None)?;
//! telemetry::init_tracing(&config.logging.filter);
//! let engine = Cartwright::connect(&config).await?;
//!
//! engine.carts.add_item("user-1", &product_id, 2).await?;
//! let placed = engine.checkout.place_order("user-1", shipping).await?;
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod orders;
pub mod outbox;
pub mod telemetry;

pub use cart::CartManager;
pub use catalog::CatalogReader;
pub use checkout::CheckoutEngine;
pub use config::{AppConfig, ConfigError};
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use orders::OrderQueries;
pub use outbox::{NotifyError, OrderNotifier, OutboxRelay, RelayReport};

use cartwright_db::{Database, UnitOfWork};
use tracing::error;

/// All services over one database, wired from an [`AppConfig`].
#[derive(Debug, Clone)]
pub struct Cartwright {
    pub db: Database,
    pub catalog: CatalogReader,
    pub carts: CartManager,
    pub checkout: CheckoutEngine,
    pub orders: OrderQueries,
}

impl Cartwright {
    /// Opens the configured database and builds every service.
    pub async fn connect(config: &AppConfig) -> ServiceResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Self::with_database(db, config))
    }

    /// Builds every service over an existing database handle.
    pub fn with_database(db: Database, config: &AppConfig) -> Self {
        Cartwright {
            catalog: CatalogReader::new(db.clone()),
            carts: CartManager::new(db.clone(), config.access),
            checkout: CheckoutEngine::new(db.clone()),
            orders: OrderQueries::new(db.clone(), config.orders, config.access),
            db,
        }
    }

    /// Builds a relay that delivers order confirmations to `notifier`.
    pub fn outbox_relay<N: OrderNotifier>(&self, notifier: N, config: &AppConfig) -> OutboxRelay<N> {
        OutboxRelay::new(self.db.clone(), notifier, config.outbox)
    }
}

/// Commits on success, rolls back otherwise.
pub(crate) async fn settle<T>(uow: UnitOfWork, result: ServiceResult<T>) -> ServiceResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                error!(error = %rollback_err, "Rollback failed; connection discarded");
            }
            Err(err)
        }
    }
}
