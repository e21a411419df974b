//! Order history queries.
//!
//! Orders are immutable after checkout; everything here reads through a
//! [`Session`](cartwright_db::Session).

use tracing::debug;

use cartwright_core::validation::{validate_id, validate_page};
use cartwright_core::{CoreError, Order, OrderDetail, Page};
use cartwright_db::Database;

use crate::config::{AccessSettings, OrderSettings};
use crate::error::{foreign_resource, ServiceResult};

/// Read access to a user's own orders.
#[derive(Debug, Clone)]
pub struct OrderQueries {
    db: Database,
    settings: OrderSettings,
    access: AccessSettings,
}

impl OrderQueries {
    pub fn new(db: Database, settings: OrderSettings, access: AccessSettings) -> Self {
        OrderQueries { db, settings, access }
    }

    /// Newest first. `page` is 1-based; `per_page` defaults to the configured
    /// page size and is clamped to `1..=max_page_size`.
    pub async fn list_orders(&self, user_id: &str, page: u32, per_page: Option<u32>) -> ServiceResult<Page<Order>> {
        validate_id("user id", user_id)?;
        validate_page(page)?;

        let per_page = per_page
            .unwrap_or(self.settings.page_size)
            .clamp(1, self.settings.max_page_size.max(1));
        let offset = Page::<Order>::offset(page, per_page);

        let mut session = self.db.session().await?;
        let total = session.orders().count_for_user(user_id).await?;
        let items = session.orders().list_for_user(user_id, per_page, offset).await?;
        debug!(user_id = %user_id, page = page, per_page = per_page, total = total, "Listed orders");

        Ok(Page {
            items,
            page,
            per_page,
            total,
        })
    }

    /// One order with its lines.
    pub async fn get_order(&self, user_id: &str, order_id: &str) -> ServiceResult<OrderDetail> {
        validate_id("user id", user_id)?;
        validate_id("order id", order_id)?;

        let mut session = self.db.session().await?;
        let order = session
            .orders()
            .get(order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
        if order.user_id != user_id {
            return Err(foreign_resource(self.access.conceal_foreign_resources, "Order", order_id).into());
        }

        let lines = session.orders().lines(order_id).await?;
        Ok(OrderDetail { order, lines })
    }
}
