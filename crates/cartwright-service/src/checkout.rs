//! # Checkout Engine
//!
//! Converts a cart into an order in a single unit of work.
//!
//! ## place_order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Draft                                                                  │
//! │    shipping valid?                        no → VALIDATION_ERROR         │
//! │    BEGIN IMMEDIATE  (writer lock: no other checkout or cart write)     │
//! │  Validating                                                             │
//! │    1. cart lines                          none → EMPTY_CART             │
//! │    2. plan: totals from snapshot prices                                 │
//! │    3. read stock, ascending product id                                  │
//! │    4. every line ≤ stock?                 no → INSUFFICIENT_STOCK       │
//! │    5. INSERT order (Placed) + order lines                               │
//! │    6. UPDATE stock -= qty  (guarded: qty_available >= qty)              │
//! │    7. DELETE cart lines (cart row stays)                                │
//! │    8. INSERT outbox 'order.placed'                                      │
//! │  Committed  ← COMMIT                                                    │
//! │  Aborted    ← ROLLBACK on any error above; nothing persisted            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, info, warn};

use cartwright_core::validation::{validate_id, validate_shipping};
use cartwright_core::{
    CheckoutPlan, CheckoutState, CoreError, Order, OrderLine, OrderPlacedEvent, OrderPlacedLine,
    OrderStatus, PlacedOrder, ShippingInfo, ORDER_PLACED_EVENT,
};
use cartwright_db::repository::order::{generate_order_id, generate_order_line_id};
use cartwright_db::{Database, UnitOfWork};

use crate::error::ServiceResult;
use crate::settle;

/// The all-or-nothing cart-to-order conversion.
#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    db: Database,
}

impl CheckoutEngine {
    pub fn new(db: Database) -> Self {
        CheckoutEngine { db }
    }

    /// Places an order for everything in the user's cart.
    ///
    /// On error nothing is written: stock, cart lines, and order rows are
    /// exactly as before the call, so the caller may retry.
    pub async fn place_order(&self, user_id: &str, shipping: ShippingInfo) -> ServiceResult<PlacedOrder> {
        validate_id("user id", user_id)?;
        let shipping = validate_shipping(&shipping)?;

        let mut state = CheckoutState::Draft;
        let mut uow = self.db.begin().await?;
        advance(&mut state, CheckoutState::Validating, user_id);

        let result = place_order_in(&mut uow, user_id, &shipping).await;
        match settle(uow, result).await {
            Ok(placed) => {
                advance(&mut state, CheckoutState::Committed, user_id);
                info!(
                    user_id = %user_id,
                    order_id = %placed.order_id,
                    total_cents = placed.total_cents,
                    lines = placed.line_count,
                    "Order placed"
                );
                Ok(placed)
            }
            Err(err) => {
                advance(&mut state, CheckoutState::Aborted, user_id);
                warn!(user_id = %user_id, error = %err, "Checkout aborted");
                Err(err)
            }
        }
    }
}

fn advance(state: &mut CheckoutState, next: CheckoutState, user_id: &str) {
    debug_assert!(state.can_transition_to(next), "{state} -> {next}");
    debug!(user_id = %user_id, from = %state, to = %next, "Checkout state");
    *state = next;
}

async fn place_order_in(uow: &mut UnitOfWork, user_id: &str, shipping: &ShippingInfo) -> ServiceResult<PlacedOrder> {
    let cart = uow
        .carts()
        .find_by_user(user_id)
        .await?
        .ok_or(CoreError::EmptyCart)?;
    let cart_lines = uow.carts().list_lines(&cart.id).await?;
    let plan = CheckoutPlan::from_cart_lines(&cart_lines)?;

    let levels = uow.products().stock_levels(&plan.product_ids()).await?;
    plan.verify_stock(&levels)?;

    let now = Utc::now();
    let order = Order {
        id: generate_order_id(),
        user_id: user_id.to_string(),
        total_cents: plan.total_cents,
        status: OrderStatus::Placed,
        shipping_name: shipping.name.clone(),
        shipping_email: shipping.email.clone(),
        shipping_phone: shipping.phone.clone(),
        shipping_address: shipping.address.clone(),
        created_at: now,
        updated_at: now,
    };
    uow.orders().insert(&order).await?;

    for planned in &plan.lines {
        uow.orders()
            .insert_line(&OrderLine {
                id: generate_order_line_id(),
                order_id: order.id.clone(),
                product_id: planned.product_id.clone(),
                quantity: planned.quantity,
                unit_price_cents: planned.unit_price_cents,
                line_total_cents: planned.line_total_cents,
                created_at: now,
            })
            .await?;
    }

    for (product_id, qty) in plan.requested_by_product() {
        if !uow.products().decrement_stock(product_id, qty).await? {
            // Only reachable if stock moved after verification.
            let available = levels
                .iter()
                .find(|l| l.product_id == product_id)
                .map_or(0, |l| l.qty_available);
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available,
                requested: qty,
            }
            .into());
        }
    }

    let cleared = uow.carts().clear_lines(&cart.id).await?;
    uow.carts().touch(&cart.id).await?;
    debug!(cart_id = %cart.id, cleared = cleared, "Cart cleared");

    let event = OrderPlacedEvent {
        order_id: order.id.clone(),
        user_id: order.user_id.clone(),
        shipping_name: order.shipping_name.clone(),
        shipping_email: order.shipping_email.clone(),
        total_cents: order.total_cents,
        lines: plan
            .lines
            .iter()
            .map(|l| OrderPlacedLine {
                product_id: l.product_id.clone(),
                quantity: l.quantity,
                unit_price_cents: l.unit_price_cents,
            })
            .collect(),
        placed_at: now,
    };
    let payload = serde_json::to_string(&event)?;
    uow.outbox().enqueue(ORDER_PLACED_EVENT, &order.id, &payload).await?;

    Ok(PlacedOrder {
        order_id: order.id,
        total_cents: plan.total_cents,
        line_count: plan.lines.len(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessSettings;
    use crate::error::ErrorCode;
    use crate::CartManager;
    use cartwright_core::Product;
    use cartwright_db::DbConfig;

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: Some("555-0100".to_string()),
            address: "1 Loop Rd".to_string(),
        }
    }

    async fn setup(stock: i64) -> (Database, CartManager, CheckoutEngine) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let mut uow = db.begin().await.unwrap();
        uow.products()
            .insert(&Product {
                id: "p-1".to_string(),
                title: "Lamp".to_string(),
                price_cents: 1000,
                qty_available: stock,
                category_id: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();
        (
            db.clone(),
            CartManager::new(db.clone(), AccessSettings::default()),
            CheckoutEngine::new(db),
        )
    }

    #[tokio::test]
    async fn test_place_order_writes_everything() {
        let (db, carts, checkout) = setup(5).await;
        carts.add_item("user-1", "p-1", 2).await.unwrap();

        let placed = checkout.place_order("user-1", shipping()).await.unwrap();
        assert_eq!(placed.total_cents, 2000);
        assert_eq!(placed.line_count, 1);

        let mut session = db.session().await.unwrap();
        let order = session.orders().get(&placed.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.shipping_phone.as_deref(), Some("555-0100"));
        let lines = session.orders().lines(&placed.order_id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_ne!(lines[0].id, placed.order_id);
        let outbox = session.outbox().for_order(&placed.order_id).await.unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].event_type, ORDER_PLACED_EVENT);
    }

    #[tokio::test]
    async fn test_empty_cart() {
        let (_db, _carts, checkout) = setup(5).await;
        let err = checkout.place_order("user-1", shipping()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyCart);
    }

    #[tokio::test]
    async fn test_aborted_checkout_releases_connection() {
        // Single-connection pool: a transaction left open by the abort
        // would block every later call.
        let (_db, carts, checkout) = setup(5).await;
        let err = checkout.place_order("user-1", shipping()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyCart);

        carts.add_item("user-1", "p-1", 1).await.unwrap();
        let placed = checkout.place_order("user-1", shipping()).await.unwrap();
        assert_eq!(placed.total_cents, 1000);
    }

    #[tokio::test]
    async fn test_invalid_shipping_has_no_side_effect() {
        let (db, carts, checkout) = setup(5).await;
        carts.add_item("user-1", "p-1", 2).await.unwrap();

        let mut bad = shipping();
        bad.email = "not-an-email".to_string();
        let err = checkout.place_order("user-1", bad).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let mut session = db.session().await.unwrap();
        assert_eq!(session.orders().count_for_user("user-1").await.unwrap(), 0);
        let product = session.products().get_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(product.qty_available, 5);
    }
}
