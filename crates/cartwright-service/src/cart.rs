//! # Cart Manager
//!
//! Mutations of a user's cart, each checked against live stock.
//!
//! ## Add Item
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(user, product, qty)                                           │
//! │     │                                                                   │
//! │     ├── qty > 0?                       no → VALIDATION_ERROR            │
//! │     ▼                                                                   │
//! │  BEGIN IMMEDIATE                                                        │
//! │     ├── product exists?                no → NOT_FOUND                   │
//! │     ├── cart = insert-if-absent(user)                                   │
//! │     ├── wanted = existing line qty + qty                                │
//! │     ├── wanted ≤ qty_available?        no → OUT_OF_STOCK (rollback)     │
//! │     └── merge into line | new line at current price                     │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! These checks keep a cart plausible. They do not reserve stock: checkout
//! re-validates everything under its own lock.

use chrono::Utc;
use tracing::{debug, info, warn};

use cartwright_core::checkout::{ensure_cart_stock, sort_preview_lines};
use cartwright_core::validation::{validate_id, validate_quantity};
use cartwright_core::{CartLine, CartView, CheckoutPreview, CoreError, ValidationError};
use cartwright_db::repository::cart::generate_line_id;
use cartwright_db::{Database, UnitOfWork};

use crate::config::AccessSettings;
use crate::error::{foreign_resource, ServiceResult};
use crate::settle;

/// Owns every user's active cart.
#[derive(Debug, Clone)]
pub struct CartManager {
    db: Database,
    access: AccessSettings,
}

impl CartManager {
    pub fn new(db: Database, access: AccessSettings) -> Self {
        CartManager { db, access }
    }

    /// The user's cart with its lines, or `None` if no cart exists yet.
    pub async fn get_cart(&self, user_id: &str) -> ServiceResult<Option<CartView>> {
        validate_id("user id", user_id)?;

        let mut session = self.db.session().await?;
        let Some(cart) = session.carts().find_by_user(user_id).await? else {
            return Ok(None);
        };
        let lines = session.carts().list_line_views(&cart.id).await?;

        Ok(Some(CartView { cart, lines }))
    }

    /// Adds `qty` units of a product, merging into an existing line.
    pub async fn add_item(&self, user_id: &str, product_id: &str, qty: i64) -> ServiceResult<CartLine> {
        validate_id("user id", user_id)?;
        validate_id("product id", product_id)?;
        validate_quantity(qty)?;

        let mut uow = self.db.begin().await?;
        let result = add_item_in(&mut uow, user_id, product_id, qty).await;
        let line = settle(uow, result).await.inspect_err(|e| {
            warn!(user_id = %user_id, product_id = %product_id, qty = qty, error = %e, "Add to cart rejected");
        })?;

        info!(user_id = %user_id, product_id = %product_id, quantity = line.quantity, "Cart line saved");
        Ok(line)
    }

    /// Sets a line's quantity. The snapshot price is kept.
    pub async fn update_item(&self, user_id: &str, line_id: &str, qty: i64) -> ServiceResult<CartLine> {
        validate_id("user id", user_id)?;
        validate_id("line id", line_id)?;
        validate_quantity(qty)?;

        let mut uow = self.db.begin().await?;
        let result = self.update_item_in(&mut uow, user_id, line_id, qty).await;
        let line = settle(uow, result).await.inspect_err(|e| {
            warn!(user_id = %user_id, line_id = %line_id, qty = qty, error = %e, "Cart update rejected");
        })?;

        info!(user_id = %user_id, line_id = %line_id, quantity = line.quantity, "Cart line updated");
        Ok(line)
    }

    /// Deletes a line. A second removal of the same line is `NOT_FOUND`.
    pub async fn remove_item(&self, user_id: &str, line_id: &str) -> ServiceResult<()> {
        validate_id("user id", user_id)?;
        validate_id("line id", line_id)?;

        let mut uow = self.db.begin().await?;
        let result = self.remove_item_in(&mut uow, user_id, line_id).await;
        settle(uow, result).await.inspect_err(|e| {
            warn!(user_id = %user_id, line_id = %line_id, error = %e, "Cart removal rejected");
        })?;

        info!(user_id = %user_id, line_id = %line_id, "Cart line removed");
        Ok(())
    }

    /// Lines by subtotal descending, with the snapshot total.
    pub async fn checkout_preview(&self, user_id: &str) -> ServiceResult<CheckoutPreview> {
        validate_id("user id", user_id)?;

        let mut session = self.db.session().await?;
        let cart = session
            .carts()
            .find_by_user(user_id)
            .await?
            .ok_or(CoreError::EmptyCart)?;

        let mut lines = session.carts().list_line_views(&cart.id).await?;
        if lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        sort_preview_lines(&mut lines);

        let view = CartView { cart, lines };
        Ok(CheckoutPreview {
            total_cents: view.total().cents(),
            cart_id: view.cart.id,
            lines: view.lines,
        })
    }

    async fn update_item_in(
        &self,
        uow: &mut UnitOfWork,
        user_id: &str,
        line_id: &str,
        qty: i64,
    ) -> ServiceResult<CartLine> {
        let owned = uow
            .carts()
            .find_line_with_owner(line_id)
            .await?
            .ok_or_else(|| CoreError::CartLineNotFound(line_id.to_string()))?;
        if owned.user_id != user_id {
            return Err(self.foreign_line(line_id).into());
        }

        let product = uow
            .products()
            .get_by_id(&owned.line.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(owned.line.product_id.clone()))?;
        ensure_cart_stock(&product, qty)?;

        uow.carts().update_line_quantity(line_id, qty).await?;
        uow.carts().touch(&owned.line.cart_id).await?;

        Ok(CartLine {
            quantity: qty,
            updated_at: Utc::now(),
            ..owned.line
        })
    }

    async fn remove_item_in(&self, uow: &mut UnitOfWork, user_id: &str, line_id: &str) -> ServiceResult<()> {
        let owned = uow
            .carts()
            .find_line_with_owner(line_id)
            .await?
            .ok_or_else(|| CoreError::CartLineNotFound(line_id.to_string()))?;
        if owned.user_id != user_id {
            return Err(self.foreign_line(line_id).into());
        }

        if !uow.carts().delete_line(line_id).await? {
            return Err(CoreError::CartLineNotFound(line_id.to_string()).into());
        }
        uow.carts().touch(&owned.line.cart_id).await?;

        Ok(())
    }

    fn foreign_line(&self, line_id: &str) -> CoreError {
        foreign_resource(self.access.conceal_foreign_resources, "CartLine", line_id)
    }
}

async fn add_item_in(uow: &mut UnitOfWork, user_id: &str, product_id: &str, qty: i64) -> ServiceResult<CartLine> {
    let product = uow
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

    let cart = uow.carts().get_or_create(user_id).await?;
    let existing = uow.carts().find_line_for_product(&cart.id, product_id).await?;

    let current = existing.as_ref().map_or(0, |line| line.quantity);
    let wanted = current.checked_add(qty).ok_or_else(|| ValidationError::OutOfRange {
        field: "quantity".to_string(),
        min: 1,
        max: i64::MAX,
    })?;
    ensure_cart_stock(&product, wanted)?;

    let line = match existing {
        Some(line) => {
            debug!(line_id = %line.id, from = current, to = wanted, "Merging into existing line");
            uow.carts().update_line_quantity(&line.id, wanted).await?;
            CartLine {
                quantity: wanted,
                updated_at: Utc::now(),
                ..line
            }
        }
        None => {
            let now = Utc::now();
            let line = CartLine {
                id: generate_line_id(),
                cart_id: cart.id.clone(),
                product_id: product.id.clone(),
                quantity: qty,
                unit_price_cents: product.price_cents,
                created_at: now,
                updated_at: now,
            };
            uow.carts().insert_line(&line).await?;
            line
        }
    };
    uow.carts().touch(&cart.id).await?;

    Ok(line)
}

// =============================================================================
// Unit Tests
// =============================================================================
