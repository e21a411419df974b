//! # Checkout Rules
//!
//! Pure stock and pricing rules shared by the cart manager and the
//! checkout engine.
//!
//! ## Checkout Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Draft ──► Validating ──┬──► Committed                                │
//! │                          │                                              │
//! │                          └──► Aborted (any failure, nothing written)   │
//! │                                                                         │
//! │   Validating:                                                           │
//! │     1. CheckoutPlan::from_cart_lines   (EmptyCart, totals)             │
//! │     2. lock products in plan.product_ids() order (ascending)           │
//! │     3. plan.verify_stock(levels)        (InsufficientStock)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CartLine, CartLineView, Product};

// =============================================================================
// Checkout State
// =============================================================================

/// Where a checkout attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutState {
    Draft,
    Validating,
    Committed,
    Aborted,
}

impl CheckoutState {
    /// Whether `next` is a legal step from this state.
    pub fn can_transition_to(self, next: CheckoutState) -> bool {
        use CheckoutState::*;
        matches!(
            (self, next),
            (Draft, Validating) | (Draft, Aborted) | (Validating, Committed) | (Validating, Aborted)
        )
    }

    /// Committed and Aborted are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, CheckoutState::Committed | CheckoutState::Aborted)
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckoutState::Draft => "draft",
            CheckoutState::Validating => "validating",
            CheckoutState::Committed => "committed",
            CheckoutState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Stock Rules
// =============================================================================

/// Stock as read under the checkout lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: String,
    pub qty_available: i64,
}

/// Cart-time stock check: the resulting line quantity must fit in stock.
///
/// `requested` is the quantity the line would hold after the mutation
/// (existing + added for a merge, the new value for an update).
pub fn ensure_cart_stock(product: &Product, requested: i64) -> CoreResult<()> {
    if requested > product.qty_available {
        return Err(CoreError::OutOfStock {
            product_id: product.id.clone(),
            available: product.qty_available,
            requested,
        });
    }
    Ok(())
}

// =============================================================================
// Checkout Plan
// =============================================================================

/// One order line to be written, priced from the cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// Everything checkout needs to write an order, derived from cart lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPlan {
    pub lines: Vec<PlannedLine>,
    pub total_cents: i64,
}

impl CheckoutPlan {
    /// Builds a plan from cart lines using their snapshot prices.
    ///
    /// ```rust
    /// use cartwright_core::{CheckoutPlan, CoreError};
    ///
    /// assert_eq!(CheckoutPlan::from_cart_lines(&[]), Err(CoreError::EmptyCart));
    /// ```
    pub fn from_cart_lines(lines: &[CartLine]) -> CoreResult<Self> {
        if lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let mut planned = Vec::with_capacity(lines.len());
        let mut total = Money::zero();

        for line in lines {
            let line_total = line
                .unit_price()
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(|| overflow("line total"))?;
            total = total
                .checked_add(line_total)
                .ok_or_else(|| overflow("order total"))?;

            planned.push(PlannedLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                line_total_cents: line_total.cents(),
            });
        }

        Ok(CheckoutPlan {
            lines: planned,
            total_cents: total.cents(),
        })
    }

    /// Distinct product ids in ascending order: the order products are locked in.
    pub fn product_ids(&self) -> Vec<String> {
        self.requested_by_product().into_keys().map(str::to_string).collect()
    }

    /// Total requested quantity per product.
    pub fn requested_by_product(&self) -> BTreeMap<&str, i64> {
        let mut requested = BTreeMap::new();
        for line in &self.lines {
            *requested.entry(line.product_id.as_str()).or_insert(0) += line.quantity;
        }
        requested
    }

    /// Re-validates every line against stock read under the lock.
    ///
    /// A product missing from `levels` counts as zero available.
    pub fn verify_stock(&self, levels: &[StockLevel]) -> CoreResult<()> {
        for (product_id, requested) in self.requested_by_product() {
            let available = levels
                .iter()
                .find(|s| s.product_id == product_id)
                .map_or(0, |s| s.qty_available);

            if requested > available {
                return Err(CoreError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available,
                    requested,
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

fn overflow(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Preview Ordering
// =============================================================================

/// Orders preview lines by subtotal, largest first.
///
/// Ties fall back to line creation time, then line id, so the order is
/// stable across calls.
pub fn sort_preview_lines(lines: &mut [CartLineView]) {
    lines.sort_by(|a, b| {
        b.line
            .subtotal()
            .cmp(&a.line.subtotal())
            .then_with(|| a.line.created_at.cmp(&b.line.created_at))
            .then_with(|| a.line.id.cmp(&b.line.id))
    });
}

// =============================================================================
// Unit Tests
// =============================================================================
