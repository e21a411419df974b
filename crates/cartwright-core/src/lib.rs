//! # cartwright-core: Pure Business Logic for Cartwright
//!
//! This crate holds the rules of the cart-to-order engine as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cartwright Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Request surface (external controller layer)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ trusted user id                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  cartwright-service: CartManager, CheckoutEngine, OrderQueries  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cartwright-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ checkout  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │   Plan    │  │   rules   │  │   │
//! │  │   │  CartLine │  │   (i64)   │  │  State    │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 cartwright-db (Database Layer)                  │   │
//! │  │         SQLite queries, migrations, UnitOfWork, repositories    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Cart, CartLine, Order, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`checkout`] - Stock rules, checkout plan, preview ordering
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use cartwright_core::money::Money;
//!
//! let unit_price = Money::from_cents(1000);
//! let subtotal = unit_price.multiply_quantity(2);
//! assert_eq!(subtotal.cents(), 2000);
//! ```

pub mod checkout;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

pub use checkout::{CheckoutPlan, CheckoutState, PlannedLine, StockLevel};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Event type written to the order outbox by a committed checkout.
pub const ORDER_PLACED_EVENT: &str = "order.placed";
