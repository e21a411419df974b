//! # Repository Module
//!
//! Database repository implementations for Cartwright.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  UnitOfWork / Session                                                  │
//! │       │                                                                 │
//! │       │  uow.carts().get_or_create("user-1")                           │
//! │       ▼                                                                 │
//! │  CartRepository<'c>  ── borrows &'c mut SqliteConnection               │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite (same connection, same transaction)                            │
//! │                                                                         │
//! │  A repository cannot outlive, or escape, the handle that created it,   │
//! │  so every statement of a unit of work runs inside its transaction.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog reads, stock decrement
//! - [`CartRepository`] - Carts and cart lines
//! - [`OrderRepository`] - Orders and order lines
//! - [`OutboxRepository`] - Order confirmation outbox

pub mod cart;
pub mod order;
pub mod outbox;
pub mod product;

pub use cart::{CartRepository, OwnedCartLine};
pub use order::OrderRepository;
pub use outbox::OutboxRepository;
pub use product::ProductRepository;
