//! Mist Storefront - order placement service
//!
//! Checkout backend for the Mist storefront.
//!
//! ## Features
//! - Lenient cart normalization and per-product demand aggregation
//! - Advisory stock checks with itemized rejections
//! - Atomic stock reservation and order creation (Postgres or in-memory)
//! - Authoritative pricing: shipping table and 16% IVA
//! - Best-effort order confirmation mail with a signed order link
//! - Admin order listing

pub mod api;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod notify;
pub mod order_link;
pub mod store;

pub use checkout::{Checkout, CheckoutError, PlaceOrderRequest, PlacedOrder};
pub use config::Config;
pub use domain::{Order, OrderItem, OrderNumber, ProductId, ProductSnapshot};
pub use store::{InMemoryStore, OrderStore, PgStore, StoreError};
