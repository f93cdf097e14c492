//! Checkout domain: cart lines, products, orders and their value objects.
pub mod aggregates;
pub mod value_objects;

pub use aggregates::*;
pub use value_objects::{round_money, OrderNumber, ProductId, Quantity, ShippingMethod, CURRENCY};
