//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{ProductSnapshot, ProductSummary};
pub use order::{
    Address, AmountTooLarge, Customer, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, OrderTotals, PaymentStatus, UnknownStatus,
    DEFAULT_COUNTRY, MAX_ORDER_AMOUNT, TAX_RATE,
};
pub use cart::{normalize_lines, AggregatedDemand, InvalidLine, NormalizedLine};
