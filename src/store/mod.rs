//! Inventory and order persistence.
//!
//! [`OrderStore`] is the storage capability checkout is handed. Implementations
//! must make [`OrderStore::reserve_and_create`] all-or-nothing: each product's
//! stock is decremented with a compare-and-set (`stock >= demand AND active`)
//! evaluated at write time, and the order row only becomes visible together
//! with every decrement.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{AggregatedDemand, NewOrder, Order, OrderNumber, OrderStatus, ProductId, ProductSnapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The conditional decrement matched no row: stock ran short or the
    /// product was deactivated after the advisory read.
    #[error("stock changed for product {0}")]
    StockConflict(ProductId),

    #[error("order number {0} already exists")]
    DuplicateOrderNumber(OrderNumber),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Admin listing filter. `page` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderQuery {
    pub page: u32,
    pub page_size: u32,
    pub status: Option<OrderStatus>,
}

impl OrderQuery {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>, status: Option<OrderStatus>) -> Self {
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32;
        let page_size = limit
            .unwrap_or(i64::from(Self::DEFAULT_PAGE_SIZE))
            .clamp(1, i64::from(Self::MAX_PAGE_SIZE)) as u32;
        Self { page, page_size, status }
    }

    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.page_size) }
}

impl Default for OrderQuery {
    fn default() -> Self { Self::new(None, None, None) }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
}

#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Batch read of current stock snapshots. Unknown ids are simply absent.
    async fn product_snapshots(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, StoreError>;

    /// Reserves every product's aggregated demand and writes the order, atomically.
    async fn reserve_and_create(&self, demand: &AggregatedDemand, order: &NewOrder) -> Result<Order, StoreError>;

    /// Newest orders first.
    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, StoreError>;

    async fn find_order(&self, id: i64) -> Result<Option<Order>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_query_clamping() {
        let q = OrderQuery::new(Some(0), Some(500), None);
        assert_eq!((q.page, q.page_size), (1, 100));
        let q = OrderQuery::new(Some(3), Some(0), Some(OrderStatus::Shipped));
        assert_eq!((q.page, q.page_size), (3, 1));
        assert_eq!(q.offset(), 2);
        assert_eq!(OrderQuery::default().page_size, 20);
    }
}
