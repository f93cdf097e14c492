use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::{OrderPage, OrderQuery, OrderStore, StoreError};
use crate::domain::{AggregatedDemand, NewOrder, Order, ProductId, ProductSnapshot, ProductSummary};

#[derive(Debug, Clone)]
struct StoredProduct {
    snapshot: ProductSnapshot,
    image_url: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<ProductId, StoredProduct>,
    orders: Vec<Order>,
    last_order_id: i64,
    last_item_id: i64,
}

/// In-memory inventory and order store.
///
/// Intended for tests/dev. A reservation runs entirely under one write lock
/// and checks every product before touching any, so a failed reservation
/// leaves no trace.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a catalog entry.
    pub fn upsert_product(&self, snapshot: ProductSnapshot, image_url: Option<String>) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.products.insert(snapshot.id, StoredProduct { snapshot, image_url });
        Ok(())
    }

    pub fn stock_of(&self, id: ProductId) -> Result<Option<i64>, StoreError> {
        Ok(self.read()?.products.get(&id).map(|p| p.snapshot.stock))
    }

    pub fn set_active(&self, id: ProductId, is_active: bool) -> Result<(), StoreError> {
        if let Some(product) = self.write()?.products.get_mut(&id) {
            product.snapshot.is_active = is_active;
        }
        Ok(())
    }

    pub fn order_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.orders.len())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn product_snapshots(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, StoreError> {
        let state = self.read()?;
        Ok(ids.iter().filter_map(|id| state.products.get(id)).map(|p| p.snapshot.clone()).collect())
    }

    async fn reserve_and_create(&self, demand: &AggregatedDemand, order: &NewOrder) -> Result<Order, StoreError> {
        let mut state = self.write()?;

        for (product_id, requested) in demand.iter() {
            let supplied = state.products.get(&product_id).is_some_and(|p| p.snapshot.can_supply(requested));
            if !supplied {
                return Err(StoreError::StockConflict(product_id));
            }
        }
        if state.orders.iter().any(|o| o.order_number == order.order_number) {
            return Err(StoreError::DuplicateOrderNumber(order.order_number.clone()));
        }

        for (product_id, requested) in demand.iter() {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.snapshot.stock -= requested as i64;
            }
        }

        state.last_order_id += 1;
        let order_id = state.last_order_id;
        let first_item_id = state.last_item_id + 1;
        state.last_item_id += order.items.len() as i64;

        let products = &state.products;
        let created = order.clone().into_order(order_id, Utc::now(), first_item_id.., |id| {
            products.get(&id).map(|p| ProductSummary {
                id,
                name: p.snapshot.name.clone(),
                image_url: p.image_url.clone(),
            })
        });
        state.orders.push(created.clone());
        Ok(created)
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, StoreError> {
        let state = self.read()?;
        let matching: Vec<&Order> = state
            .orders
            .iter()
            .rev()
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .collect();
        let orders = matching
            .iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .map(|o| (*o).clone())
            .collect();
        Ok(OrderPage { orders, total: matching.len() as u64 })
    }

    async fn find_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self.read()?.orders.iter().find(|o| o.id == id).cloned())
    }
}
