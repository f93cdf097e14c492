//! Order placement.
//!
//! A checkout moves through four stages:
//!
//! 1. cart lines are normalized and demand is summed per product;
//! 2. an advisory stock read rejects carts that obviously cannot be filled;
//! 3. the store reserves stock and writes the order in one transaction, which
//!    is the only step that guarantees stock never goes negative;
//! 4. the confirmation mail is handed to the notifier on a separate task.

mod error;
mod request;

pub use error::{CheckoutError, StockShortfall};
pub use request::{AddressInput, PlaceOrderRequest};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::task::JoinHandle;

use crate::domain::{
    normalize_lines, AggregatedDemand, NewOrder, NewOrderItem, Order, OrderNumber, OrderTotals, ProductId, ProductSnapshot,
    ShippingMethod,
};
use crate::notify::{self, Notifier, OutgoingMail};
use crate::order_link::OrderLinkSigner;
use crate::store::{OrderStore, StoreError};

/// Attempts made when a freshly drawn order number collides with an existing one.
pub const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

type OrderNumberSource = dyn Fn(NaiveDate) -> OrderNumber + Send + Sync;

/// A committed order plus the handle of its in-flight confirmation mail.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: Order,
    pub notification: JoinHandle<()>,
}

#[derive(Clone)]
pub struct Checkout {
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
    links: OrderLinkSigner,
    order_numbers: Arc<OrderNumberSource>,
}

impl Checkout {
    pub fn new(store: Arc<dyn OrderStore>, notifier: Arc<dyn Notifier>, links: OrderLinkSigner) -> Self {
        Self { store, notifier, links, order_numbers: Arc::new(OrderNumber::generate) }
    }

    /// Replaces the random order-number source.
    pub fn with_order_numbers(mut self, source: impl Fn(NaiveDate) -> OrderNumber + Send + Sync + 'static) -> Self {
        self.order_numbers = Arc::new(source);
        self
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> { &self.store }
    pub fn links(&self) -> &OrderLinkSigner { &self.links }

    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder, CheckoutError> {
        self.place_order_at(request, Utc::now()).await
    }

    #[tracing::instrument(skip_all, fields(lines = request.raw_items().len()))]
    pub async fn place_order_at(&self, request: PlaceOrderRequest, now: DateTime<Utc>) -> Result<PlacedOrder, CheckoutError> {
        let raw = request.raw_items();
        if raw.is_empty() {
            return Err(CheckoutError::Validation("Order items are required".to_string()));
        }
        let lines = normalize_lines(raw).map_err(CheckoutError::InvalidProductReference)?;
        request.validate_details()?;

        let demand = AggregatedDemand::from_lines(&lines);
        let snapshots = self.check_availability(&demand).await?;

        let shipping_method = ShippingMethod::from_request(request.shipping_method.as_deref());
        let totals = OrderTotals::quote(&lines, shipping_method).map_err(|e| CheckoutError::Validation(e.to_string()))?;
        let items = lines
            .iter()
            .map(|line| NewOrderItem::from_line(line, snapshots.get(&line.product_id).map(|p| p.name.as_str())))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CheckoutError::Validation(e.to_string()))?;
        let details = request.into_parts();
        let mut draft = NewOrder {
            order_number: (self.order_numbers)(now.date_naive()),
            customer: details.customer,
            shipping_address: details.shipping_address,
            billing_address: details.billing_address,
            shipping_method,
            payment_method: details.payment_method,
            notes: details.notes,
            totals,
            items,
        };

        let order = self.reserve(&demand, &mut draft, now).await?;
        tracing::info!(order_id = order.id, order_number = %order.order_number, total = %order.total_amount, "order placed");

        let mail = OutgoingMail::order_confirmation(&order, &self.links);
        let notification = notify::dispatch(Arc::clone(&self.notifier), mail);
        Ok(PlacedOrder { order, notification })
    }

    /// Advisory read: existence, then activity, then sufficiency.
    async fn check_availability(&self, demand: &AggregatedDemand) -> Result<HashMap<ProductId, ProductSnapshot>, CheckoutError> {
        let ids = demand.product_ids();
        let snapshots: HashMap<ProductId, ProductSnapshot> = self
            .store
            .product_snapshots(&ids)
            .await
            .map_err(|e| unexpected("read product snapshots", e))?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let missing: Vec<ProductId> = ids.iter().filter(|id| !snapshots.contains_key(*id)).copied().collect();
        if !missing.is_empty() {
            tracing::warn!(?missing, "checkout references unknown products");
            return Err(CheckoutError::ProductNotFound(missing));
        }

        let inactive: Vec<ProductId> = ids.iter().filter(|id| !snapshots[*id].is_active).copied().collect();
        if !inactive.is_empty() {
            tracing::warn!(?inactive, "checkout references inactive products");
            return Err(CheckoutError::ProductUnavailable(inactive));
        }

        let shortfalls: Vec<StockShortfall> = demand
            .iter()
            .filter_map(|(id, requested)| {
                let product = &snapshots[&id];
                (!product.can_supply(requested)).then(|| StockShortfall {
                    product_id: id,
                    name: product.name.clone(),
                    available: product.stock,
                    requested,
                })
            })
            .collect();
        if !shortfalls.is_empty() {
            tracing::warn!(count = shortfalls.len(), "insufficient stock for checkout");
            return Err(CheckoutError::InsufficientStock(shortfalls));
        }

        Ok(snapshots)
    }

    async fn reserve(&self, demand: &AggregatedDemand, draft: &mut NewOrder, now: DateTime<Utc>) -> Result<Order, CheckoutError> {
        let mut attempt = 1;
        loop {
            match self.store.reserve_and_create(demand, draft).await {
                Ok(order) => return Ok(order),
                Err(StoreError::StockConflict(product_id)) => {
                    tracing::warn!(product_id = %product_id, "stock changed during checkout");
                    return Err(CheckoutError::StockConflict(product_id));
                }
                Err(StoreError::DuplicateOrderNumber(number)) if attempt < MAX_ORDER_NUMBER_ATTEMPTS => {
                    tracing::warn!(order_number = %number, attempt, "order number collision, drawing another");
                    draft.order_number = (self.order_numbers)(now.date_naive());
                    attempt += 1;
                }
                Err(e) => return Err(unexpected("reserve stock and create order", e)),
            }
        }
    }
}

impl std::fmt::Debug for Checkout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout").field("links", &self.links).finish_non_exhaustive()
    }
}

fn unexpected(stage: &'static str, e: StoreError) -> CheckoutError {
    tracing::error!(error = %e, stage, "checkout failed");
    CheckoutError::Unexpected(e)
}
