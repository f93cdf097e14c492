use serde::Serialize;
use thiserror::Error;

use crate::domain::{InvalidLine, ProductId};
use crate::store::StoreError;

/// One product whose stock could not cover the aggregated demand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub name: String,
    pub available: i64,
    pub requested: u64,
}

/// Reasons a checkout is refused. Everything except [`CheckoutError::StockConflict`]
/// and [`CheckoutError::Unexpected`] is detected before the reservation starts.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid product in order items")]
    InvalidProductReference(Vec<InvalidLine>),

    #[error("Some products were not found")]
    ProductNotFound(Vec<ProductId>),

    #[error("Some products are not available")]
    ProductUnavailable(Vec<ProductId>),

    #[error("Insufficient stock for some products")]
    InsufficientStock(Vec<StockShortfall>),

    /// Lost the race at reservation time. Retry the whole checkout.
    #[error("Stock changed during checkout. Please try again.")]
    StockConflict(ProductId),

    #[error("Failed to create order")]
    Unexpected(#[source] StoreError),
}

impl CheckoutError {
    /// Conflict-class errors describe inventory state rather than a bad request.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ProductUnavailable(_) | Self::InsufficientStock(_) | Self::StockConflict(_))
    }
}
