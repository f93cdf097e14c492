//! Product views used by checkout. The catalog itself is owned elsewhere;
//! checkout only reads stock snapshots and decrements stock.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ProductId;

/// Point-in-time inventory read for one product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub stock: i64,
    pub is_active: bool,
}

impl ProductSnapshot {
    pub fn can_supply(&self, requested: u64) -> bool {
        self.is_active && u64::try_from(self.stock).is_ok_and(|stock| stock >= requested)
    }
}

/// Minimal product projection embedded in order items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
}
