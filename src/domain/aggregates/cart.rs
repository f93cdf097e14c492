//! Cart lines as submitted at checkout, and the demand they place on inventory.
//!
//! Checkout payloads come straight from the browser, so every field is read
//! leniently: numbers are coerced the way a JavaScript client would coerce
//! them, malformed quantities and prices fall back to safe values, and only
//! a line that cannot name a product is rejected.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::value_objects::{round_money, ProductId, Quantity};

/// A validated cart line.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub unit_price: Decimal,
    pub product_name: String,
}

impl NormalizedLine {
    /// `None` when the product of price and quantity leaves the decimal range.
    pub fn line_total(&self) -> Option<Decimal> { self.unit_price.checked_mul(Decimal::from(self.quantity.value())) }
}

/// A submitted line whose product reference could not be resolved to a positive integer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidLine {
    pub index: usize,
    pub product_id: Value,
}

/// Normalizes every raw line, reporting all unusable product references at once.
pub fn normalize_lines(raw: &[Value]) -> Result<Vec<NormalizedLine>, Vec<InvalidLine>> {
    let mut lines = Vec::with_capacity(raw.len());
    let mut invalid = Vec::new();

    for (index, item) in raw.iter().enumerate() {
        match product_id_of(item.get("productId")) {
            Some(product_id) => lines.push(NormalizedLine {
                product_id,
                quantity: Quantity::clamped(coerce_number(item.get("quantity"))),
                unit_price: unit_price_of(item.get("unitPrice")),
                product_name: item.get("productName").and_then(Value::as_str).unwrap_or_default().to_string(),
            }),
            None => invalid.push(InvalidLine { index, product_id: item.get("productId").cloned().unwrap_or(Value::Null) }),
        }
    }

    if invalid.is_empty() { Ok(lines) } else { Err(invalid) }
}

fn product_id_of(raw: Option<&Value>) -> Option<ProductId> {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    let n = coerce_number(raw);
    if !n.is_finite() || n.fract() != 0.0 || n > MAX_SAFE_INTEGER { return None; }
    ProductId::new(n as i64).ok()
}

fn unit_price_of(raw: Option<&Value>) -> Decimal {
    let n = coerce_number(raw);
    if !n.is_finite() || n < 0.0 { return Decimal::ZERO; }
    Decimal::from_f64(n).map(round_money).unwrap_or(Decimal::ZERO)
}

/// JavaScript `Number(value)` semantics for the JSON shapes a cart can carry.
/// A missing field behaves like `undefined` and yields NaN.
fn coerce_number(raw: Option<&Value>) -> f64 {
    match raw {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => if *b { 1.0 } else { 0.0 },
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() { 0.0 } else { s.parse().unwrap_or(f64::NAN) }
        }
        Some(Value::Array(_) | Value::Object(_)) => f64::NAN,
    }
}

/// Total requested units per product, in order of first appearance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregatedDemand {
    entries: Vec<(ProductId, u64)>,
}

impl AggregatedDemand {
    pub fn from_lines(lines: &[NormalizedLine]) -> Self {
        let mut entries: Vec<(ProductId, u64)> = Vec::new();
        let mut position: HashMap<ProductId, usize> = HashMap::new();
        for line in lines {
            let qty = u64::from(line.quantity.value());
            match position.get(&line.product_id) {
                Some(&i) => entries[i].1 += qty,
                None => {
                    position.insert(line.product_id, entries.len());
                    entries.push((line.product_id, qty));
                }
            }
        }
        Self { entries }
    }

    pub fn product_ids(&self) -> Vec<ProductId> { self.entries.iter().map(|(id, _)| *id).collect() }
    pub fn requested(&self, id: ProductId) -> Option<u64> { self.entries.iter().find(|(p, _)| *p == id).map(|(_, q)| *q) }
    pub fn iter(&self) -> impl Iterator<Item = (ProductId, u64)> + '_ { self.entries.iter().copied() }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
