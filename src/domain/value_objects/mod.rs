//! Value Objects for order placement

use chrono::NaiveDate;
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency every storefront amount is expressed in.
pub const CURRENCY: &str = "MXN";

/// Rounds an amount to currency minor units (two decimals, half away from zero).
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Catalog product identifier. Always a positive integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ProductId(i64);

impl ProductId {
    pub fn new(value: i64) -> Result<Self, ProductIdError> {
        if value <= 0 { return Err(ProductIdError::NotPositive(value)); }
        Ok(Self(value))
    }
    pub fn get(&self) -> i64 { self.0 }
}

impl TryFrom<i64> for ProductId {
    type Error = ProductIdError;
    fn try_from(value: i64) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<ProductId> for i64 {
    fn from(id: ProductId) -> Self { id.0 }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductIdError { NotPositive(i64) }
impl std::error::Error for ProductIdError {}
impl fmt::Display for ProductIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::NotPositive(v) => write!(f, "product id must be positive, got {v}") }
    }
}

/// Requested unit count. Never below one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);
    pub const MAX: Quantity = Quantity(i32::MAX as u32);

    pub fn new(value: u32) -> Option<Self> {
        if value == 0 || value > Self::MAX.0 { None } else { Some(Self(value)) }
    }

    /// Lenient conversion from a coerced JSON number: fractions truncate,
    /// anything non-finite or below one becomes one, oversized values saturate.
    pub fn clamped(raw: f64) -> Self {
        if !raw.is_finite() { return Self::ONE; }
        let whole = raw.trunc();
        if whole < 1.0 { Self::ONE } else if whole >= f64::from(Self::MAX.0) { Self::MAX } else { Self(whole as u32) }
    }

    pub fn value(&self) -> u32 { self.0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Shipping options offered at checkout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod { #[default] Standard, Express, Overnight }

impl ShippingMethod {
    /// Unknown or absent methods fall back to standard shipping.
    pub fn from_request(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }

    pub fn cost(&self) -> Decimal {
        match self {
            Self::Standard => Decimal::new(15000, 2),
            Self::Express => Decimal::new(25000, 2),
            Self::Overnight => Decimal::new(50000, 2),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self { Self::Standard => "standard", Self::Express => "express", Self::Overnight => "overnight" }
    }
}

impl FromStr for ShippingMethod {
    type Err = UnknownShippingMethod;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "express" => Ok(Self::Express),
            "overnight" => Ok(Self::Overnight),
            other => Err(UnknownShippingMethod(other.to_string())),
        }
    }
}

impl fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownShippingMethod(pub String);
impl std::error::Error for UnknownShippingMethod {}
impl fmt::Display for UnknownShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown shipping method: {}", self.0) }
}

/// Human-facing order reference, `MIST-YYYYMMDD-NNNN`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub const PREFIX: &'static str = "MIST";

    /// Draws a random four-digit suffix. Uniqueness is enforced by the store.
    pub fn generate(date: NaiveDate) -> Self {
        let suffix = rand::thread_rng().gen_range(1000..=9999);
        Self::from_parts(date, suffix)
    }

    pub fn from_parts(date: NaiveDate, suffix: u16) -> Self {
        Self(format!("{}-{}-{:04}", Self::PREFIX, date.format("%Y%m%d"), suffix))
    }

    pub fn parse(value: impl Into<String>) -> Result<Self, OrderNumberError> {
        let value = value.into();
        let mut parts = value.split('-');
        let well_formed = parts.next() == Some(Self::PREFIX)
            && parts.next().is_some_and(|d| d.len() == 8 && NaiveDate::parse_from_str(d, "%Y%m%d").is_ok())
            && parts.next().is_some_and(|n| n.len() == 4 && n.bytes().all(|b| b.is_ascii_digit()))
            && parts.next().is_none();
        if !well_formed { return Err(OrderNumberError::Malformed(value)); }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderNumberError { Malformed(String) }
impl std::error::Error for OrderNumberError {}
impl fmt::Display for OrderNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Malformed(v) => write!(f, "malformed order number: {v}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id() {
        assert_eq!(ProductId::new(7).unwrap().get(), 7);
        assert!(ProductId::new(0).is_err());
        assert!(ProductId::new(-3).is_err());
    }

    #[test]
    fn test_quantity_clamping() {
        assert_eq!(Quantity::clamped(3.0).value(), 3);
        assert_eq!(Quantity::clamped(2.9).value(), 2);
        assert_eq!(Quantity::clamped(0.0).value(), 1);
        assert_eq!(Quantity::clamped(-4.0).value(), 1);
        assert_eq!(Quantity::clamped(f64::NAN).value(), 1);
        assert_eq!(Quantity::clamped(1e12), Quantity::MAX);
        assert!(Quantity::new(0).is_none());
    }

    #[test]
    fn test_shipping_method_fallback() {
        assert_eq!(ShippingMethod::from_request(Some("express")), ShippingMethod::Express);
        assert_eq!(ShippingMethod::from_request(Some("teleport")), ShippingMethod::Standard);
        assert_eq!(ShippingMethod::from_request(None), ShippingMethod::Standard);
        assert_eq!(ShippingMethod::Overnight.cost(), Decimal::new(500, 0));
    }

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(OrderNumber::from_parts(date, 1234).as_str(), "MIST-20260309-1234");
        let generated = OrderNumber::generate(date);
        assert!(OrderNumber::parse(generated.as_str()).is_ok());
        let suffix: u16 = generated.as_str()[14..].parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
        assert!(OrderNumber::parse("MIST-2026-1234").is_err());
        assert!(OrderNumber::parse("ORD-20260309-1234").is_err());
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(Decimal::new(19995, 3)).to_string(), "20.00");
        assert_eq!(round_money(Decimal::new(32, 0)).to_string(), "32.00");
    }
}
